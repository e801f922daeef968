//! JSON document store
//!
//! The CRUD layer (or an operator) maintains a single JSON document with one
//! array per entity kind. The file is re-read on every call, so edits become
//! visible on the next reconciliation tick without restarting.

use super::{PolicyStore, StoreResult};
use crate::model::{
    AuthorizationProfile, EapMethod, IdentityUser, MacBypassConfig, PskConfig, RadiusClient,
    UnlangPolicy,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Every entity kind, in store order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default)]
    pub clients: Vec<RadiusClient>,
    #[serde(default)]
    pub profiles: Vec<AuthorizationProfile>,
    #[serde(default)]
    pub policies: Vec<UnlangPolicy>,
    #[serde(default)]
    pub mac_bypass: Vec<MacBypassConfig>,
    #[serde(default)]
    pub psk: Vec<PskConfig>,
    #[serde(default)]
    pub users: Vec<IdentityUser>,
    #[serde(default)]
    pub eap_methods: Vec<EapMethod>,
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the whole document
    pub async fn load(&self) -> StoreResult<StoreDocument> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Replace the document (used by tooling and tests, never by the reconciler)
    pub async fn save(&self, document: &StoreDocument) -> StoreResult<()> {
        let contents = serde_json::to_string_pretty(document)?;
        tokio::fs::write(&self.path, contents).await?;
        Ok(())
    }
}

#[async_trait]
impl PolicyStore for JsonFileStore {
    async fn list_clients(&self) -> StoreResult<Vec<RadiusClient>> {
        Ok(self.load().await?.clients)
    }

    async fn list_profiles(&self) -> StoreResult<Vec<AuthorizationProfile>> {
        Ok(self.load().await?.profiles)
    }

    async fn list_policies(&self) -> StoreResult<Vec<UnlangPolicy>> {
        Ok(self.load().await?.policies)
    }

    async fn list_mac_bypass(&self) -> StoreResult<Vec<MacBypassConfig>> {
        Ok(self.load().await?.mac_bypass)
    }

    async fn list_psk(&self) -> StoreResult<Vec<PskConfig>> {
        Ok(self.load().await?.psk)
    }

    async fn list_users(&self) -> StoreResult<Vec<IdentityUser>> {
        Ok(self.load().await?.users)
    }

    async fn list_eap_methods(&self) -> StoreResult<Vec<EapMethod>> {
        Ok(self.load().await?.eap_methods)
    }

    fn backend_name(&self) -> &'static str {
        "json-file"
    }
}
