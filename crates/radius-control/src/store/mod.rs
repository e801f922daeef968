//! Read interface to the identity/policy store
//!
//! The store is owned by the CRUD layer; the control plane only reads it.
//! List operations return inactive entities as well so that disabling an
//! entity is visible as a change of its kind.
//!
//! - **MemoryStore**: in-process store, used by tests and embedders
//! - **JsonFileStore**: JSON document re-read on every call

pub mod file;
pub mod memory;

pub use file::{JsonFileStore, StoreDocument};
pub use memory::MemoryStore;

use crate::model::{
    AuthorizationProfile, EapMethod, Entity, EntityId, EntityKind, IdentityUser, MacBypassConfig,
    PskConfig, RadiusClient, UnlangPolicy,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Change marker for one entity kind
///
/// `count` catches deletions, which leave the maximum timestamp untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KindStamp {
    pub latest: Option<DateTime<Utc>>,
    pub count: usize,
}

impl KindStamp {
    pub fn of<'a, E: Entity + 'a>(entities: impl IntoIterator<Item = &'a E>) -> Self {
        entities
            .into_iter()
            .fold(KindStamp::default(), |stamp, entity| KindStamp {
                latest: stamp.latest.max(Some(entity.updated_at())),
                count: stamp.count + 1,
            })
    }

    /// Whether `current` reports changes relative to this recorded stamp
    pub fn is_stale(&self, current: &KindStamp) -> bool {
        current.count != self.count || current.latest > self.latest
    }
}

#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn list_clients(&self) -> StoreResult<Vec<RadiusClient>>;
    async fn list_profiles(&self) -> StoreResult<Vec<AuthorizationProfile>>;
    async fn list_policies(&self) -> StoreResult<Vec<UnlangPolicy>>;
    async fn list_mac_bypass(&self) -> StoreResult<Vec<MacBypassConfig>>;
    async fn list_psk(&self) -> StoreResult<Vec<PskConfig>>;
    async fn list_users(&self) -> StoreResult<Vec<IdentityUser>>;
    async fn list_eap_methods(&self) -> StoreResult<Vec<EapMethod>>;

    async fn get_client(&self, id: EntityId) -> StoreResult<Option<RadiusClient>> {
        Ok(self
            .list_clients()
            .await?
            .into_iter()
            .find(|client| client.id == id))
    }

    /// Active client whose address or network contains `ip`
    ///
    /// An exact host entry wins over a covering network.
    async fn find_client_by_ip(&self, ip: IpAddr) -> StoreResult<Option<RadiusClient>> {
        let clients: Vec<RadiusClient> = self
            .list_clients()
            .await?
            .into_iter()
            .filter(|client| client.enabled && client.matches(ip))
            .collect();
        let exact = clients
            .iter()
            .position(|client| client.host_address() == Some(ip));
        Ok(match exact {
            Some(index) => clients.into_iter().nth(index),
            None => clients.into_iter().next(),
        })
    }

    async fn stamp(&self, kind: EntityKind) -> StoreResult<KindStamp> {
        Ok(match kind {
            EntityKind::Client => KindStamp::of(&self.list_clients().await?),
            EntityKind::Profile => KindStamp::of(&self.list_profiles().await?),
            EntityKind::Policy => KindStamp::of(&self.list_policies().await?),
            EntityKind::MacBypass => KindStamp::of(&self.list_mac_bypass().await?),
            EntityKind::Psk => KindStamp::of(&self.list_psk().await?),
            EntityKind::User => KindStamp::of(&self.list_users().await?),
            EntityKind::EapMethod => KindStamp::of(&self.list_eap_methods().await?),
        })
    }

    fn backend_name(&self) -> &'static str;
}
