//! In-memory policy store

use super::{PolicyStore, StoreDocument, StoreResult};
use crate::model::{
    AuthorizationProfile, EapMethod, Entity, EntityId, IdentityUser, MacBypassConfig, PskConfig,
    RadiusClient, UnlangPolicy,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory store
///
/// Writers stamp `updated_at` the way the CRUD layer would, strictly
/// increasing within a kind so that back-to-back edits are never conflated.
///
/// Uses `tokio::sync::RwLock` for concurrent access from multiple async tasks.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    document: Arc<RwLock<StoreDocument>>,
}

fn touch<E: Entity>(items: &[E]) -> DateTime<Utc> {
    let now = Utc::now();
    match items.iter().map(Entity::updated_at).max() {
        Some(latest) if latest >= now => latest + TimeDelta::microseconds(1),
        _ => now,
    }
}

fn upsert<E: Entity>(items: &mut Vec<E>, mut entity: E, stamp: impl FnOnce(&mut E, DateTime<Utc>)) {
    let updated_at = touch(items);
    stamp(&mut entity, updated_at);
    match items.iter_mut().find(|item| item.id() == entity.id()) {
        Some(existing) => *existing = entity,
        None => items.push(entity),
    }
}

fn remove<E: Entity>(items: &mut Vec<E>, id: EntityId) -> bool {
    let before = items.len();
    items.retain(|item| item.id() != id);
    items.len() != before
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_document(document: StoreDocument) -> Self {
        MemoryStore {
            document: Arc::new(RwLock::new(document)),
        }
    }

    /// Copy of the current contents
    pub async fn document(&self) -> StoreDocument {
        self.document.read().await.clone()
    }

    pub async fn upsert_client(&self, client: RadiusClient) {
        let mut doc = self.document.write().await;
        upsert(&mut doc.clients, client, |e, at| e.updated_at = at);
    }

    pub async fn upsert_profile(&self, profile: AuthorizationProfile) {
        let mut doc = self.document.write().await;
        upsert(&mut doc.profiles, profile, |e, at| e.updated_at = at);
    }

    pub async fn upsert_policy(&self, policy: UnlangPolicy) {
        let mut doc = self.document.write().await;
        upsert(&mut doc.policies, policy, |e, at| e.updated_at = at);
    }

    pub async fn upsert_mac_bypass(&self, config: MacBypassConfig) {
        let mut doc = self.document.write().await;
        upsert(&mut doc.mac_bypass, config, |e, at| e.updated_at = at);
    }

    pub async fn upsert_psk(&self, config: PskConfig) {
        let mut doc = self.document.write().await;
        upsert(&mut doc.psk, config, |e, at| e.updated_at = at);
    }

    pub async fn upsert_user(&self, user: IdentityUser) {
        let mut doc = self.document.write().await;
        upsert(&mut doc.users, user, |e, at| e.updated_at = at);
    }

    pub async fn upsert_eap_method(&self, method: EapMethod) {
        let mut doc = self.document.write().await;
        upsert(&mut doc.eap_methods, method, |e, at| e.updated_at = at);
    }

    pub async fn remove_client(&self, id: EntityId) -> bool {
        remove(&mut self.document.write().await.clients, id)
    }

    pub async fn remove_policy(&self, id: EntityId) -> bool {
        remove(&mut self.document.write().await.policies, id)
    }

    pub async fn remove_profile(&self, id: EntityId) -> bool {
        remove(&mut self.document.write().await.profiles, id)
    }
}

#[async_trait]
impl PolicyStore for MemoryStore {
    async fn list_clients(&self) -> StoreResult<Vec<RadiusClient>> {
        Ok(self.document.read().await.clients.clone())
    }

    async fn list_profiles(&self) -> StoreResult<Vec<AuthorizationProfile>> {
        Ok(self.document.read().await.profiles.clone())
    }

    async fn list_policies(&self) -> StoreResult<Vec<UnlangPolicy>> {
        Ok(self.document.read().await.policies.clone())
    }

    async fn list_mac_bypass(&self) -> StoreResult<Vec<MacBypassConfig>> {
        Ok(self.document.read().await.mac_bypass.clone())
    }

    async fn list_psk(&self) -> StoreResult<Vec<PskConfig>> {
        Ok(self.document.read().await.psk.clone())
    }

    async fn list_users(&self) -> StoreResult<Vec<IdentityUser>> {
        Ok(self.document.read().await.users.clone())
    }

    async fn list_eap_methods(&self) -> StoreResult<Vec<EapMethod>> {
        Ok(self.document.read().await.eap_methods.clone())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
