//! Working set for one generation pass
//!
//! Built fresh from the store on every pass, never mutated, and dropped once
//! the artifacts are rendered.

use crate::model::{
    AuthorizationProfile, EapMethod, Entity, EntityId, IdentityUser, MacBypassConfig, PskConfig,
    RadiusClient, UnlangPolicy,
};
use crate::store::{PolicyStore, StoreResult};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct ArtifactSnapshot {
    /// Active policies sorted by priority, store order within a priority
    pub policies: Vec<UnlangPolicy>,
    /// Active profiles by id
    pub profiles: BTreeMap<EntityId, AuthorizationProfile>,
    pub clients: Vec<RadiusClient>,
    pub mac_bypass: Vec<MacBypassConfig>,
    pub psk: Vec<PskConfig>,
    pub users: Vec<IdentityUser>,
    pub eap_methods: Vec<EapMethod>,
}

fn active<E: Entity>(entities: Vec<E>) -> Vec<E> {
    entities.into_iter().filter(Entity::is_active).collect()
}

impl ArtifactSnapshot {
    pub async fn load(store: &dyn PolicyStore) -> StoreResult<Self> {
        let mut policies = active(store.list_policies().await?);
        policies.sort_by_key(|policy| policy.priority);

        let profiles = active(store.list_profiles().await?)
            .into_iter()
            .map(|profile| (profile.id, profile))
            .collect();

        Ok(ArtifactSnapshot {
            policies,
            profiles,
            clients: active(store.list_clients().await?),
            mac_bypass: active(store.list_mac_bypass().await?),
            psk: active(store.list_psk().await?),
            users: active(store.list_users().await?),
            eap_methods: active(store.list_eap_methods().await?),
        })
    }

    pub fn profile(&self, id: Option<EntityId>) -> Option<&AuthorizationProfile> {
        id.and_then(|id| self.profiles.get(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PolicyAction, PolicyOutcome};
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_snapshot_filters_and_sorts() {
        let store = MemoryStore::new();
        store
            .upsert_policy(UnlangPolicy::new(
                1,
                "late",
                50,
                PolicyOutcome::new(PolicyAction::Reject),
            ))
            .await;
        store
            .upsert_policy(UnlangPolicy::new(
                2,
                "early",
                5,
                PolicyOutcome::new(PolicyAction::Accept),
            ))
            .await;
        let mut off = UnlangPolicy::new(3, "off", 1, PolicyOutcome::new(PolicyAction::Accept));
        off.enabled = false;
        store.upsert_policy(off).await;

        let mut disabled_profile = AuthorizationProfile::new(7, "gone");
        disabled_profile.enabled = false;
        store.upsert_profile(disabled_profile).await;
        store.upsert_profile(AuthorizationProfile::new(8, "kept")).await;

        let snapshot = ArtifactSnapshot::load(&store).await.unwrap();
        let names: Vec<&str> = snapshot.policies.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["early", "late"]);
        assert!(snapshot.profile(Some(7)).is_none());
        assert_eq!(snapshot.profile(Some(8)).unwrap().name, "kept");
        assert!(snapshot.profile(None).is_none());
    }
}
