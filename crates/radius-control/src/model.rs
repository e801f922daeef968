//! Entities read from the policy store
//!
//! The control plane never writes these; the CRUD layer owns them. Every
//! entity carries `updated_at` so the reconciler can detect changes.

use chrono::{DateTime, Utc};
use ipnetwork::IpNetwork;
use radius_proto::dynauth::VlanAssignment;
use radius_proto::Vendor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

pub type EntityId = i64;

fn default_enabled() -> bool {
    true
}

fn default_updated_at() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

/// Kinds of entity whose changes drive regeneration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Client,
    Profile,
    Policy,
    MacBypass,
    Psk,
    User,
    EapMethod,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Client,
        EntityKind::Profile,
        EntityKind::Policy,
        EntityKind::MacBypass,
        EntityKind::Psk,
        EntityKind::User,
        EntityKind::EapMethod,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Client => "client",
            EntityKind::Profile => "profile",
            EntityKind::Policy => "policy",
            EntityKind::MacBypass => "mac_bypass",
            EntityKind::Psk => "psk",
            EntityKind::User => "user",
            EntityKind::EapMethod => "eap_method",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named bundle of reply attributes returned on success
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationProfile {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub vlan_id: Option<u16>,
    /// Interface or VLAN name; ignored when `vlan_id` is set
    #[serde(default)]
    pub vlan_name: Option<String>,
    #[serde(default)]
    pub bandwidth_down_kbps: Option<u32>,
    #[serde(default)]
    pub bandwidth_up_kbps: Option<u32>,
    #[serde(default)]
    pub session_timeout: Option<u32>,
    #[serde(default)]
    pub idle_timeout: Option<u32>,
    #[serde(default)]
    pub splash_url: Option<String>,
    #[serde(default)]
    pub group_policy: Option<String>,
    #[serde(default)]
    pub vendor: Vendor,
    #[serde(default)]
    pub sgt: Option<u16>,
    #[serde(default)]
    pub downloadable_acl: Option<String>,
    #[serde(default)]
    pub include_udn: bool,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_updated_at")]
    pub updated_at: DateTime<Utc>,
}

impl AuthorizationProfile {
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        AuthorizationProfile {
            id,
            name: name.into(),
            description: None,
            vlan_id: None,
            vlan_name: None,
            bandwidth_down_kbps: None,
            bandwidth_up_kbps: None,
            session_timeout: None,
            idle_timeout: None,
            splash_url: None,
            group_policy: None,
            vendor: Vendor::Default,
            sgt: None,
            downloadable_acl: None,
            include_udn: false,
            enabled: true,
            updated_at: default_updated_at(),
        }
    }

    /// VLAN assignment, preferring the numeric id
    pub fn vlan(&self) -> Option<VlanAssignment> {
        match (self.vlan_id, &self.vlan_name) {
            (Some(id), _) => Some(VlanAssignment::Id(id)),
            (None, Some(name)) if !name.is_empty() => Some(VlanAssignment::Name(name.clone())),
            _ => None,
        }
    }
}

/// Daemon processing section a policy belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyType {
    #[default]
    Authorize,
    PostAuth,
    Accounting,
    /// Only invoked through a selector (MAC bypass, PSK, EAP method)
    OnDemand,
}

impl PolicyType {
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyType::Authorize => "authorize",
            PolicyType::PostAuth => "post_auth",
            PolicyType::Accounting => "accounting",
            PolicyType::OnDemand => "on_demand",
        }
    }
}

/// How additional conditions combine with the primary one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionLogic {
    #[default]
    And,
    Or,
}

/// `attribute operator value`, or a backend query compared against `value`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyCondition {
    #[serde(default)]
    pub attribute: String,
    pub operator: String,
    #[serde(default)]
    pub value: String,
    /// Raw SQL whose result replaces the attribute on the left-hand side
    #[serde(default)]
    pub backend_query: Option<String>,
}

impl PolicyCondition {
    pub fn new(attribute: &str, operator: &str, value: &str) -> Self {
        PolicyCondition {
            attribute: attribute.to_string(),
            operator: operator.to_string(),
            value: value.to_string(),
            backend_query: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyAction {
    Accept,
    Reject,
    ApplyProfile,
    Continue,
    CallModule,
}

impl PolicyAction {
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyAction::Accept => "accept",
            PolicyAction::Reject => "reject",
            PolicyAction::ApplyProfile => "apply_profile",
            PolicyAction::Continue => "continue",
            PolicyAction::CallModule => "call_module",
        }
    }
}

/// What a policy does on match (or on non-match, for the else branch)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyOutcome {
    pub action: PolicyAction,
    #[serde(default)]
    pub profile_id: Option<EntityId>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub reply_message: Option<String>,
}

impl PolicyOutcome {
    pub fn new(action: PolicyAction) -> Self {
        PolicyOutcome {
            action,
            profile_id: None,
            module: None,
            reply_message: None,
        }
    }

    pub fn apply_profile(profile_id: EntityId) -> Self {
        PolicyOutcome {
            profile_id: Some(profile_id),
            ..PolicyOutcome::new(PolicyAction::ApplyProfile)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnlangPolicy {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Lower is evaluated first
    pub priority: i32,
    #[serde(default)]
    pub policy_type: PolicyType,
    /// Absent means the outcome applies unconditionally
    #[serde(default)]
    pub condition: Option<PolicyCondition>,
    #[serde(default)]
    pub extra_conditions: Vec<PolicyCondition>,
    #[serde(default)]
    pub logic: ConditionLogic,
    pub then: PolicyOutcome,
    #[serde(default, rename = "else")]
    pub otherwise: Option<PolicyOutcome>,
    /// Raw block body used instead of the condition/outcome fields
    #[serde(default)]
    pub custom_unlang: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_updated_at")]
    pub updated_at: DateTime<Utc>,
}

impl UnlangPolicy {
    pub fn new(id: EntityId, name: impl Into<String>, priority: i32, then: PolicyOutcome) -> Self {
        UnlangPolicy {
            id,
            name: name.into(),
            description: None,
            priority,
            policy_type: PolicyType::Authorize,
            condition: None,
            extra_conditions: Vec::new(),
            logic: ConditionLogic::And,
            then,
            otherwise: None,
            custom_unlang: None,
            enabled: true,
            updated_at: default_updated_at(),
        }
    }

    pub fn with_condition(mut self, condition: PolicyCondition) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// A network access device allowed to talk to the daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadiusClient {
    pub id: EntityId,
    pub name: String,
    /// Host address or CIDR network
    pub ip_address: String,
    pub secret: String,
    #[serde(default)]
    pub nas_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub require_message_authenticator: bool,
    #[serde(default)]
    pub coa_enabled: bool,
    #[serde(default)]
    pub coa_port: Option<u16>,
    #[serde(default)]
    pub radsec_enabled: bool,
    #[serde(default)]
    pub radsec_port: Option<u16>,
    #[serde(default)]
    pub vendor: Option<Vendor>,
    #[serde(default)]
    pub virtual_server: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_updated_at")]
    pub updated_at: DateTime<Utc>,
}

impl RadiusClient {
    pub fn new(
        id: EntityId,
        name: impl Into<String>,
        ip_address: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        RadiusClient {
            id,
            name: name.into(),
            ip_address: ip_address.into(),
            secret: secret.into(),
            nas_type: None,
            description: None,
            require_message_authenticator: false,
            coa_enabled: false,
            coa_port: None,
            radsec_enabled: false,
            radsec_port: None,
            vendor: None,
            virtual_server: None,
            enabled: true,
            updated_at: default_updated_at(),
        }
    }

    /// Parse the client address as an IP network
    pub fn network(&self) -> Option<IpNetwork> {
        let address = self.ip_address.trim();
        address
            .parse::<IpNetwork>()
            .ok()
            .or_else(|| address.parse::<IpAddr>().ok().map(IpNetwork::from))
    }

    /// Single host address, when the client is not a network range
    pub fn host_address(&self) -> Option<IpAddr> {
        let network = self.network()?;
        let host_prefix = if network.is_ipv4() { 32 } else { 128 };
        (network.prefix() == host_prefix).then(|| network.ip())
    }

    pub fn matches(&self, ip: IpAddr) -> bool {
        self.network().is_some_and(|network| network.contains(ip))
    }

    /// Dynamic authorization port: the per-NAD override, else `default`
    pub fn coa_port(&self, default: u16) -> u16 {
        self.coa_port.unwrap_or(default)
    }

    /// Attribute dialect for dynamic authorization
    pub fn dialect(&self) -> Vendor {
        self.vendor.unwrap_or_else(|| {
            self.nas_type
                .as_deref()
                .map(Vendor::from_nas_type)
                .unwrap_or_default()
        })
    }
}

/// MAC authentication bypass list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacBypassConfig {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub mac_addresses: Vec<String>,
    #[serde(default)]
    pub profile_id: Option<EntityId>,
    /// Policy run for listed MACs
    #[serde(default)]
    pub registered_policy_id: Option<EntityId>,
    /// Policy run for MAC-shaped requests not on any list
    #[serde(default)]
    pub unregistered_policy_id: Option<EntityId>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_updated_at")]
    pub updated_at: DateTime<Utc>,
}

/// Identity pre-shared key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PskConfig {
    pub id: EntityId,
    pub name: String,
    /// MAC address or username the key is bound to
    pub identity: String,
    /// Stored encrypted; resolved through the secret decryptor
    pub passphrase: String,
    #[serde(default)]
    pub profile_id: Option<EntityId>,
    #[serde(default)]
    pub success_policy_id: Option<EntityId>,
    #[serde(default)]
    pub failure_policy_id: Option<EntityId>,
    #[serde(default)]
    pub udn_id: Option<u32>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_updated_at")]
    pub updated_at: DateTime<Utc>,
}

/// Local username/password identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityUser {
    pub id: EntityId,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub profile_id: Option<EntityId>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_updated_at")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EapKind {
    Tls,
    Ttls,
    Peap,
    Fast,
    Pwd,
    Md5,
    Mschapv2,
}

impl EapKind {
    /// EAP-Type value name in the daemon dictionary
    pub fn dictionary_name(self) -> &'static str {
        match self {
            EapKind::Tls => "TLS",
            EapKind::Ttls => "TTLS",
            EapKind::Peap => "PEAP",
            EapKind::Fast => "FAST",
            EapKind::Pwd => "PWD",
            EapKind::Md5 => "MD5",
            EapKind::Mschapv2 => "MSCHAPv2",
        }
    }
}

/// Links an EAP method to the policies run on success and failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EapMethod {
    pub id: EntityId,
    pub method: EapKind,
    #[serde(default)]
    pub success_policy_id: Option<EntityId>,
    #[serde(default)]
    pub failure_policy_id: Option<EntityId>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_updated_at")]
    pub updated_at: DateTime<Utc>,
}

/// Common bookkeeping fields of stored entities
pub trait Entity {
    fn id(&self) -> EntityId;
    fn updated_at(&self) -> DateTime<Utc>;
    fn is_active(&self) -> bool;
}

macro_rules! impl_entity {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Entity for $ty {
                fn id(&self) -> EntityId {
                    self.id
                }

                fn updated_at(&self) -> DateTime<Utc> {
                    self.updated_at
                }

                fn is_active(&self) -> bool {
                    self.enabled
                }
            }
        )*
    };
}

impl_entity!(
    AuthorizationProfile,
    UnlangPolicy,
    RadiusClient,
    MacBypassConfig,
    PskConfig,
    IdentityUser,
    EapMethod,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_network_parsing() {
        let host = RadiusClient::new(1, "ap", "10.0.0.5", "s");
        assert_eq!(host.host_address(), Some("10.0.0.5".parse().unwrap()));
        assert!(host.matches("10.0.0.5".parse().unwrap()));

        let range = RadiusClient::new(2, "lan", "10.1.0.0/16", "s");
        assert_eq!(range.host_address(), None);
        assert!(range.matches("10.1.200.7".parse().unwrap()));
        assert!(!range.matches("10.2.0.1".parse().unwrap()));

        let bad = RadiusClient::new(3, "bad", "not-an-ip", "s");
        assert!(bad.network().is_none());
        assert!(!bad.matches("10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn test_client_dialect() {
        let mut client = RadiusClient::new(1, "wlc", "10.0.0.5", "s");
        assert_eq!(client.dialect(), Vendor::Default);
        client.nas_type = Some("cisco-wlc".to_string());
        assert_eq!(client.dialect(), Vendor::AireOs);
        client.vendor = Some(Vendor::Aruba);
        assert_eq!(client.dialect(), Vendor::Aruba);
        assert_eq!(client.coa_port(3799), 3799);
        client.coa_port = Some(1700);
        assert_eq!(client.coa_port(3799), 1700);
    }

    #[test]
    fn test_profile_vlan_prefers_id() {
        let mut profile = AuthorizationProfile::new(1, "staff");
        assert_eq!(profile.vlan(), None);
        profile.vlan_name = Some("staff-vlan".to_string());
        assert_eq!(profile.vlan(), Some(VlanAssignment::Name("staff-vlan".to_string())));
        profile.vlan_id = Some(100);
        assert_eq!(profile.vlan(), Some(VlanAssignment::Id(100)));
    }

    #[test]
    fn test_policy_deserialization_defaults() {
        let json = r#"{
            "id": 4,
            "name": "guests",
            "priority": 50,
            "condition": {"attribute": "Called-Station-Id", "operator": "=~", "value": "guest$"},
            "then": {"action": "apply_profile", "profile_id": 2},
            "else": {"action": "reject", "reply_message": "not a guest SSID"}
        }"#;
        let policy: UnlangPolicy = serde_json::from_str(json).unwrap();
        assert!(policy.enabled);
        assert_eq!(policy.policy_type, PolicyType::Authorize);
        assert_eq!(policy.then, PolicyOutcome::apply_profile(2));
        assert_eq!(policy.otherwise.unwrap().action, PolicyAction::Reject);
        assert_eq!(policy.updated_at, DateTime::<Utc>::UNIX_EPOCH);
    }
}
