//! RFC 5176 Change-of-Authorization and Disconnect client
//!
//! Stateless: every request resolves its NAD from the store, opens its own
//! UDP socket, sends exactly one packet and waits a bounded time for one
//! answer. Retrying is left to the caller.

use crate::audit::{AuditEntry, AuditEventType, AuditLogger};
use crate::model::{EntityId, RadiusClient};
use crate::store::{PolicyStore, StoreError};
use radius_proto::dynauth::{self, DEFAULT_DYNAUTH_PORT, RequestOptions, ResponseError};
use radius_proto::{CoaChange, DynAuthError, Packet, SessionIdentifiers};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

/// Largest RADIUS packet (RFC 2865 section 3)
const MAX_PACKET_SIZE: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoaConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Port used when the NAD has no override
    #[serde(default = "default_port")]
    pub default_port: u16,
    /// Local address requests are sent from
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Add Message-Authenticator to requests
    #[serde(default = "default_message_authenticator")]
    pub message_authenticator: bool,
}

fn default_timeout_ms() -> u64 {
    3000
}

fn default_port() -> u16 {
    DEFAULT_DYNAUTH_PORT
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_message_authenticator() -> bool {
    true
}

impl Default for CoaConfig {
    fn default() -> Self {
        CoaConfig {
            timeout_ms: default_timeout_ms(),
            default_port: default_port(),
            bind_address: default_bind_address(),
            message_authenticator: default_message_authenticator(),
        }
    }
}

impl CoaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// How the caller names the target NAD
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NadRef {
    Id(EntityId),
    Ip(IpAddr),
}

impl std::fmt::Display for NadRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NadRef::Id(id) => write!(f, "id {}", id),
            NadRef::Ip(ip) => write!(f, "address {}", ip),
        }
    }
}

/// Rejected before any packet is sent
#[derive(Error, Debug)]
pub enum CallerError {
    #[error("no NAD with {0}")]
    NadNotFound(NadRef),
    #[error("CoA is disabled for NAD '{0}'")]
    CoaDisabled(String),
    #[error("NAD '{0}' is a network, not a single host")]
    NadAddressNotHost(String),
    #[error("at least one session identifier is required")]
    MissingSessionIdentifier,
    #[error("CoA request carries no changes")]
    NoChanges,
    #[error("{0}")]
    Unsupported(String),
}

/// The exchange with the NAD failed
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("no response from {address} within {}ms", .timeout.as_millis())]
    Timeout { address: SocketAddr, timeout: Duration },
    #[error(transparent)]
    Response(#[from] ResponseError),
    #[error("cannot encode request: {0}")]
    Encode(String),
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum CoaError {
    #[error(transparent)]
    Caller(#[from] CallerError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl CoaError {
    pub fn is_caller_error(&self) -> bool {
        matches!(self, CoaError::Caller(_))
    }
}

impl From<DynAuthError> for CoaError {
    fn from(err: DynAuthError) -> Self {
        match err {
            DynAuthError::MissingSessionIdentifier => CallerError::MissingSessionIdentifier.into(),
            DynAuthError::NoChanges => CallerError::NoChanges.into(),
            unsupported @ DynAuthError::Unsupported { .. } => {
                CallerError::Unsupported(unsupported.to_string()).into()
            }
            DynAuthError::Packet(e) => ProtocolError::Encode(e.to_string()).into(),
        }
    }
}

/// What the NAD answered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DynAuthResult {
    pub nad: String,
    pub address: SocketAddr,
    pub identifier: u8,
    /// Response code name, e.g. "CoA-ACK"
    pub code: String,
    /// ACK (true) or NAK (false)
    pub acknowledged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_cause: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_cause_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_message: Option<String>,
    pub elapsed_ms: u64,
}

struct Target {
    nad: RadiusClient,
    host: IpAddr,
    address: SocketAddr,
}

#[derive(Clone)]
pub struct CoaClient {
    store: Arc<dyn PolicyStore>,
    config: CoaConfig,
    audit: Arc<AuditLogger>,
}

impl CoaClient {
    pub fn new(store: Arc<dyn PolicyStore>, config: CoaConfig, audit: Arc<AuditLogger>) -> Self {
        CoaClient {
            store,
            config,
            audit,
        }
    }

    async fn resolve(&self, nad: NadRef) -> Result<Target, CoaError> {
        let client = match nad {
            NadRef::Id(id) => self.store.get_client(id).await?.filter(|client| client.enabled),
            NadRef::Ip(ip) => self.store.find_client_by_ip(ip).await?,
        }
        .ok_or(CallerError::NadNotFound(nad))?;

        if !client.coa_enabled {
            return Err(CallerError::CoaDisabled(client.name.clone()).into());
        }
        let host = match nad {
            NadRef::Ip(ip) => ip,
            NadRef::Id(_) => client
                .host_address()
                .ok_or_else(|| CallerError::NadAddressNotHost(client.name.clone()))?,
        };
        let port = client.coa_port(self.config.default_port);
        Ok(Target {
            nad: client,
            host,
            address: SocketAddr::new(host, port),
        })
    }

    /// Send a Disconnect-Request (code 40)
    pub async fn send_disconnect(
        &self,
        nad: NadRef,
        session: &SessionIdentifiers,
    ) -> Result<DynAuthResult, CoaError> {
        if session.is_empty() {
            return Err(CallerError::MissingSessionIdentifier.into());
        }
        let target = self.resolve(nad).await?;
        let identifier: u8 = rand::rng().random();
        let options = self.options(&target, identifier);
        let request = dynauth::build_disconnect_request(session, &options)?;
        self.exchange(AuditEventType::DisconnectSent, &target, request).await
    }

    /// Send a CoA-Request (code 43) in the NAD's attribute dialect
    pub async fn send_coa(
        &self,
        nad: NadRef,
        session: &SessionIdentifiers,
        changes: &[CoaChange],
    ) -> Result<DynAuthResult, CoaError> {
        if session.is_empty() {
            return Err(CallerError::MissingSessionIdentifier.into());
        }
        if changes.is_empty() {
            return Err(CallerError::NoChanges.into());
        }
        let target = self.resolve(nad).await?;
        let identifier: u8 = rand::rng().random();
        let options = self.options(&target, identifier);
        let request = dynauth::build_coa_request(session, changes, target.nad.dialect(), &options)?;
        self.exchange(AuditEventType::CoaSent, &target, request).await
    }

    fn options<'a>(&self, target: &'a Target, identifier: u8) -> RequestOptions<'a> {
        RequestOptions {
            identifier,
            secret: target.nad.secret.as_bytes(),
            nas_address: Some(target.host),
            message_authenticator: self.config.message_authenticator,
        }
    }

    async fn exchange(
        &self,
        event: AuditEventType,
        target: &Target,
        request: Packet,
    ) -> Result<DynAuthResult, CoaError> {
        let outcome = self.round_trip(target, &request).await;
        let mut entry = AuditEntry::new(event)
            .with_nad(target.host, target.nad.name.clone())
            .with_request_id(request.identifier);
        entry = match &outcome {
            Ok(result) => entry.with_outcome(&result.code),
            Err(e) => entry.with_outcome("error").with_details(e.to_string()),
        };
        self.audit.log(entry).await;
        outcome
    }

    async fn round_trip(
        &self,
        target: &Target,
        request: &Packet,
    ) -> Result<DynAuthResult, CoaError> {
        let bytes = request
            .encode()
            .map_err(|e| ProtocolError::Encode(e.to_string()))?;
        let bind_ip: IpAddr = match (self.config.bind_address.parse::<IpAddr>(), target.host) {
            (Ok(ip), host) if ip.is_ipv4() == host.is_ipv4() => ip,
            (_, IpAddr::V4(_)) => IpAddr::from([0u8; 4]),
            (_, IpAddr::V6(_)) => IpAddr::from([0u16; 8]),
        };

        let socket = UdpSocket::bind(SocketAddr::new(bind_ip, 0))
            .await
            .map_err(ProtocolError::Io)?;
        socket.connect(target.address).await.map_err(ProtocolError::Io)?;

        let started = Instant::now();
        socket.send(&bytes).await.map_err(ProtocolError::Io)?;
        debug!(
            nad = %target.nad.name,
            address = %target.address,
            code = %request.code,
            identifier = request.identifier,
            "dynamic authorization request sent"
        );

        let timeout = self.config.timeout();
        let deadline = tokio::time::Instant::now() + timeout;
        let secret = target.nad.secret.as_bytes();
        let mut buf = vec![0u8; MAX_PACKET_SIZE];
        let response = loop {
            let len = tokio::time::timeout_at(deadline, socket.recv(&mut buf))
                .await
                .map_err(|_| ProtocolError::Timeout {
                    address: target.address,
                    timeout,
                })?
                .map_err(ProtocolError::Io)?;

            match dynauth::interpret_response(request, &buf[..len], secret) {
                Ok(response) => break response,
                // A stray answer to some earlier request; keep waiting for ours
                Err(ResponseError::IdentifierMismatch { expected, received }) => {
                    debug!(
                        nad = %target.nad.name,
                        expected,
                        received,
                        "discarded response with foreign identifier"
                    );
                }
                Err(e) => {
                    warn!(
                        nad = %target.nad.name,
                        error = %e,
                        "rejected dynamic authorization response"
                    );
                    return Err(ProtocolError::Response(e).into());
                }
            }
        };

        let result = DynAuthResult {
            nad: target.nad.name.clone(),
            address: target.address,
            identifier: request.identifier,
            code: response.code.to_string(),
            acknowledged: response.acknowledged,
            error_cause: response.error_cause.map(|cause| cause.as_u32()),
            error_cause_text: response.error_cause.map(|cause| cause.description().to_string()),
            reply_message: response.reply_message,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            nad = %result.nad,
            code = %result.code,
            acknowledged = result.acknowledged,
            error_cause = ?result.error_cause,
            "dynamic authorization answered"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn client(coa_enabled: bool) -> RadiusClient {
        let mut nad = RadiusClient::new(1, "wlc", "127.0.0.1", "testing123");
        nad.coa_enabled = coa_enabled;
        nad
    }

    async fn coa_client(nad: RadiusClient) -> CoaClient {
        let store = Arc::new(MemoryStore::new());
        store.upsert_client(nad).await;
        CoaClient::new(store, CoaConfig::default(), Arc::new(AuditLogger::disabled()))
    }

    fn session() -> SessionIdentifiers {
        SessionIdentifiers {
            user_name: Some("alice".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_unknown_nad() {
        let client = coa_client(client(true)).await;
        let err = client.send_disconnect(NadRef::Id(9), &session()).await.unwrap_err();
        assert!(matches!(err, CoaError::Caller(CallerError::NadNotFound(NadRef::Id(9)))));
    }

    #[tokio::test]
    async fn test_caller_errors_precede_network() {
        let client = coa_client(client(true)).await;
        let err = client
            .send_disconnect(NadRef::Id(1), &SessionIdentifiers::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoaError::Caller(CallerError::MissingSessionIdentifier)));

        let err = client.send_coa(NadRef::Id(1), &session(), &[]).await.unwrap_err();
        assert!(matches!(err, CoaError::Caller(CallerError::NoChanges)));
    }

    #[tokio::test]
    async fn test_network_nad_needs_explicit_address() {
        let mut nad = client(true);
        nad.ip_address = "10.0.0.0/24".to_string();
        let client = coa_client(nad).await;
        let err = client.send_disconnect(NadRef::Id(1), &session()).await.unwrap_err();
        assert!(matches!(err, CoaError::Caller(CallerError::NadAddressNotHost(_))));
    }

    #[tokio::test]
    async fn test_unsupported_change_is_caller_error() {
        let client = coa_client(client(true)).await;
        let err = client
            .send_coa(NadRef::Id(1), &session(), &[CoaChange::RemoveUrlRedirect])
            .await
            .unwrap_err();
        assert!(err.is_caller_error(), "{:?}", err);
    }

    #[test]
    fn test_config_defaults() {
        let config: CoaConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, CoaConfig::default());
        assert_eq!(config.default_port, 3799);
        assert_eq!(config.timeout(), Duration::from_millis(3000));
    }
}
