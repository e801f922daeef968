//! Audit logging for control-plane events
//!
//! One JSON object per line for every publish decision, reload and
//! dynamic-authorization exchange.

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::error;

/// Audit event type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// New artifacts written to the configuration directory
    ConfigPublished,
    /// Candidate artifacts rejected by validation
    ValidationFailed,
    /// A generator could not produce its artifact
    GenerationFailed,
    /// Policy compilation failed
    CompileFailed,
    ReloadSignalled,
    ReloadFailed,
    DisconnectSent,
    CoaSent,
    WatcherStarted,
    WatcherStopped,
}

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// ISO 8601 formatted timestamp
    pub timestamp: String,
    pub event_type: AuditEventType,
    /// Artifacts involved, by kind name
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<String>,
    /// Network access device address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nad_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nad_name: Option<String>,
    /// Packet identifier of a dynamic-authorization request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub version: String,
}

impl AuditEntry {
    pub fn new(event_type: AuditEventType) -> Self {
        AuditEntry {
            timestamp: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            event_type,
            artifacts: Vec::new(),
            nad_ip: None,
            nad_name: None,
            request_id: None,
            outcome: None,
            details: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn with_artifacts<I, S>(mut self, artifacts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.artifacts = artifacts.into_iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_nad(mut self, ip: IpAddr, name: impl Into<String>) -> Self {
        self.nad_ip = Some(ip.to_string());
        self.nad_name = Some(name.into());
        self
    }

    pub fn with_request_id(mut self, id: u8) -> Self {
        self.request_id = Some(id);
        self
    }

    pub fn with_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.outcome = Some(outcome.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Audit logger
///
/// A logger without a path accepts entries and drops them.
pub struct AuditLogger {
    file_path: Option<String>,
    file: Option<Arc<Mutex<std::fs::File>>>,
}

impl AuditLogger {
    pub fn new(file_path: Option<String>) -> std::io::Result<Self> {
        let file = if let Some(ref path) = file_path {
            let f = OpenOptions::new().create(true).append(true).open(path)?;
            Some(Arc::new(Mutex::new(f)))
        } else {
            None
        };

        Ok(AuditLogger { file_path, file })
    }

    pub fn disabled() -> Self {
        AuditLogger {
            file_path: None,
            file: None,
        }
    }

    pub async fn log(&self, entry: AuditEntry) {
        if let Some(ref file) = self.file {
            match serde_json::to_string(&entry) {
                Ok(json) => {
                    let mut f = file.lock().await;
                    if let Err(e) = writeln!(f, "{}", json) {
                        error!("Failed to write audit log: {}", e);
                    }
                }
                Err(e) => {
                    error!("Failed to serialize audit entry: {}", e);
                }
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.file.is_some()
    }

    pub fn file_path(&self) -> Option<&str> {
        self.file_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::NamedTempFile;

    #[test]
    fn test_audit_entry_serialization() {
        let entry = AuditEntry::new(AuditEventType::DisconnectSent)
            .with_nad("10.0.0.1".parse().unwrap(), "core-switch")
            .with_request_id(42)
            .with_outcome("nak");

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"event_type\":\"disconnect_sent\""));
        assert!(json.contains("core-switch"));
        assert!(json.contains("\"request_id\":42"));
        assert!(!json.contains("artifacts"));
    }

    #[tokio::test]
    async fn test_audit_logger_appends_lines() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap().to_string();
        let logger = AuditLogger::new(Some(path.clone())).unwrap();
        assert!(logger.is_enabled());
        assert_eq!(logger.file_path(), Some(path.as_str()));

        logger
            .log(
                AuditEntry::new(AuditEventType::ConfigPublished)
                    .with_artifacts(["clients", "users"]),
            )
            .await;
        logger
            .log(AuditEntry::new(AuditEventType::ReloadSignalled))
            .await;

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: AuditEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.event_type, AuditEventType::ConfigPublished);
        assert_eq!(first.artifacts, vec!["clients", "users"]);
    }

    #[tokio::test]
    async fn test_disabled_logger() {
        let logger = AuditLogger::disabled();
        assert!(!logger.is_enabled());
        logger.log(AuditEntry::new(AuditEventType::WatcherStarted)).await;
    }
}
