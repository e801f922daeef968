use crate::coa::CoaConfig;
use crate::generators::{ArtifactLayout, SiteOptions, SqlModuleOptions};
use crate::reload::CommandReloader;
use crate::validator::CommandValidator;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Candidate validation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Run the built-in lexical checks before the external command
    #[serde(default = "default_true")]
    pub structural: bool,
    /// External check; `{raddb}` is replaced with the staged directory.
    /// An empty list disables the external check.
    #[serde(default = "CommandValidator::default_command")]
    pub command: Vec<String>,
    #[serde(default = "default_validator_timeout")]
    pub timeout_secs: u64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        ValidatorConfig {
            structural: true,
            command: CommandValidator::default_command(),
            timeout_secs: default_validator_timeout(),
        }
    }
}

/// Daemon reload settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloadConfig {
    /// An empty list disables reload signalling
    #[serde(default = "CommandReloader::default_command")]
    pub command: Vec<String>,
    #[serde(default = "default_reload_timeout")]
    pub timeout_secs: u64,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        ReloadConfig {
            command: CommandReloader::default_command(),
            timeout_secs: default_reload_timeout(),
        }
    }
}

/// Control-plane configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Daemon configuration directory the artifacts are published into
    #[serde(default = "default_raddb_dir")]
    pub raddb_dir: PathBuf,

    /// Working directory for staged candidate sets
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// JSON document holding the policy store
    pub store_path: PathBuf,

    /// Seconds between store polls (default: 30)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default)]
    pub validator: ValidatorConfig,

    #[serde(default)]
    pub reload: ReloadConfig,

    #[serde(default)]
    pub layout: ArtifactLayout,

    #[serde(default)]
    pub site: SiteOptions,

    #[serde(default)]
    pub sql: SqlModuleOptions,

    #[serde(default)]
    pub coa: CoaConfig,

    /// Log level: "trace", "debug", "info", "warn", "error" (default: "info")
    #[serde(default)]
    pub log_level: Option<String>,

    /// Audit log file path (JSON lines, optional)
    #[serde(default)]
    pub audit_log_path: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_raddb_dir() -> PathBuf {
    PathBuf::from("/etc/freeradius/3.0")
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("/var/lib/radius-control")
}

fn default_poll_interval() -> u64 {
    30
}

fn default_validator_timeout() -> u64 {
    30
}

fn default_reload_timeout() -> u64 {
    15
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn validator_timeout(&self) -> Duration {
        Duration::from_secs(self.validator.timeout_secs)
    }

    pub fn reload_timeout(&self) -> Duration {
        Duration::from_secs(self.reload.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.raddb_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("raddb_dir cannot be empty".to_string()));
        }
        if self.state_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("state_dir cannot be empty".to_string()));
        }
        if self.store_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("store_path cannot be empty".to_string()));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid("poll_interval_secs cannot be 0".to_string()));
        }
        if self.validator.timeout_secs == 0 || self.reload.timeout_secs == 0 {
            return Err(ConfigError::Invalid("command timeouts cannot be 0".to_string()));
        }
        if !self.validator.structural && self.validator.command.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one of validator.structural and validator.command is required".to_string(),
            ));
        }
        self.layout.validate().map_err(ConfigError::Invalid)?;

        if self.site.listen_address != "*" && self.site.listen_address.parse::<IpAddr>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "Invalid site listen address: {}",
                self.site.listen_address
            )));
        }
        if self.site.auth_port == 0 || self.site.acct_port == 0 {
            return Err(ConfigError::Invalid("site ports cannot be 0".to_string()));
        }
        if self.sql.enabled && (self.sql.server.is_empty() || self.sql.login.is_empty()) {
            return Err(ConfigError::Invalid(
                "sql.server and sql.login are required when sql is enabled".to_string(),
            ));
        }

        self.coa.bind_address.parse::<IpAddr>().map_err(|_| {
            ConfigError::Invalid(format!("Invalid CoA bind address: {}", self.coa.bind_address))
        })?;
        if self.coa.timeout_ms == 0 {
            return Err(ConfigError::Invalid("coa.timeout_ms cannot be 0".to_string()));
        }
        if self.coa.default_port == 0 {
            return Err(ConfigError::Invalid("coa.default_port cannot be 0".to_string()));
        }
        Ok(())
    }

    /// Create an example configuration
    pub fn example() -> Self {
        Config {
            raddb_dir: default_raddb_dir(),
            state_dir: default_state_dir(),
            store_path: PathBuf::from("/var/lib/radius-control/store.json"),
            poll_interval_secs: default_poll_interval(),
            validator: ValidatorConfig::default(),
            reload: ReloadConfig::default(),
            layout: ArtifactLayout::default(),
            site: SiteOptions::default(),
            sql: SqlModuleOptions::default(),
            coa: CoaConfig::default(),
            log_level: Some("info".to_string()),
            audit_log_path: Some("/var/log/radius-control/audit.log".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_example_config_is_valid() {
        assert!(Config::example().validate().is_ok());
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"store_path": "store.json"}"#).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.validator.command[0], "radiusd");
        assert_eq!(config.reload.command, vec!["systemctl", "reload", "freeradius"]);
        assert_eq!(config.coa.default_port, 3799);
        assert!(!config.sql.enabled);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::example();
        config.poll_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::example();
        config.coa.bind_address = "not-an-ip".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::example();
        config.layout.clients_file = PathBuf::from("/etc/passwd");
        assert!(config.validate().is_err());

        let mut config = Config::example();
        config.validator.structural = false;
        config.validator.command.clear();
        assert!(config.validate().is_err());

        let mut config = Config::example();
        config.sql.enabled = true;
        assert!(config.validate().is_err());
        config.sql.login = "radius".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        Config::example().to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.raddb_dir, default_raddb_dir());
        assert_eq!(loaded.site, SiteOptions::default());

        std::fs::write(&path, r#"{"store_path": "s.json", "poll_interval_secs": 0}"#).unwrap();
        assert!(matches!(Config::from_file(&path), Err(ConfigError::Invalid(_))));
    }
}
