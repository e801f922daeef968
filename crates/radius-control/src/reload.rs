//! Daemon reload signalling

use crate::process::{self, CommandError};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ReloadError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("reload command exited with {status}: {output}")]
    Failed { status: String, output: String },
}

/// Asks the running daemon to pick up the published configuration
#[async_trait]
pub trait Reloader: Send + Sync {
    async fn reload(&self) -> Result<(), ReloadError>;
}

#[derive(Debug, Clone)]
pub struct CommandReloader {
    command: Vec<String>,
    timeout: Duration,
}

impl CommandReloader {
    pub fn new(command: Vec<String>, timeout: Duration) -> Self {
        CommandReloader { command, timeout }
    }

    pub fn default_command() -> Vec<String> {
        ["systemctl", "reload", "freeradius"]
            .iter()
            .map(|part| part.to_string())
            .collect()
    }
}

#[async_trait]
impl Reloader for CommandReloader {
    async fn reload(&self) -> Result<(), ReloadError> {
        let output = process::run(&self.command, self.timeout).await?;
        if !output.status.success() {
            return Err(ReloadError::Failed {
                status: output.status.to_string(),
                output: output.combined().trim().to_string(),
            });
        }
        info!(command = ?self.command, "daemon reload signalled");
        Ok(())
    }
}

/// For deployments where the daemon watches its own files
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReloader;

#[async_trait]
impl Reloader for NoopReloader {
    async fn reload(&self) -> Result<(), ReloadError> {
        Ok(())
    }
}
