//! Secret decryption capability
//!
//! PSK passphrases and backend credentials are stored encrypted by the CRUD
//! layer. The cipher is not ours to choose; generators receive a decryptor
//! and never assume a format.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SecretError {
    #[error("cannot decrypt {what}: {reason}")]
    Decrypt { what: String, reason: String },
}

pub trait SecretDecryptor: Send + Sync {
    /// Plaintext for a stored secret; `what` names the secret for error messages
    fn decrypt(&self, what: &str, stored: &str) -> Result<String, SecretError>;
}

/// Secrets are stored in plaintext
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextSecrets;

impl SecretDecryptor for PlaintextSecrets {
    fn decrypt(&self, _what: &str, stored: &str) -> Result<String, SecretError> {
        Ok(stored.to_string())
    }
}
