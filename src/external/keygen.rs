//! Peer keypair generation.

use super::{describe_failure, run_command};
use crate::utils::PathPair;
use std::fmt;

/// Errors surfaced as `KeyGenerationFailed`
#[derive(Debug, thiserror::Error)]
pub enum KeyGenError {
    #[error("no private key material available (checked {primary} and {fallback})")]
    NoKeyMaterial { primary: String, fallback: String },

    #[error("`{command}` failed: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("`{command}` produced no key")]
    EmptyOutput { command: String },
}

/// A freshly generated peer keypair.
///
/// Only the public half is registered; the private half is handed back to
/// the operator once so it can be put into the client's configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct Keypair {
    pub private_key: String,
    pub public_key: String,
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("private_key", &"<redacted>")
            .field("public_key", &self.public_key)
            .finish()
    }
}

/// Produces a fresh keypair for each new peer
pub trait KeyGenerator {
    fn generate(&self) -> Result<Keypair, KeyGenError>;
}

/// Generates keys with `wg genkey` / `wg pubkey`.
///
/// Generation is refused unless the server's private key material is
/// present, which guards against running on a host without a configured
/// interface.
#[derive(Debug, Clone)]
pub struct WgKeyGenerator {
    wg_binary: String,
    key_material: PathPair,
}

impl WgKeyGenerator {
    pub fn new(wg_binary: impl Into<String>, key_material: PathPair) -> Self {
        WgKeyGenerator {
            wg_binary: wg_binary.into(),
            key_material,
        }
    }

    fn run(&self, subcommand: &str, stdin: Option<&str>) -> Result<String, KeyGenError> {
        let command = format!("{} {}", self.wg_binary, subcommand);
        let output = run_command(&self.wg_binary, &[subcommand], stdin).map_err(|e| KeyGenError::CommandFailed {
            command: command.clone(),
            reason: e.to_string(),
        })?;
        if !output.status.success() {
            return Err(KeyGenError::CommandFailed {
                reason: describe_failure(&output),
                command,
            });
        }

        let key = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if key.is_empty() {
            return Err(KeyGenError::EmptyOutput { command });
        }
        Ok(key)
    }
}

impl KeyGenerator for WgKeyGenerator {
    fn generate(&self) -> Result<Keypair, KeyGenError> {
        let material = self.key_material.existing().ok_or_else(|| KeyGenError::NoKeyMaterial {
            primary: self.key_material.primary.display().to_string(),
            fallback: self.key_material.fallback.display().to_string(),
        })?;
        log::debug!("Using private key material at {:?}", material);

        let private_key = self.run("genkey", None)?;
        let public_key = self.run("pubkey", Some(&format!("{}\n", private_key)))?;
        Ok(Keypair { private_key, public_key })
    }
}
