//! Tool settings.
//!
//! Every path and external handle the registrar uses comes from here; the
//! structure is built once in `main` (or by a test) and passed in explicitly.
//!
//! ```yaml
//! interface: wg0
//! wg_binary: wg
//! config:
//!   primary: /etc/wireguard/wg0.conf
//!   fallback: ./wg0.conf
//! registry:
//!   primary: /etc/wireguard/peers.list.json
//!   fallback: ./peers.list.json
//! private_key:
//!   primary: /etc/wireguard/private.key
//!   fallback: ./private.key
//! collision_match: exact   # or substring
//! apply_to_interface: true
//! ```

use crate::utils::PathPair;
use crate::wgconf::MatchMode;
use serde::{Deserialize, Serialize};

/// Settings validation errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Invalid interface: {0}")]
    InvalidInterface(String),

    #[error("Invalid path setting: {0}")]
    InvalidPath(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Tunnel interface peers are applied to
    pub interface: String,
    /// `wg` executable used for key generation and interface control
    pub wg_binary: String,
    /// Server configuration file
    pub config: PathPair,
    /// Peer registry file
    pub registry: PathPair,
    /// Private key material required before keys are generated
    pub private_key: PathPair,
    pub collision_match: MatchMode,
    /// Apply new peers to the live interface after committing them
    pub apply_to_interface: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            interface: "wg0".to_string(),
            wg_binary: "wg".to_string(),
            config: PathPair::new("/etc/wireguard/wg0.conf", "./wg0.conf"),
            registry: PathPair::new("/etc/wireguard/peers.list.json", "./peers.list.json"),
            private_key: PathPair::new("/etc/wireguard/private.key", "./private.key"),
            collision_match: MatchMode::Exact,
            apply_to_interface: true,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.interface.is_empty() {
            return Err(SettingsError::InvalidInterface("interface name cannot be empty".to_string()));
        }
        // Linux limits interface names to 15 bytes
        if self.interface.len() > 15 {
            return Err(SettingsError::InvalidInterface(format!(
                "interface name '{}' is longer than 15 characters",
                self.interface
            )));
        }
        if self.interface.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(SettingsError::InvalidInterface(format!(
                "interface name '{}' contains whitespace or '/'",
                self.interface
            )));
        }
        if self.wg_binary.trim().is_empty() {
            return Err(SettingsError::InvalidPath("wg_binary cannot be empty".to_string()));
        }

        for (label, pair) in [
            ("config", &self.config),
            ("registry", &self.registry),
            ("private_key", &self.private_key),
        ] {
            if pair.primary.as_os_str().is_empty() || pair.fallback.as_os_str().is_empty() {
                return Err(SettingsError::InvalidPath(format!("{} paths cannot be empty", label)));
            }
        }
        if self.config.primary == self.registry.primary || self.config.fallback == self.registry.fallback {
            return Err(SettingsError::InvalidPath(
                "config and registry must be different files".to_string(),
            ));
        }
        Ok(())
    }
}
