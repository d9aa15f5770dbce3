//! WireGuard server configuration document.
//!
//! The configuration is never parsed into a model. It is read once as text,
//! scanned line by line for colliding `PublicKey` / `AllowedIPs` values, and
//! rewritten with new `[Peer]` sections appended at the end.

pub mod collision;
pub mod section;

pub use collision::{find_collision, Collision, CollisionField, MatchMode};
pub use section::{append_section, render_section};

use crate::error::RegistrationError;
use crate::utils::{write_atomic, PathPair};
use std::fs;
use std::path::{Path, PathBuf};

/// Permission bits for written config files: owner read/write only
pub const CONFIG_FILE_MODE: u32 = 0o600;

/// Config text as read from disk, together with where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDocument {
    path: PathBuf,
    text: String,
}

impl ConfigDocument {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        ConfigDocument {
            path: path.into(),
            text: text.into(),
        }
    }

    /// Read the config from the primary path, or the fallback when the
    /// primary does not exist.
    pub fn load(paths: &PathPair) -> Result<Self, RegistrationError> {
        let path = paths.resolve();
        let text = fs::read_to_string(path).map_err(|e| RegistrationError::ConfigUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        log::debug!("Read {} bytes of config from {:?}", text.len(), path);
        Ok(ConfigDocument::new(path, text))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn find_collision(&self, address: &str, public_key: &str, mode: MatchMode) -> Option<Collision> {
        find_collision(&self.text, address, public_key, mode)
    }

    /// Whether a `PublicKey` or `AllowedIPs` line lists exactly this key
    pub fn contains_public_key(&self, public_key: &str) -> bool {
        find_collision(&self.text, "", public_key, MatchMode::Exact).is_some()
    }

    /// The text with `section` appended
    pub fn appended(&self, section: &str) -> String {
        append_section(&self.text, section)
    }

    /// Replace the file this document was read from with `contents`
    pub fn write(&self, contents: &str) -> Result<(), RegistrationError> {
        write_atomic(&self.path, contents.as_bytes(), Some(CONFIG_FILE_MODE)).map_err(|e| {
            RegistrationError::ConfigWriteFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            }
        })?;
        log::info!("Wrote {} bytes to {:?}", contents.len(), self.path);
        Ok(())
    }
}
