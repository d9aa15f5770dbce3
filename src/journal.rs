//! Write-ahead marker for the two-file commit.
//!
//! A registration rewrites the server config and then the registry. Before
//! the first write, the record being committed is staged in
//! `<registry>.pending`; the marker is removed once the registry write has
//! landed. A marker found later means an earlier commit stopped between the
//! two writes.

use crate::error::RegistrationError;
use crate::registry::PeerRecord;
use crate::utils::{write_atomic, PathPair};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Contents of the marker file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingCommit {
    pub name: String,
    pub record: PeerRecord,
    pub config_path: PathBuf,
    pub registry_path: PathBuf,
    pub staged_at: String,
}

impl PendingCommit {
    pub fn new(record: &PeerRecord, config_path: &Path, registry_path: &Path) -> Self {
        PendingCommit {
            name: record.name.clone(),
            record: record.clone(),
            config_path: config_path.to_path_buf(),
            registry_path: registry_path.to_path_buf(),
            staged_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// The staged record with its name restored
    pub fn peer(&self) -> PeerRecord {
        let mut record = self.record.clone();
        record.name = self.name.clone();
        record
    }
}

/// The marker file next to a registry file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    pub fn for_registry(registry: &Path) -> Self {
        let mut name = OsString::from(registry.as_os_str());
        name.push(".pending");
        Journal { path: PathBuf::from(name) }
    }

    /// Find an existing marker next to either registry location
    pub fn find(registry: &PathPair) -> Option<Journal> {
        [&registry.primary, &registry.fallback]
            .into_iter()
            .map(|p| Journal::for_registry(p))
            .find(|j| j.path.exists())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stage(&self, pending: &PendingCommit) -> Result<(), RegistrationError> {
        let text = serde_json::to_string_pretty(pending).map_err(|e| self.write_failed(e.to_string()))?;
        write_atomic(&self.path, text.as_bytes(), None).map_err(|e| self.write_failed(e.to_string()))?;
        log::debug!("Staged pending commit of '{}' in {:?}", pending.name, self.path);
        Ok(())
    }

    /// Read the marker; `None` when there is none
    pub fn read(&self) -> Result<Option<PendingCommit>, RegistrationError> {
        let unreadable = |reason: String| RegistrationError::RegistryUnreadable {
            path: self.path.clone(),
            reason,
        };
        match fs::read_to_string(&self.path) {
            Ok(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| unreadable(format!("invalid pending-commit marker: {}", e))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(unreadable(e.to_string())),
        }
    }

    pub fn clear(&self) -> std::io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    fn write_failed(&self, reason: String) -> RegistrationError {
        RegistrationError::WriteFailed {
            path: self.path.clone(),
            reason,
        }
    }
}
