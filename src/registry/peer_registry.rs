//! Loading and persisting the peer registry.

use super::record::PeerRecord;
use crate::error::RegistrationError;
use crate::ip::AddressBlock;
use crate::utils::{find_registry_conflicts, write_atomic, PathPair};
use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// The registry as read at the start of an operation.
///
/// Records keep the order of the underlying JSON object; the last record is
/// the most recently registered peer.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrySnapshot {
    source: PathBuf,
    peers: Vec<PeerRecord>,
}

impl RegistrySnapshot {
    /// An empty snapshot that will be persisted to `source`
    pub fn new(source: impl Into<PathBuf>) -> Self {
        RegistrySnapshot {
            source: source.into(),
            peers: Vec::new(),
        }
    }

    /// Parse the registry JSON object
    pub fn from_json(source: impl Into<PathBuf>, text: &str) -> Result<Self, String> {
        let mut snapshot = RegistrySnapshot::new(source);
        if text.trim().is_empty() {
            return Ok(snapshot);
        }

        let entries: Map<String, Value> =
            serde_json::from_str(text).map_err(|e| format!("invalid registry JSON: {}", e))?;
        for (name, value) in entries {
            let mut record: PeerRecord = serde_json::from_value(value)
                .map_err(|e| format!("invalid record for peer '{}': {}", name, e))?;
            record.name = name;
            snapshot.peers.push(record);
        }
        Ok(snapshot)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        let mut entries = Map::new();
        for record in &self.peers {
            entries.insert(record.name.clone(), serde_json::to_value(record)?);
        }
        let mut text = serde_json::to_string_pretty(&Value::Object(entries))?;
        text.push('\n');
        Ok(text)
    }

    /// Path the snapshot was loaded from and is persisted to
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn records(&self) -> &[PeerRecord] {
        &self.peers
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&PeerRecord> {
        self.peers.iter().find(|r| r.name == name)
    }

    /// The most recently inserted record
    pub fn last(&self) -> Option<&PeerRecord> {
        self.peers.last()
    }

    /// Insert a record, replacing one with the same name in place
    pub fn upsert(&mut self, record: PeerRecord) {
        match self.peers.iter_mut().find(|r| r.name == record.name) {
            Some(existing) => *existing = record,
            None => self.peers.push(record),
        }
    }

    /// Whether any record already holds this IP, whatever its mask
    pub fn is_address_assigned(&self, block: &AddressBlock) -> bool {
        self.peers.iter().any(|r| {
            r.allowed_ips
                .parse::<AddressBlock>()
                .map(|assigned| assigned.addr() == block.addr())
                .unwrap_or(false)
        })
    }
}

/// File-backed peer registry
#[derive(Debug, Clone)]
pub struct PeerRegistry {
    paths: PathPair,
}

impl PeerRegistry {
    pub fn new(paths: PathPair) -> Self {
        PeerRegistry { paths }
    }

    pub fn paths(&self) -> &PathPair {
        &self.paths
    }

    /// Load the registry from the primary path, or the fallback when the
    /// primary does not exist.
    ///
    /// When neither file exists the result is an empty snapshot targeting
    /// the fallback path; callers that need a peer to allocate from report
    /// `EmptyRegistry`.
    pub fn load(&self) -> Result<RegistrySnapshot, RegistrationError> {
        let path = self.paths.resolve().to_path_buf();
        let snapshot = match read_snapshot(&path)? {
            Some(snapshot) => snapshot,
            None => {
                warn!("No registry found at {:?} or {:?}", self.paths.primary, self.paths.fallback);
                RegistrySnapshot::new(path)
            }
        };

        debug!("Loaded {} peer(s) from {:?}", snapshot.len(), snapshot.source());
        for problem in find_registry_conflicts(snapshot.records()) {
            warn!("Registry {:?} is inconsistent: {}", snapshot.source(), problem);
        }
        Ok(snapshot)
    }

    /// Address of the most recently registered peer, which the next
    /// allocation continues from.
    pub fn next_base_address(snapshot: &RegistrySnapshot) -> Result<AddressBlock, RegistrationError> {
        let last = snapshot.last().ok_or_else(|| RegistrationError::EmptyRegistry {
            path: snapshot.source().to_path_buf(),
        })?;
        Ok(last.allowed_ips.parse()?)
    }

    pub fn contains(snapshot: &RegistrySnapshot, name: &str) -> bool {
        snapshot.contains(name)
    }

    /// Write `snapshot` back to its source path.
    ///
    /// The file is re-read first and the snapshot merged into it: records
    /// already on disk keep their position and are refreshed from the
    /// snapshot, new records are appended. Nothing on disk is dropped.
    pub fn persist(&self, snapshot: &RegistrySnapshot) -> Result<(), RegistrationError> {
        let path = snapshot.source();
        let mut merged = read_snapshot(path)?.unwrap_or_else(|| RegistrySnapshot::new(path));
        let before = merged.len();
        for record in snapshot.records() {
            merged.upsert(record.clone());
        }

        let text = merged.to_json().map_err(|e| RegistrationError::WriteFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        write_atomic(path, text.as_bytes(), None).map_err(|e| RegistrationError::WriteFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        info!(
            "Persisted registry {:?}: {} peer(s), {} new",
            path,
            merged.len(),
            merged.len() - before
        );
        Ok(())
    }
}

/// Read a snapshot, distinguishing an absent file from an unreadable one
fn read_snapshot(path: &Path) -> Result<Option<RegistrySnapshot>, RegistrationError> {
    let unreadable = |reason: String| RegistrationError::RegistryUnreadable {
        path: path.to_path_buf(),
        reason,
    };

    match fs::read_to_string(path) {
        Ok(text) => RegistrySnapshot::from_json(path, &text).map(Some).map_err(unreadable),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(unreadable(e.to_string())),
    }
}
