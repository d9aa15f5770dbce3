//! Peer registration orchestrator.
//!
//! This module coordinates a registration attempt from the requested name
//! to the committed config section and registry record. Steps run strictly
//! in order and each one is logged:
//!
//! 1. name checked against the registry
//! 2. address allocated after the most recently registered peer
//! 3. keypair obtained
//! 4. live config scanned for the address or key (a hit is a rejection)
//! 5. config rewritten, then registry persisted
//!
//! Nothing is written before step 5. A failure between the two writes of
//! step 5 is reported as `PartialCommit` and leaves a pending-commit marker
//! behind for [`PeerRegistrar::recover`].

use crate::error::{FailureKind, RegistrationError};
use crate::external::{InterfaceControl, KeyGenerator, NoInterface, WgKeyGenerator, WgSetCommand};
use crate::ip::{next_address, AddressBlock};
use crate::journal::{Journal, PendingCommit};
use crate::registry::{PeerRecord, PeerRegistry, RegistrySnapshot};
use crate::settings::Settings;
use crate::utils::validate_peer_name;
use crate::wgconf::{find_collision, render_section, append_section, CollisionField, ConfigDocument};
use log::{debug, error, info, warn};
use std::fmt;

/// A request to register a new peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRequest {
    pub name: String,
    pub endpoint: Option<String>,
    pub persistent_keepalive: Option<u32>,
}

impl PeerRequest {
    pub fn new(name: impl Into<String>) -> Self {
        PeerRequest {
            name: name.into(),
            endpoint: None,
            persistent_keepalive: None,
        }
    }
}

/// A peer that reached the config file, with the private half of its keypair
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedPeer {
    pub record: PeerRecord,
    pub private_key: String,
}

/// Outcome of a registration attempt
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationResult {
    /// Both files were updated
    Committed {
        record: PeerRecord,
        /// Private half of the generated keypair, for the client config
        private_key: String,
    },
    /// The address or key is already present in the config; nothing was written
    Rejected { field: CollisionField, value: String, line: usize },
    /// `committed` is set when the failure came after the config write
    /// (`PartialCommit`, `InterfaceActivationFailed`): the peer is in the
    /// config and its keypair must still reach the client.
    Failed {
        kind: FailureKind,
        detail: String,
        committed: Option<CommittedPeer>,
    },
}

impl RegistrationResult {
    pub fn is_committed(&self) -> bool {
        matches!(self, RegistrationResult::Committed { .. })
    }

    /// Private key of a peer that was written to the config, if any
    pub fn private_key(&self) -> Option<&str> {
        match self {
            RegistrationResult::Committed { private_key, .. } => Some(private_key),
            RegistrationResult::Failed {
                committed: Some(peer), ..
            } => Some(&peer.private_key),
            _ => None,
        }
    }
}

impl From<RegistrationError> for RegistrationResult {
    fn from(err: RegistrationError) -> Self {
        RegistrationResult::Failed {
            kind: err.kind(),
            detail: err.to_string(),
            committed: None,
        }
    }
}

impl fmt::Display for RegistrationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationResult::Committed { record, .. } => write!(
                f,
                "Peer {} added to the configuration ({} {})",
                record.name, record.public_key, record.allowed_ips
            ),
            RegistrationResult::Rejected { field, value, line } => write!(
                f,
                "Peer not added: {} {} already exists (config line {})",
                field, value, line
            ),
            RegistrationResult::Failed { kind, detail, .. } => write!(f, "{}: {}", kind, detail),
        }
    }
}

/// What `recover` found and did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// No pending commit
    Clean,
    /// The config had the peer and the registry did not; the record was persisted
    Resumed { name: String },
    /// Both files already had the peer; only the marker was stale
    AlreadyCommitted { name: String },
    /// The config write never happened; the staged peer was dropped
    Discarded { name: String },
}

/// Per-peer result of writing registry records into the config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEntry {
    pub name: String,
    pub status: SyncStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    Appended,
    Collided { field: CollisionField, value: String },
    Incomplete { detail: String },
}

/// Registers peers into the registry and the server config
pub struct PeerRegistrar {
    settings: Settings,
    registry: PeerRegistry,
    keys: Box<dyn KeyGenerator>,
    interface: Box<dyn InterfaceControl>,
}

impl PeerRegistrar {
    pub fn new(settings: Settings, keys: Box<dyn KeyGenerator>, interface: Box<dyn InterfaceControl>) -> Self {
        let registry = PeerRegistry::new(settings.registry.clone());
        PeerRegistrar {
            settings,
            registry,
            keys,
            interface,
        }
    }

    /// Build a registrar that drives the `wg` tool
    pub fn from_settings(settings: Settings) -> Self {
        let keys = Box::new(WgKeyGenerator::new(&settings.wg_binary, settings.private_key.clone()));
        let interface: Box<dyn InterfaceControl> = if settings.apply_to_interface {
            Box::new(WgSetCommand::new(&settings.wg_binary, &settings.interface))
        } else {
            Box::new(NoInterface)
        };
        PeerRegistrar::new(settings, keys, interface)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    /// Register a new peer by name
    pub fn register_peer(&self, name: &str) -> RegistrationResult {
        self.register(&PeerRequest::new(name))
    }

    pub fn register(&self, request: &PeerRequest) -> RegistrationResult {
        match self.try_register(request) {
            Ok(result) => result,
            Err(err) => {
                match err.kind() {
                    FailureKind::PartialCommit | FailureKind::InterfaceActivationFailed => {
                        error!("Registration of '{}' needs attention: {}", request.name, err)
                    }
                    _ => warn!("Registration of '{}' failed: {}", request.name, err),
                }
                err.into()
            }
        }
    }

    fn try_register(&self, request: &PeerRequest) -> Result<RegistrationResult, RegistrationError> {
        self.ensure_no_pending_commit()?;
        validate_peer_name(&request.name).map_err(|reason| RegistrationError::InvalidName {
            name: request.name.clone(),
            reason,
        })?;

        let mut snapshot = self.registry.load()?;
        if PeerRegistry::contains(&snapshot, &request.name) {
            return Err(RegistrationError::DuplicateName {
                name: request.name.clone(),
            });
        }
        debug!("'{}': name checked against {} peer(s)", request.name, snapshot.len());

        let base = PeerRegistry::next_base_address(&snapshot)?;
        let address = allocate_after(&snapshot, &base)?;
        debug!("'{}': allocated {} after {}", request.name, address, base);

        let keypair = self.keys.generate()?;
        debug!("'{}': obtained public key {}", request.name, keypair.public_key);

        let document = ConfigDocument::load(&self.settings.config)?;
        if let Some(collision) =
            document.find_collision(&address.to_string(), &keypair.public_key, self.settings.collision_match)
        {
            info!(
                "Peer {} not added: {} {} already present in {:?} line {}",
                request.name,
                collision.field,
                collision.value,
                document.path(),
                collision.line
            );
            return Ok(RegistrationResult::Rejected {
                field: collision.field,
                value: collision.value,
                line: collision.line,
            });
        }
        debug!("'{}': no collision in {:?}", request.name, document.path());

        let record = PeerRecord::new(&request.name, keypair.public_key.trim(), address.to_string())
            .with_endpoint(request.endpoint.clone())
            .with_keepalive(request.persistent_keepalive);
        let section = render_section(&record)?;
        let peer = CommittedPeer {
            record,
            private_key: keypair.private_key,
        };
        match self.commit(&mut snapshot, &document, &section, &peer.record) {
            Ok(()) => {}
            Err(err @ RegistrationError::PartialCommit { .. }) => return Ok(failed_after_write(err, peer)),
            Err(err) => return Err(err),
        }
        info!("Peer {} added to the configuration at {}", peer.record.name, peer.record.allowed_ips);

        if let Err(e) = self.interface.apply_peer(&peer.record.public_key, &peer.record.allowed_ips) {
            let err = RegistrationError::InterfaceActivationFailed {
                name: peer.record.name.clone(),
                reason: e.to_string(),
            };
            return Ok(failed_after_write(err, peer));
        }

        Ok(RegistrationResult::Committed {
            record: peer.record,
            private_key: peer.private_key,
        })
    }

    /// Write the config, then the registry, bracketed by the pending marker
    fn commit(
        &self,
        snapshot: &mut RegistrySnapshot,
        document: &ConfigDocument,
        section: &str,
        record: &PeerRecord,
    ) -> Result<(), RegistrationError> {
        let journal = Journal::for_registry(snapshot.source());
        journal.stage(&PendingCommit::new(record, document.path(), snapshot.source()))?;

        if let Err(err) = document.write(&document.appended(section)) {
            if let Err(e) = journal.clear() {
                warn!("Failed to remove pending-commit marker {:?}: {}", journal.path(), e);
            }
            return Err(err);
        }

        snapshot.upsert(record.clone());
        if let Err(err) = self.registry.persist(snapshot) {
            return Err(RegistrationError::PartialCommit {
                name: record.name.clone(),
                detail: format!(
                    "{:?} has the new peer but the registry was not updated ({}); run recover",
                    document.path(),
                    err
                ),
            });
        }

        if let Err(e) = journal.clear() {
            warn!("Failed to remove pending-commit marker {:?}: {}", journal.path(), e);
        }
        Ok(())
    }

    fn ensure_no_pending_commit(&self) -> Result<(), RegistrationError> {
        let Some(journal) = Journal::find(&self.settings.registry) else {
            return Ok(());
        };
        let name = journal
            .read()?
            .map(|pending| pending.name)
            .unwrap_or_else(|| "<unknown>".to_string());
        Err(RegistrationError::PartialCommit {
            name,
            detail: format!("unresolved pending commit in {:?}; run recover", journal.path()),
        })
    }

    /// Resolve a pending commit left by an interrupted registration.
    ///
    /// If the config already holds the staged peer but the registry does not,
    /// the record is persisted. If the config never got it, the staged peer
    /// is dropped. The marker is removed in every case.
    pub fn recover(&self) -> Result<RecoveryOutcome, RegistrationError> {
        let Some(journal) = Journal::find(&self.settings.registry) else {
            info!("No pending commit found");
            return Ok(RecoveryOutcome::Clean);
        };
        let Some(pending) = journal.read()? else {
            return Ok(RecoveryOutcome::Clean);
        };
        let record = pending.peer();

        let document = ConfigDocument::load(&self.settings.config)?;
        let mut snapshot = self.registry.load()?;
        let outcome = match (document.contains_public_key(&record.public_key), snapshot.contains(&record.name)) {
            (true, false) => {
                snapshot.upsert(record.clone());
                self.registry.persist(&snapshot)?;
                info!("Resumed commit of peer {}: registry updated", record.name);
                RecoveryOutcome::Resumed { name: record.name }
            }
            (true, true) => {
                info!("Peer {} was fully committed; clearing stale marker", record.name);
                RecoveryOutcome::AlreadyCommitted { name: record.name }
            }
            (false, _) => {
                info!("Peer {} never reached {:?}; discarding staged commit", record.name, document.path());
                RecoveryOutcome::Discarded { name: record.name }
            }
        };

        journal.clear().map_err(|e| RegistrationError::WriteFailed {
            path: journal.path().to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(outcome)
    }

    /// Append every registry peer missing from the config.
    ///
    /// Records are checked in registry order against the config as it grows,
    /// so a record colliding with one appended earlier in the same run is
    /// skipped too. The registry is not modified; the config is written once,
    /// and only if something was appended.
    pub fn sync_config(&self) -> Result<Vec<SyncEntry>, RegistrationError> {
        self.ensure_no_pending_commit()?;
        let snapshot = self.registry.load()?;
        let document = ConfigDocument::load(&self.settings.config)?;

        let mut text = document.text().to_string();
        let mut entries = Vec::with_capacity(snapshot.len());
        for record in snapshot.records() {
            let status = match find_collision(&text, &record.allowed_ips, &record.public_key, self.settings.collision_match) {
                Some(collision) => SyncStatus::Collided {
                    field: collision.field,
                    value: collision.value,
                },
                None => match render_section(record) {
                    Ok(section) => {
                        text = append_section(&text, &section);
                        SyncStatus::Appended
                    }
                    Err(e) => SyncStatus::Incomplete { detail: e.to_string() },
                },
            };
            debug!("Sync '{}': {:?}", record.name, status);
            entries.push(SyncEntry {
                name: record.name.clone(),
                status,
            });
        }

        let appended = entries.iter().filter(|e| e.status == SyncStatus::Appended).count();
        if appended > 0 {
            document.write(&text)?;
        }
        info!("Synced registry into {:?}: {} peer(s) appended", document.path(), appended);
        Ok(entries)
    }

    /// All registered peers in registry order
    pub fn list(&self) -> Result<Vec<PeerRecord>, RegistrationError> {
        Ok(self.registry.load()?.records().to_vec())
    }
}

/// Failure once the peer is already in the config file; the keypair is handed back
fn failed_after_write(err: RegistrationError, peer: CommittedPeer) -> RegistrationResult {
    error!("Registration of '{}' needs attention: {}", peer.record.name, err);
    RegistrationResult::Failed {
        kind: err.kind(),
        detail: err.to_string(),
        committed: Some(peer),
    }
}

/// Next address after `base` that no registry record holds yet
fn allocate_after(snapshot: &RegistrySnapshot, base: &AddressBlock) -> Result<AddressBlock, RegistrationError> {
    let mut candidate = next_address(base)?;
    while snapshot.is_address_assigned(&candidate) {
        debug!("{} is already assigned, skipping", candidate);
        candidate = next_address(&candidate)?;
    }
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{InterfaceError, KeyGenError, Keypair};
    use crate::utils::PathPair;
    use std::cell::Cell;
    use std::fs;
    use tempfile::TempDir;

    struct CountingKeys(Cell<u32>);

    impl KeyGenerator for CountingKeys {
        fn generate(&self) -> Result<Keypair, KeyGenError> {
            let n = self.0.get() + 1;
            self.0.set(n);
            Ok(Keypair {
                private_key: format!("priv{}", n),
                public_key: format!("pub{}=", n),
            })
        }
    }

    struct BrokenInterface;

    impl InterfaceControl for BrokenInterface {
        fn apply_peer(&self, _public_key: &str, _allowed_ips: &str) -> Result<(), InterfaceError> {
            Err(InterfaceError::Exit {
                command: "wg set".to_string(),
                reason: "exited with exit status: 1".to_string(),
            })
        }
    }

    fn setup(registry: &str) -> (TempDir, Settings) {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("wg0.conf");
        let peers = dir.path().join("peers.list.json");
        fs::write(&config, "[Interface]\nAddress = 10.0.0.1/24\n").unwrap();
        fs::write(&peers, registry).unwrap();
        let settings = Settings {
            config: PathPair::single(config),
            registry: PathPair::single(peers),
            ..Settings::default()
        };
        (dir, settings)
    }

    #[test]
    fn test_allocation_skips_assigned_addresses() {
        let registry = r#"{
  "server": {"PublicKey": "S=", "AllowedIPs": "10.0.0.1/24"},
  "manual": {"PublicKey": "M=", "AllowedIPs": "10.0.0.3/24"},
  "last": {"PublicKey": "L=", "AllowedIPs": "10.0.0.2/24"}
}"#;
        let (_dir, settings) = setup(registry);
        let registrar = PeerRegistrar::new(settings, Box::new(CountingKeys(Cell::new(0))), Box::new(NoInterface));

        match registrar.register_peer("alice") {
            RegistrationResult::Committed { record, .. } => assert_eq!(record.allowed_ips, "10.0.0.4/24"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_interface_failure_keeps_files() {
        let (_dir, settings) = setup(r#"{"server": {"PublicKey": "S=", "AllowedIPs": "10.0.0.1/24"}}"#);
        let registrar = PeerRegistrar::new(settings.clone(), Box::new(CountingKeys(Cell::new(0))), Box::new(BrokenInterface));

        let result = registrar.register_peer("alice");
        match &result {
            RegistrationResult::Failed {
                kind: FailureKind::InterfaceActivationFailed,
                committed: Some(peer),
                ..
            } => {
                assert_eq!(peer.private_key, "priv1");
                assert_eq!(peer.record.allowed_ips, "10.0.0.2/24");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(result.private_key(), Some("priv1"));
        let config = fs::read_to_string(&settings.config.primary).unwrap();
        assert!(config.contains("# alice\n[Peer]\nPublicKey = pub1=\nAllowedIPs = 10.0.0.2/24\n"));
        assert!(registrar.list().unwrap().iter().any(|r| r.name == "alice"));
        assert!(Journal::find(&settings.registry).is_none());
    }

    #[test]
    fn test_config_write_failure_leaves_registry_and_marker_clean() {
        let registry = r#"{"server": {"PublicKey": "S=", "AllowedIPs": "10.0.0.1/24"}}"#;
        let (dir, settings) = setup(registry);
        let registrar = PeerRegistrar::new(settings.clone(), Box::new(CountingKeys(Cell::new(0))), Box::new(NoInterface));

        // Renaming a file over a directory fails even for root
        let target = dir.path().join("wg0.conf.d");
        fs::create_dir(&target).unwrap();
        let document = ConfigDocument::new(&target, "[Interface]\nAddress = 10.0.0.1/24\n");

        let mut snapshot = registrar.registry().load().unwrap();
        let record = PeerRecord::new("alice", "pub1=", "10.0.0.2/24");
        let section = render_section(&record).unwrap();
        let err = registrar.commit(&mut snapshot, &document, &section, &record).unwrap_err();

        assert_eq!(err.kind(), FailureKind::ConfigWriteFailed);
        assert!(Journal::find(&settings.registry).is_none());
        assert_eq!(fs::read_to_string(&settings.registry.primary).unwrap(), registry);
        assert!(target.is_dir());

        let result = RegistrationResult::from(err);
        assert!(matches!(result, RegistrationResult::Failed { committed: None, .. }));
        assert_eq!(result.private_key(), None);
    }

    #[test]
    fn test_invalid_name_is_rejected_before_io() {
        let (_dir, settings) = setup("{ broken");
        let registrar = PeerRegistrar::new(settings, Box::new(CountingKeys(Cell::new(0))), Box::new(NoInterface));
        let result = registrar.register_peer("two\nlines");
        assert!(matches!(result, RegistrationResult::Failed { kind: FailureKind::InvalidName, .. }));
    }

    #[test]
    fn test_result_display() {
        let rejected = RegistrationResult::Rejected {
            field: CollisionField::PublicKey,
            value: "K=".to_string(),
            line: 7,
        };
        assert_eq!(rejected.to_string(), "Peer not added: PublicKey K= already exists (config line 7)");
    }
}
