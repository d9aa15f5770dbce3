//! # Peer Registry Module
//!
//! This module owns the persistent peer registry: a JSON object mapping each
//! peer name to its record. The registry is the source of truth for which
//! names, public keys and tunnel addresses are already taken, and for the
//! address the next peer is allocated after.
//!
//! ## File Format
//!
//! ```json
//! {
//!   "server": {
//!     "PublicKey": "xTIBA5rboUvnH4htodjb6e697QjLERt1NAB4mZqp8Dg=",
//!     "AllowedIPs": "10.0.0.1/24",
//!     "created": "01.03.2025, 12:00:00"
//!   },
//!   "alice": {
//!     "PublicKey": "TrMvSoP4jYQlY6RIzBgbssQqY3vxI2Pi+y71lOWWXX0=",
//!     "AllowedIPs": "10.0.0.2/24",
//!     "Endpoint": "203.0.113.7:51820",
//!     "PersistentKeepalive": 25,
//!     "created": "01.03.2025, 12:05:31"
//!   }
//! }
//! ```
//!
//! Object order is significant: the last entry is the most recently
//! registered peer, and allocation continues from its address.
//!
//! ## Key Components
//!
//! - `record.rs`: the per-peer record and its JSON field names
//! - `peer_registry.rs`: loading, merging and persisting snapshots
//!
//! ## Writes
//!
//! A persist re-reads the file and merges the snapshot into it, so records
//! are only ever added or refreshed, never dropped. Writes replace the whole
//! file atomically.

pub mod peer_registry;
pub mod record;

pub use peer_registry::{PeerRegistry, RegistrySnapshot};
pub use record::PeerRecord;
