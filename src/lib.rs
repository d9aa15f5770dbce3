//! # wgpeers - WireGuard peer registration utility
//!
//! This library keeps a registry of WireGuard peer identities and mirrors it
//! into the server configuration file read by the tunnel daemon.
//!
//! ## Overview
//!
//! Given a peer name, a registration allocates the next tunnel address,
//! obtains a fresh keypair, checks the live configuration for an existing
//! peer with the same address or key, and appends a `[Peer]` section to the
//! configuration and a record to the registry. Neither file is touched
//! unless every check passes.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - `ip`: address parsing and next-address allocation
//! - `registry`: the persistent name → peer record mapping
//! - `wgconf`: collision scanning and section rendering for the server config
//! - `external`: key generation and interface control through `wg`
//! - `journal`: pending-commit marker spanning the two file writes
//! - `orchestrator`: the `PeerRegistrar` tying the steps together
//! - `settings` / `settings_loader`: paths and handles, loaded from YAML
//! - `utils`: path fallback, atomic writes, validation
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use wgpeers::orchestrator::{PeerRegistrar, RegistrationResult};
//! use wgpeers::settings::Settings;
//!
//! let registrar = PeerRegistrar::from_settings(Settings::default());
//! match registrar.register_peer("alice") {
//!     RegistrationResult::Committed { record, .. } => println!("alice -> {}", record.allowed_ips),
//!     RegistrationResult::Rejected { field, value, .. } => println!("{} {} already in use", field, value),
//!     RegistrationResult::Failed { kind, detail, .. } => eprintln!("{}: {}", kind, detail),
//! }
//! ```
//!
//! ## Files
//!
//! Each file has a system location and a working-directory fallback used
//! when the system location does not exist:
//!
//! ```text
//! /etc/wireguard/wg0.conf           ./wg0.conf           server configuration
//! /etc/wireguard/peers.list.json    ./peers.list.json    peer registry
//! /etc/wireguard/private.key        ./private.key        key material gate
//! ```
//!
//! The registry must already contain at least one peer (usually the server
//! itself); its address defines the subnet new peers are allocated from.
//!
//! ## Concurrency
//!
//! One registration runs at a time. The files are not locked, so callers
//! must serialize invocations themselves.
//!
//! ## Error Handling
//!
//! Library operations return typed errors (`thiserror`); a registration
//! always yields a structured `RegistrationResult`. The binary reports
//! through `color_eyre`.

pub mod error;
pub mod external;
pub mod ip;
pub mod journal;
pub mod orchestrator;
pub mod registry;
pub mod settings;
pub mod settings_loader;
pub mod utils;
pub mod wgconf;
