//! Registration error taxonomy.
//!
//! Validation failures (`MalformedAddress`, `InvalidHostOctet`, `InvalidName`,
//! `DuplicateName`, `IncompletePeer`) and read failures are raised before any
//! file is touched. `ConfigWriteFailed` means the config write itself failed
//! and neither file changed; `WriteFailed` covers the registry and the
//! pending-commit marker. `PartialCommit` is the only error that means the
//! config file and the registry disagree.

use crate::external::KeyGenError;
use crate::ip::AddressError;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Address(#[from] AddressError),

    #[error("Registry {path} holds no peers; seed it with a bootstrap peer to define the subnet")]
    EmptyRegistry { path: PathBuf },

    #[error("Peer '{name}' already exists in the registry")]
    DuplicateName { name: String },

    #[error("Invalid peer name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Registry {path} is unreadable: {reason}")]
    RegistryUnreadable { path: PathBuf, reason: String },

    #[error("Config {path} is unreadable: {reason}")]
    ConfigUnreadable { path: PathBuf, reason: String },

    #[error("Peer '{name}' cannot be rendered without {field}")]
    IncompletePeer { name: String, field: &'static str },

    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(#[from] KeyGenError),

    #[error("Failed to write config {path}, nothing was committed: {reason}")]
    ConfigWriteFailed { path: PathBuf, reason: String },

    #[error("Failed to write {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("Peer '{name}' is committed to both files but interface activation failed: {reason}")]
    InterfaceActivationFailed { name: String, reason: String },

    #[error("Partial commit of peer '{name}': {detail}")]
    PartialCommit { name: String, detail: String },
}

/// Error kind reported in a `Failed` registration outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    MalformedAddress,
    InvalidHostOctet,
    AllocationExhausted,
    EmptyRegistry,
    DuplicateName,
    InvalidName,
    RegistryUnreadable,
    ConfigUnreadable,
    IncompletePeer,
    KeyGenerationFailed,
    ConfigWriteFailed,
    WriteFailed,
    InterfaceActivationFailed,
    PartialCommit,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::MalformedAddress => "MalformedAddress",
            FailureKind::InvalidHostOctet => "InvalidHostOctet",
            FailureKind::AllocationExhausted => "AllocationExhausted",
            FailureKind::EmptyRegistry => "EmptyRegistry",
            FailureKind::DuplicateName => "DuplicateName",
            FailureKind::InvalidName => "InvalidName",
            FailureKind::RegistryUnreadable => "RegistryUnreadable",
            FailureKind::ConfigUnreadable => "ConfigUnreadable",
            FailureKind::IncompletePeer => "IncompletePeer",
            FailureKind::KeyGenerationFailed => "KeyGenerationFailed",
            FailureKind::ConfigWriteFailed => "ConfigWriteFailed",
            FailureKind::WriteFailed => "WriteFailed",
            FailureKind::InterfaceActivationFailed => "InterfaceActivationFailed",
            FailureKind::PartialCommit => "PartialCommit",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RegistrationError {
    pub fn kind(&self) -> FailureKind {
        match self {
            RegistrationError::Address(AddressError::MalformedAddress { .. }) => FailureKind::MalformedAddress,
            RegistrationError::Address(AddressError::InvalidHostOctet { .. }) => FailureKind::InvalidHostOctet,
            RegistrationError::Address(AddressError::AllocationExhausted { .. }) => FailureKind::AllocationExhausted,
            RegistrationError::EmptyRegistry { .. } => FailureKind::EmptyRegistry,
            RegistrationError::DuplicateName { .. } => FailureKind::DuplicateName,
            RegistrationError::InvalidName { .. } => FailureKind::InvalidName,
            RegistrationError::RegistryUnreadable { .. } => FailureKind::RegistryUnreadable,
            RegistrationError::ConfigUnreadable { .. } => FailureKind::ConfigUnreadable,
            RegistrationError::IncompletePeer { .. } => FailureKind::IncompletePeer,
            RegistrationError::KeyGenerationFailed(_) => FailureKind::KeyGenerationFailed,
            RegistrationError::ConfigWriteFailed { .. } => FailureKind::ConfigWriteFailed,
            RegistrationError::WriteFailed { .. } => FailureKind::WriteFailed,
            RegistrationError::InterfaceActivationFailed { .. } => FailureKind::InterfaceActivationFailed,
            RegistrationError::PartialCommit { .. } => FailureKind::PartialCommit,
        }
    }
}
