//! Shared utilities: path resolution, atomic writes, validation.

pub mod fs;
pub mod paths;
pub mod validation;

pub use fs::write_atomic;
pub use paths::PathPair;
pub use validation::{find_registry_conflicts, validate_peer_name};
