//! Tunnel address handling.
//!
//! This module parses `a.b.c.d/m` address blocks as they appear in the
//! registry and in `AllowedIPs` lines, and computes the next host address
//! for a new peer.

pub mod allocator;

// Re-export commonly used types
pub use allocator::{next_address, AddressBlock, AddressError};
