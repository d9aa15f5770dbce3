//! IP address allocation logic.
//!
//! Allocation is a pure step function: given the most recently assigned
//! address block, compute the one after it. Host octets `0` and `255` are
//! network and broadcast addresses and are never produced or accepted as a
//! base. When the host octet runs out, allocation restarts at host `1` in the
//! next subnet, carrying leftward through the higher octets.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Errors produced while parsing or advancing an address block
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("Malformed address '{value}': {reason}")]
    MalformedAddress { value: String, reason: String },

    #[error("Address '{value}' has host octet {octet}, which is a network or broadcast address")]
    InvalidHostOctet { value: String, octet: u8 },

    #[error("No host addresses remain after '{value}'")]
    AllocationExhausted { value: String },
}

/// An IPv4 address together with the mask suffix it was written with,
/// e.g. `10.0.0.5/24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressBlock {
    addr: Ipv4Addr,
    mask: u8,
}

impl AddressBlock {
    pub fn new(addr: Ipv4Addr, mask: u8) -> Result<Self, AddressError> {
        if mask > 32 {
            return Err(AddressError::MalformedAddress {
                value: format!("{}/{}", addr, mask),
                reason: format!("mask {} is larger than 32", mask),
            });
        }
        Ok(AddressBlock { addr, mask })
    }

    pub fn addr(&self) -> Ipv4Addr {
        self.addr
    }

    pub fn mask(&self) -> u8 {
        self.mask
    }

    /// The last octet, which identifies the host inside the subnet
    pub fn host_octet(&self) -> u8 {
        self.addr.octets()[3]
    }
}

impl fmt::Display for AddressBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.mask)
    }
}

impl FromStr for AddressBlock {
    type Err = AddressError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: String| AddressError::MalformedAddress {
            value: value.to_string(),
            reason,
        };

        let trimmed = value.trim();
        let (ip, mask) = trimmed
            .split_once('/')
            .ok_or_else(|| malformed("missing '/<mask>' suffix".to_string()))?;

        let parts: Vec<&str> = ip.split('.').collect();
        if parts.len() != 4 {
            return Err(malformed(format!("expected 4 octets, found {}", parts.len())));
        }

        let mut octets = [0u8; 4];
        for (slot, part) in octets.iter_mut().zip(&parts) {
            *slot = parse_decimal(part)
                .filter(|n| *n <= 255)
                .map(|n| n as u8)
                .ok_or_else(|| malformed(format!("octet '{}' is not an integer in 0..=255", part)))?;
        }

        let mask = parse_decimal(mask)
            .filter(|n| *n <= 32)
            .map(|n| n as u8)
            .ok_or_else(|| malformed(format!("mask '{}' is not an integer in 0..=32", mask)))?;

        Ok(AddressBlock {
            addr: Ipv4Addr::from(octets),
            mask,
        })
    }
}

/// Parse an unsigned decimal without sign or whitespace
fn parse_decimal(s: &str) -> Option<u16> {
    if s.is_empty() || s.len() > 3 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Compute the address allocated after `previous`.
///
/// The host octet is incremented. Reaching `255` restarts the host at `1`
/// and carries into the octet to the left; an octet carried past `255`
/// restarts at `1` as well and carries further. A carry out of the first
/// octet means the address space is exhausted. The mask is kept as-is.
///
/// # Examples
/// ```
/// use wgpeers::ip::{next_address, AddressBlock};
///
/// let base: AddressBlock = "10.0.0.254/24".parse().unwrap();
/// assert_eq!(next_address(&base).unwrap().to_string(), "10.0.1.1/24");
/// ```
pub fn next_address(previous: &AddressBlock) -> Result<AddressBlock, AddressError> {
    let host = previous.host_octet();
    if host == 0 || host == 255 {
        return Err(AddressError::InvalidHostOctet {
            value: previous.to_string(),
            octet: host,
        });
    }

    let mut octets = previous.addr.octets();
    if host < 254 {
        octets[3] = host + 1;
    } else {
        octets[3] = 1;
        let mut carried = true;
        for octet in octets[..3].iter_mut().rev() {
            if *octet < 255 {
                *octet += 1;
                carried = false;
                break;
            }
            *octet = 1;
        }
        if carried {
            return Err(AddressError::AllocationExhausted {
                value: previous.to_string(),
            });
        }
    }

    Ok(AddressBlock {
        addr: Ipv4Addr::from(octets),
        mask: previous.mask,
    })
}
