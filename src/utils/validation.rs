//! Peer name and registry consistency checks.

use crate::ip::AddressBlock;
use crate::registry::PeerRecord;
use std::collections::HashMap;

/// Validate a caller-supplied peer name
///
/// The name becomes the `# <name>` comment above the peer section, so it
/// must be non-empty and must not contain line breaks or other control
/// characters.
///
/// # Examples
/// ```
/// use wgpeers::utils::validation::validate_peer_name;
///
/// assert!(validate_peer_name("alice-laptop").is_ok());
/// assert!(validate_peer_name("").is_err());
/// assert!(validate_peer_name("bob\n[Peer]").is_err());
/// ```
pub fn validate_peer_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("name cannot be empty".to_string());
    }
    if name.chars().any(char::is_control) {
        return Err("name cannot contain control characters or line breaks".to_string());
    }
    if name != name.trim() {
        return Err("name cannot start or end with whitespace".to_string());
    }
    Ok(())
}

/// Find records that break registry uniqueness.
///
/// The registry only ever grows through registration, which keeps public
/// keys and addresses unique; anything reported here came from an edit made
/// outside this tool. Addresses are compared by IP, ignoring the mask.
pub fn find_registry_conflicts(records: &[PeerRecord]) -> Vec<String> {
    let mut problems = Vec::new();
    let mut keys: HashMap<&str, &str> = HashMap::new();
    let mut addresses: HashMap<std::net::Ipv4Addr, &str> = HashMap::new();

    for record in records {
        let key = record.public_key.trim();
        if !key.is_empty() {
            if let Some(owner) = keys.insert(key, &record.name) {
                problems.push(format!(
                    "public key {} is shared by peers '{}' and '{}'",
                    key, owner, record.name
                ));
            }
        }

        match record.allowed_ips.parse::<AddressBlock>() {
            Ok(block) => {
                if let Some(owner) = addresses.insert(block.addr(), &record.name) {
                    problems.push(format!(
                        "address {} is shared by peers '{}' and '{}'",
                        block.addr(),
                        owner,
                        record.name
                    ));
                }
            }
            Err(e) => problems.push(format!("peer '{}': {}", record.name, e)),
        }
    }

    problems
}
