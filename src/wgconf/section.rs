//! Peer section rendering and appending.

use crate::error::RegistrationError;
use crate::registry::PeerRecord;

/// Render the `[Peer]` stanza for a record.
///
/// ```text
/// # <name>
/// [Peer]
/// PublicKey = <key>
/// Endpoint = <endpoint>            (only when set)
/// AllowedIPs = <address>
/// PersistentKeepalive = <seconds>  (only when set)
/// ```
///
/// The result ends with exactly one newline.
pub fn render_section(record: &PeerRecord) -> Result<String, RegistrationError> {
    let public_key = record.public_key.trim();
    if public_key.is_empty() {
        return Err(RegistrationError::IncompletePeer {
            name: record.name.clone(),
            field: "PublicKey",
        });
    }
    let allowed_ips = record.allowed_ips.trim();
    if allowed_ips.is_empty() {
        return Err(RegistrationError::IncompletePeer {
            name: record.name.clone(),
            field: "AllowedIPs",
        });
    }

    let mut lines = vec![format!("# {}", record.name), "[Peer]".to_string()];
    lines.push(format!("PublicKey = {}", public_key));
    if let Some(endpoint) = record.endpoint.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
        lines.push(format!("Endpoint = {}", endpoint));
    }
    lines.push(format!("AllowedIPs = {}", allowed_ips));
    if let Some(keepalive) = record.persistent_keepalive {
        lines.push(format!("PersistentKeepalive = {}", keepalive));
    }

    let mut section = lines.join("\n");
    section.push('\n');
    Ok(section)
}

/// Append a rendered section to the config text.
///
/// Trailing whitespace of `text` is dropped and exactly one blank line
/// separates it from the section. Content before that point is kept
/// byte-for-byte. An empty config becomes just the section.
pub fn append_section(text: &str, section: &str) -> String {
    let head = text.trim_end();
    if head.is_empty() {
        return section.to_string();
    }
    let mut out = String::with_capacity(head.len() + 2 + section.len());
    out.push_str(head);
    out.push_str("\n\n");
    out.push_str(section);
    out
}
