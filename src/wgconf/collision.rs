//! Duplicate detection against the live server configuration.
//!
//! Only `PublicKey` and `AllowedIPs` lines are inspected; the rest of the
//! file is opaque. Values are normalized by splitting on commas, trimming
//! each entry and rejoining without whitespace, so `10.0.0.2/24, 10.9.0.0/16`
//! and `10.0.0.2/24,10.9.0.0/16` compare the same.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static KEYED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(allowedips|publickey)[^=]*=(.*)$").unwrap());

/// How a candidate value is compared with a normalized line value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// The candidate must equal one of the comma-separated entries
    #[default]
    Exact,
    /// The candidate may appear anywhere in the normalized value, so
    /// `10.0.0.1` also matches `10.0.0.11/24`
    Substring,
}

/// Which candidate value was found in the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionField {
    PublicKey,
    AllowedIPs,
}

impl CollisionField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollisionField::PublicKey => "PublicKey",
            CollisionField::AllowedIPs => "AllowedIPs",
        }
    }
}

impl fmt::Display for CollisionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First place a candidate address or key was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub field: CollisionField,
    /// The candidate value that matched
    pub value: String,
    /// 1-based line number in the scanned text
    pub line: usize,
}

/// Normalize a comma-separated value: entries trimmed, empties dropped,
/// joined with `,`.
///
/// # Examples
/// ```
/// use wgpeers::wgconf::collision::normalize_value;
///
/// assert_eq!(normalize_value(" 10.0.0.2/24 ,, 10.9.0.0/16 "), "10.0.0.2/24,10.9.0.0/16");
/// ```
pub fn normalize_value(value: &str) -> String {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

fn matches(mode: MatchMode, normalized: &str, candidate: &str) -> bool {
    if candidate.is_empty() {
        return false;
    }
    match mode {
        MatchMode::Exact => normalized.split(',').any(|entry| entry == candidate),
        MatchMode::Substring => normalized.contains(candidate),
    }
}

/// Scan `text` for the candidate address or public key.
///
/// Every `AllowedIPs` / `PublicKey` line (case-insensitive, leading
/// whitespace ignored) is checked; the value is everything after the first
/// `=`. On each line the address is tested before the key. Returns the
/// first hit, or `None` when the candidate is safe to append.
pub fn find_collision(text: &str, address: &str, public_key: &str, mode: MatchMode) -> Option<Collision> {
    let address = normalize_value(address);
    let public_key = public_key.trim();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let Some(caps) = KEYED_LINE.captures(line) else {
            continue;
        };
        let value = normalize_value(&caps[2]);

        let field = if matches(mode, &value, &address) {
            CollisionField::AllowedIPs
        } else if matches(mode, &value, public_key) {
            CollisionField::PublicKey
        } else {
            continue;
        };

        let collision = Collision {
            field,
            value: match field {
                CollisionField::AllowedIPs => address,
                CollisionField::PublicKey => public_key.to_string(),
            },
            line: index + 1,
        };
        log::debug!("Collision on line {}: {} {}", collision.line, collision.field, collision.value);
        return Some(collision);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = "\
[Interface]
Address = 10.0.0.1/24
PrivateKey = c2VydmVyLXByaXZhdGUta2V5LW5vdC1yZWFsLTAwMDA=
ListenPort = 51820

# alice
[Peer]
PublicKey = QWxpY2UtcHVibGljLWtleS1ub3QtcmVhbC0wMDAwMDA=
AllowedIPs = 10.0.0.2/24

# multi
[Peer]
publickey=TXVsdGktcHVibGljLWtleS1ub3QtcmVhbC0wMDAwMDA=
  allowedIPs =  10.0.0.3/24 , 192.168.50.0/24,10.0.0.11/24
";

    #[test]
    fn test_no_collision() {
        assert_eq!(find_collision(CONFIG, "10.0.0.4/24", "TmV3LWtleQ==", MatchMode::Exact), None);
    }

    #[test]
    fn test_public_key_collision_reports_field() {
        let hit = find_collision(
            CONFIG,
            "10.0.0.4/24",
            "QWxpY2UtcHVibGljLWtleS1ub3QtcmVhbC0wMDAwMDA=",
            MatchMode::Exact,
        )
        .unwrap();
        assert_eq!(hit.field, CollisionField::PublicKey);
        assert_eq!(hit.value, "QWxpY2UtcHVibGljLWtleS1ub3QtcmVhbC0wMDAwMDA=");
        assert_eq!(hit.line, 8);
    }

    #[test]
    fn test_address_collision_in_any_comma_position() {
        for address in ["10.0.0.3/24", "192.168.50.0/24", "10.0.0.11/24"] {
            let hit = find_collision(CONFIG, address, "TmV3LWtleQ==", MatchMode::Exact).unwrap();
            assert_eq!(hit.field, CollisionField::AllowedIPs);
            assert_eq!(hit.value, address);
            assert_eq!(hit.line, 14);
        }
    }

    #[test]
    fn test_key_in_comma_list() {
        let text = "PublicKey = AAA=, BBB= ,CCC=\n";
        let hit = find_collision(text, "10.0.0.9/24", "BBB=", MatchMode::Exact).unwrap();
        assert_eq!(hit.field, CollisionField::PublicKey);
    }

    #[test]
    fn test_address_checked_before_key() {
        let hit = find_collision(
            CONFIG,
            "10.0.0.2/24",
            "QWxpY2UtcHVibGljLWtleS1ub3QtcmVhbC0wMDAwMDA=",
            MatchMode::Exact,
        )
        .unwrap();
        assert_eq!(hit.line, 8);
        assert_eq!(hit.field, CollisionField::PublicKey);

        let hit = find_collision("AllowedIPs = 10.0.0.2/24, QQ==\n", "10.0.0.2/24", "QQ==", MatchMode::Exact).unwrap();
        assert_eq!(hit.field, CollisionField::AllowedIPs);
    }

    #[test]
    fn test_exact_mode_has_no_prefix_false_positive() {
        // 10.0.0.1 is a prefix of 10.0.0.11/24 on the multi peer
        assert_eq!(find_collision(CONFIG, "10.0.0.1", "TmV3LWtleQ==", MatchMode::Exact), None);
        let hit = find_collision(CONFIG, "10.0.0.1", "TmV3LWtleQ==", MatchMode::Substring).unwrap();
        assert_eq!(hit.field, CollisionField::AllowedIPs);
        assert_eq!(hit.line, 14);
    }

    #[test]
    fn test_other_lines_are_ignored() {
        // Interface address and private key lines never collide
        assert_eq!(find_collision(CONFIG, "10.0.0.1/24", "TmV3LWtleQ==", MatchMode::Substring), None);
        assert_eq!(
            find_collision(CONFIG, "10.0.0.5/24", "c2VydmVyLXByaXZhdGUta2V5LW5vdC1yZWFsLTAwMDA=", MatchMode::Exact),
            None
        );
    }

    #[test]
    fn test_empty_candidates_never_match() {
        assert_eq!(find_collision(CONFIG, "", "", MatchMode::Substring), None);
    }

    #[test]
    fn test_crlf_lines() {
        let text = "[Peer]\r\nPublicKey = AAA=\r\nAllowedIPs = 10.0.0.2/24\r\n";
        let hit = find_collision(text, "10.0.0.2/24", "ZZZ=", MatchMode::Exact).unwrap();
        assert_eq!(hit.line, 3);
    }
}
