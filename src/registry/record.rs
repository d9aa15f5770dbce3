//! Registry record for a single peer.

use serde::{Deserialize, Serialize};

/// Format of the `created` field, e.g. `01.03.2025, 12:05:31`
pub const CREATED_FORMAT: &str = "%d.%m.%Y, %H:%M:%S";

/// A registered peer.
///
/// The name is the key of the registry object rather than a field of the
/// record, so it is skipped during (de)serialization and filled in by the
/// registry. Fields this tool does not know about are kept in `extra` and
/// written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeerRecord {
    #[serde(skip)]
    pub name: String,

    #[serde(rename = "PublicKey", default)]
    pub public_key: String,

    #[serde(rename = "AllowedIPs", default)]
    pub allowed_ips: String,

    #[serde(rename = "Endpoint", default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(rename = "PersistentKeepalive", default, skip_serializing_if = "Option::is_none")]
    pub persistent_keepalive: Option<u32>,

    /// Informational registration timestamp
    #[serde(default)]
    pub created: String,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PeerRecord {
    /// Build a record for a freshly registered peer, stamped with the current local time
    pub fn new(
        name: impl Into<String>,
        public_key: impl Into<String>,
        allowed_ips: impl Into<String>,
    ) -> Self {
        PeerRecord {
            name: name.into(),
            public_key: public_key.into(),
            allowed_ips: allowed_ips.into(),
            created: chrono::Local::now().format(CREATED_FORMAT).to_string(),
            ..PeerRecord::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.endpoint = endpoint.filter(|e| !e.trim().is_empty());
        self
    }

    pub fn with_keepalive(mut self, keepalive: Option<u32>) -> Self {
        self.persistent_keepalive = keepalive;
        self
    }
}
