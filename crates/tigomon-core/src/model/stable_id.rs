// ── Identity types ──
//
// StableId and GroupId are the keys of every snapshot map. A StableId is
// derived purely from the gateway's device key and never regenerated.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── StableId ────────────────────────────────────────────────────────

/// Consumer-facing identifier for one optimizer.
///
/// MAC-shaped keys normalize to `mac-<lowercase hex>` regardless of
/// separators or case; anything else becomes `key-<trimmed key>`. The two
/// prefixes keep the namespaces disjoint, so distinct canonical keys never
/// collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StableId(String);

impl StableId {
    pub fn from_device_key(key: &str) -> Self {
        match canonical_mac(key) {
            Some(hex) => Self(format!("mac-{hex}")),
            None => Self(format!("key-{}", key.trim())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` if derived from a hardware address.
    pub fn is_mac(&self) -> bool {
        self.0.starts_with("mac-")
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercase hex digits of a 48- or 64-bit hardware address, if `key` is one.
fn canonical_mac(key: &str) -> Option<String> {
    let hex: String = key
        .trim()
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '.' | ' '))
        .collect();
    let valid = matches!(hex.len(), 12 | 16) && hex.chars().all(|c| c.is_ascii_hexdigit());
    valid.then(|| hex.to_ascii_lowercase())
}

// ── GroupId ─────────────────────────────────────────────────────────

/// Name of a string of panels, as reported (or implied) by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for GroupId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn mac_keys_normalize_separators_and_case() {
        let bare = StableId::from_device_key("04C05B300001");
        let colons = StableId::from_device_key("04:c0:5b:30:00:01");
        let dashes = StableId::from_device_key(" 04-C0-5B-30-00-01 ");
        assert_eq!(bare.as_str(), "mac-04c05b300001");
        assert_eq!(bare, colons);
        assert_eq!(bare, dashes);
        assert!(bare.is_mac());
    }

    #[test]
    fn sixty_four_bit_addresses_are_macs() {
        let id = StableId::from_device_key("04C0:5B30:0000:0001");
        assert_eq!(id.as_str(), "mac-04c05b3000000001");
    }

    #[test]
    fn labels_get_key_prefix() {
        let id = StableId::from_device_key("A12");
        assert_eq!(id.as_str(), "key-A12");
        assert!(!id.is_mac());
    }

    #[test]
    fn hex_looking_label_of_wrong_length_is_not_a_mac() {
        assert_eq!(StableId::from_device_key("ABCDEF").as_str(), "key-ABCDEF");
    }

    #[test]
    fn deterministic_and_distinct_over_sample() {
        let keys = [
            "04C05B300001",
            "04C05B300002",
            "04C05B300003",
            "A1",
            "A2",
            "B1",
            "mac-04c05b300001",
        ];
        let first: Vec<StableId> = keys.iter().map(|k| StableId::from_device_key(k)).collect();
        let second: Vec<StableId> = keys.iter().map(|k| StableId::from_device_key(k)).collect();
        assert_eq!(first, second);

        let unique: HashSet<&StableId> = first.iter().collect();
        assert_eq!(unique.len(), keys.len());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = StableId::from_device_key("B7");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"key-B7\"");
    }
}
