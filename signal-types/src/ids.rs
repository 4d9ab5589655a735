//! Identity types for the Orion signaling protocol.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque, client-chosen peer identifier.
///
/// Peers pick their own ids (typically a fingerprint of their public key);
/// global uniqueness is assumed by convention and never enforced by the
/// relay. A re-registration under an existing id simply replaces the old
/// record.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Create a PeerId from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A truncated form for log lines, never longer than 8 characters.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PeerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({}…)", self.short())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_id_display_is_full() {
        let id = PeerId::new("a-fairly-long-peer-identifier");
        assert_eq!(id.to_string(), "a-fairly-long-peer-identifier");
    }

    #[test]
    fn peer_id_short_truncates() {
        let id = PeerId::new("0123456789abcdef");
        assert_eq!(id.short(), "01234567");
    }

    #[test]
    fn peer_id_short_handles_small_ids() {
        let id = PeerId::new("ab");
        assert_eq!(id.short(), "ab");
    }

    #[test]
    fn peer_id_short_respects_utf8() {
        let id = PeerId::new("日本語デバイス識別子");
        assert_eq!(id.short(), "日本語デバイス識");
    }

    #[test]
    fn peer_id_serde_is_transparent() {
        let id = PeerId::new("peer-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"peer-1\"");

        let restored: PeerId = serde_json::from_str("\"peer-1\"").unwrap();
        assert_eq!(restored, id);
    }

    #[test]
    fn peer_id_debug_truncates() {
        let id = PeerId::new("0123456789abcdef");
        assert_eq!(format!("{:?}", id), "PeerId(01234567…)");
    }
}
