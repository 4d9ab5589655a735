//! Protocol messages for the Orion signaling protocol.
//!
//! One JSON object per WebSocket frame, dispatched on the `type` field.
//! Tags are snake_case, field names camelCase, matching what peers put on
//! the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{PeerId, WireError};

/// Frames a peer sends to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Announce this connection as `peer_id` and publish a public key.
    Register {
        /// Self-chosen peer identifier.
        peer_id: PeerId,
        /// Public key material, opaque to the relay.
        public_key: Value,
    },
    /// Forward a payload to one specific peer, buffering if it is offline.
    Relay {
        /// Destination peer id.
        to: PeerId,
        /// Opaque payload.
        payload: Value,
    },
    /// Fan a payload out to every other registered peer. Never buffered.
    Broadcast {
        /// Opaque payload.
        payload: Value,
    },
    /// Ask every other peer to answer with messages newer than `last_sync`.
    SyncRequest {
        /// Unix-millisecond timestamp of the requester's last sync.
        #[serde(default)]
        last_sync: u64,
    },
    /// Answer a sync request. Dropped silently if the requester went away.
    SyncResponse {
        /// The peer that issued the sync request.
        to: PeerId,
        /// Opaque list of messages.
        messages: Value,
    },
    /// Liveness probe; the relay answers with `pong` and refreshes the
    /// sender's last-seen time.
    Ping,
}

/// Frames the relay sends to peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Snapshot of the other active peers, sent in response to `register`.
    Peers {
        /// Currently registered peers with open connections, excluding the
        /// recipient.
        peers: Vec<PeerInfo>,
    },
    /// A new peer registered.
    PeerJoined {
        /// The new peer's id.
        peer_id: PeerId,
        /// The new peer's public key, opaque.
        public_key: Value,
    },
    /// A peer disconnected or was evicted.
    PeerLeft {
        /// The departed peer's id.
        peer_id: PeerId,
    },
    /// A directed payload relayed from another peer.
    Message {
        /// Sending peer.
        from: PeerId,
        /// Opaque payload.
        payload: Value,
        /// Unix-millisecond creation time, stamped by the relay.
        timestamp: u64,
    },
    /// A payload fanned out from another peer.
    Broadcast {
        /// Sending peer.
        from: PeerId,
        /// Opaque payload.
        payload: Value,
        /// Unix-millisecond creation time, stamped by the relay.
        timestamp: u64,
    },
    /// Another peer is asking for messages newer than `last_sync`.
    SyncRequest {
        /// Requesting peer.
        from: PeerId,
        /// Unix-millisecond timestamp of the requester's last sync.
        last_sync: u64,
    },
    /// Another peer answered a sync request.
    SyncResponse {
        /// Responding peer.
        from: PeerId,
        /// Opaque list of messages.
        messages: Value,
    },
    /// Reply to `ping`.
    Pong,
}

/// A peer entry in the `peers` snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerInfo {
    /// The peer's id.
    pub peer_id: PeerId,
    /// The peer's public key, opaque.
    pub public_key: Value,
}

impl ClientMessage {
    /// Parse a frame from JSON text.
    pub fn from_json(text: &str) -> Result<Self, WireError> {
        serde_json::from_str(text).map_err(WireError::Malformed)
    }
}

impl ServerMessage {
    /// Serialize a frame to JSON text.
    pub fn to_json(&self) -> Result<String, WireError> {
        serde_json::to_string(self).map_err(WireError::Malformed)
    }

    /// Short tag name for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Peers { .. } => "peers",
            ServerMessage::PeerJoined { .. } => "peer_joined",
            ServerMessage::PeerLeft { .. } => "peer_left",
            ServerMessage::Message { .. } => "message",
            ServerMessage::Broadcast { .. } => "broadcast",
            ServerMessage::SyncRequest { .. } => "sync_request",
            ServerMessage::SyncResponse { .. } => "sync_response",
            ServerMessage::Pong => "pong",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn register_parses_wire_format() {
        let msg = ClientMessage::from_json(
            r#"{"type":"register","peerId":"abc123","publicKey":"ed25519:xyz"}"#,
        )
        .unwrap();

        assert_eq!(
            msg,
            ClientMessage::Register {
                peer_id: PeerId::new("abc123"),
                public_key: json!("ed25519:xyz"),
            }
        );
    }

    #[test]
    fn relay_parses_structured_payload() {
        let msg = ClientMessage::from_json(
            r#"{"type":"relay","to":"peer-b","payload":{"sdp":"offer","seq":1}}"#,
        )
        .unwrap();

        match msg {
            ClientMessage::Relay { to, payload } => {
                assert_eq!(to, PeerId::new("peer-b"));
                assert_eq!(payload["sdp"], "offer");
                assert_eq!(payload["seq"], 1);
            }
            other => panic!("expected relay, got {:?}", other),
        }
    }

    #[test]
    fn sync_request_last_sync_defaults_to_zero() {
        let msg = ClientMessage::from_json(r#"{"type":"sync_request"}"#).unwrap();
        assert_eq!(msg, ClientMessage::SyncRequest { last_sync: 0 });
    }

    #[test]
    fn ping_is_a_bare_tag() {
        let msg = ClientMessage::from_json(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Ping);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let result = ClientMessage::from_json(r#"{"type":"teleport","to":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn missing_type_is_rejected() {
        let result = ClientMessage::from_json(r#"{"to":"x","payload":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn unparseable_frame_is_rejected() {
        assert!(ClientMessage::from_json("not json at all").is_err());
        assert!(ClientMessage::from_json("").is_err());
    }

    #[test]
    fn message_serializes_with_camel_case_fields() {
        let frame = ServerMessage::Message {
            from: PeerId::new("peer-a"),
            payload: json!({"hello": true}),
            timestamp: 1_700_000_000_000,
        };

        let json: Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "message");
        assert_eq!(json["from"], "peer-a");
        assert_eq!(json["timestamp"], 1_700_000_000_000u64);
        assert_eq!(json["payload"]["hello"], true);
    }

    #[test]
    fn peers_snapshot_uses_peer_id_key() {
        let frame = ServerMessage::Peers {
            peers: vec![PeerInfo {
                peer_id: PeerId::new("peer-b"),
                public_key: json!("key-b"),
            }],
        };

        let json: Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "peers");
        assert_eq!(json["peers"][0]["peerId"], "peer-b");
        assert_eq!(json["peers"][0]["publicKey"], "key-b");
    }

    #[test]
    fn peer_joined_and_left_wire_format() {
        let joined = ServerMessage::PeerJoined {
            peer_id: PeerId::new("p1"),
            public_key: json!("k1"),
        };
        let json: Value = serde_json::from_str(&joined.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "peer_joined");
        assert_eq!(json["peerId"], "p1");

        let left = ServerMessage::PeerLeft {
            peer_id: PeerId::new("p1"),
        };
        let json: Value = serde_json::from_str(&left.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "peer_left");
        assert_eq!(json["peerId"], "p1");
    }

    #[test]
    fn sync_request_serializes_last_sync_camel_case() {
        let frame = ServerMessage::SyncRequest {
            from: PeerId::new("p1"),
            last_sync: 42,
        };
        let json: Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "sync_request");
        assert_eq!(json["lastSync"], 42);
    }

    #[test]
    fn pong_is_a_bare_tag() {
        assert_eq!(ServerMessage::Pong.to_json().unwrap(), r#"{"type":"pong"}"#);
    }

    #[test]
    fn kind_matches_wire_tag() {
        let frame = ServerMessage::PeerLeft {
            peer_id: PeerId::new("p1"),
        };
        let json: Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], frame.kind());
    }
}
