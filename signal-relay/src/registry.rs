//! Peer registry.
//!
//! Authoritative mapping from peer id to its live connection handle and
//! metadata. This is a plain data structure; the single state mutex in
//! [`crate::server`] provides the mutual-exclusion boundary around it.

use crate::conn::{ConnHandle, ConnId};
use signal_types::{PeerId, PeerInfo};
use serde_json::Value;
use std::collections::HashMap;

/// A registered peer.
#[derive(Debug, Clone)]
pub struct PeerRecord {
    /// Public key material, opaque to the relay.
    pub public_key: Value,
    /// Send/close capability for the peer's connection.
    pub conn: ConnHandle,
    /// Remote address the peer connected from.
    pub origin: String,
    /// Last proof of liveness (register or ping), Unix milliseconds.
    pub last_seen_ms: u64,
}

/// Result of a registration.
#[derive(Debug)]
pub struct RegisterOutcome {
    /// The other currently-active peers, for the `peers` snapshot.
    pub others: Vec<PeerInfo>,
    /// Handle of the connection this registration replaced, if the id was
    /// already taken. The caller decides what to do with it.
    pub superseded: Option<ConnHandle>,
}

/// Authoritative peer-id → connection mapping.
///
/// Invariant: at most one record per peer id at any instant.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: HashMap<PeerId, PeerRecord>,
}

impl PeerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or unconditionally replace the record for `id`.
    ///
    /// Returns the active-peer snapshot (excluding `id`) and the replaced
    /// connection handle if a record already existed. Announcing the new
    /// peer to the others is the router's job, not ours.
    pub fn register(&mut self, id: PeerId, record: PeerRecord) -> RegisterOutcome {
        let others = self.list_active(Some(&id));
        let superseded = self.peers.insert(id, record).map(|old| old.conn);
        RegisterOutcome { others, superseded }
    }

    /// Look up a peer's record.
    pub fn get(&self, id: &PeerId) -> Option<&PeerRecord> {
        self.peers.get(id)
    }

    /// Refresh a peer's last-seen time. No-op if the id is not registered.
    pub fn touch(&mut self, id: &PeerId, now_ms: u64) {
        if let Some(record) = self.peers.get_mut(id) {
            record.last_seen_ms = now_ms;
        }
    }

    /// Delete a record if present. Does not close the connection; that is
    /// the caller's responsibility (avoids double-close).
    pub fn remove(&mut self, id: &PeerId) -> Option<PeerRecord> {
        self.peers.remove(id)
    }

    /// Delete a record only if it still belongs to `conn_id`.
    ///
    /// The disconnect path uses this so a superseded connection closing
    /// late cannot clobber the registration that replaced it.
    pub fn remove_if_conn(&mut self, id: &PeerId, conn_id: ConnId) -> bool {
        match self.peers.get(id) {
            Some(record) if record.conn.conn_id() == conn_id => {
                self.peers.remove(id);
                true
            }
            _ => false,
        }
    }

    /// Snapshot of peers whose connection is currently open, excluding
    /// `exclude` if given. Order is unspecified.
    pub fn list_active(&self, exclude: Option<&PeerId>) -> Vec<PeerInfo> {
        self.peers
            .iter()
            .filter(|(id, record)| Some(*id) != exclude && record.conn.is_open())
            .map(|(id, record)| PeerInfo {
                peer_id: id.clone(),
                public_key: record.public_key.clone(),
            })
            .collect()
    }

    /// Snapshot of open connection handles, excluding `exclude` if given.
    ///
    /// Fan-out iterates over this copy, never over the live map, so a
    /// disconnect landing mid-broadcast cannot invalidate the iteration.
    pub fn active_conns(&self, exclude: Option<&PeerId>) -> Vec<(PeerId, ConnHandle)> {
        self.peers
            .iter()
            .filter(|(id, record)| Some(*id) != exclude && record.conn.is_open())
            .map(|(id, record)| (id.clone(), record.conn.clone()))
            .collect()
    }

    /// Remove every peer silent for longer than `timeout_ms`.
    ///
    /// Returns the evicted (id, handle) pairs; closing the handles is the
    /// caller's job. Ids are snapshotted before removal.
    pub fn evict_stale(&mut self, now_ms: u64, timeout_ms: u64) -> Vec<(PeerId, ConnHandle)> {
        let stale: Vec<PeerId> = self
            .peers
            .iter()
            .filter(|(_, record)| now_ms.saturating_sub(record.last_seen_ms) > timeout_ms)
            .map(|(id, _)| id.clone())
            .collect();

        stale
            .into_iter()
            .filter_map(|id| self.remove(&id).map(|record| (id, record.conn)))
            .collect()
    }

    /// Number of registered peers (open or not).
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Whether the registry holds no records.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conn::Outbound;
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn record(conn: &ConnHandle, key: &str, last_seen_ms: u64) -> PeerRecord {
        PeerRecord {
            public_key: json!(key),
            conn: conn.clone(),
            origin: "127.0.0.1:9999".to_string(),
            last_seen_ms,
        }
    }

    fn open_conn() -> (ConnHandle, UnboundedReceiver<Outbound>) {
        ConnHandle::open()
    }

    #[tokio::test]
    async fn register_and_get() {
        let mut registry = PeerRegistry::new();
        let (conn, _rx) = open_conn();

        let outcome = registry.register(PeerId::new("a"), record(&conn, "key-a", 100));
        assert!(outcome.others.is_empty());
        assert!(outcome.superseded.is_none());

        let found = registry.get(&PeerId::new("a")).unwrap();
        assert_eq!(found.public_key, json!("key-a"));
        assert_eq!(found.last_seen_ms, 100);
    }

    #[tokio::test]
    async fn register_snapshot_excludes_self_and_closed() {
        let mut registry = PeerRegistry::new();
        let (conn_a, _rx_a) = open_conn();
        let (conn_b, rx_b) = open_conn();
        let (conn_c, _rx_c) = open_conn();

        registry.register(PeerId::new("a"), record(&conn_a, "key-a", 0));
        registry.register(PeerId::new("b"), record(&conn_b, "key-b", 0));
        drop(rx_b); // b's writer died

        let outcome = registry.register(PeerId::new("c"), record(&conn_c, "key-c", 0));
        assert_eq!(outcome.others.len(), 1);
        assert_eq!(outcome.others[0].peer_id, PeerId::new("a"));
    }

    #[tokio::test]
    async fn reregister_replaces_and_reports_superseded() {
        let mut registry = PeerRegistry::new();
        let (old_conn, _old_rx) = open_conn();
        let (new_conn, _new_rx) = open_conn();

        registry.register(PeerId::new("a"), record(&old_conn, "key-1", 0));
        let outcome = registry.register(PeerId::new("a"), record(&new_conn, "key-2", 0));

        let superseded = outcome.superseded.expect("old connection reported");
        assert_eq!(superseded.conn_id(), old_conn.conn_id());

        // Exactly one record; the later connection wins.
        assert_eq!(registry.len(), 1);
        let current = registry.get(&PeerId::new("a")).unwrap();
        assert_eq!(current.conn.conn_id(), new_conn.conn_id());
        assert_eq!(current.public_key, json!("key-2"));
    }

    #[tokio::test]
    async fn touch_updates_last_seen() {
        let mut registry = PeerRegistry::new();
        let (conn, _rx) = open_conn();
        registry.register(PeerId::new("a"), record(&conn, "k", 100));

        registry.touch(&PeerId::new("a"), 500);
        assert_eq!(registry.get(&PeerId::new("a")).unwrap().last_seen_ms, 500);

        // Touching an absent id is a no-op, not a panic.
        registry.touch(&PeerId::new("ghost"), 500);
    }

    #[tokio::test]
    async fn remove_if_conn_requires_matching_connection() {
        let mut registry = PeerRegistry::new();
        let (old_conn, _old_rx) = open_conn();
        let (new_conn, _new_rx) = open_conn();

        registry.register(PeerId::new("a"), record(&old_conn, "k", 0));
        registry.register(PeerId::new("a"), record(&new_conn, "k", 0));

        // The superseded connection's disconnect must not remove the
        // current registration.
        assert!(!registry.remove_if_conn(&PeerId::new("a"), old_conn.conn_id()));
        assert_eq!(registry.len(), 1);

        assert!(registry.remove_if_conn(&PeerId::new("a"), new_conn.conn_id()));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn evict_stale_removes_only_silent_peers() {
        let mut registry = PeerRegistry::new();
        let (conn_a, _rx_a) = open_conn();
        let (conn_b, _rx_b) = open_conn();

        registry.register(PeerId::new("idle"), record(&conn_a, "k", 1_000));
        registry.register(PeerId::new("fresh"), record(&conn_b, "k", 9_000));

        let evicted = registry.evict_stale(10_000, 5_000);
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].0, PeerId::new("idle"));

        assert!(registry.get(&PeerId::new("idle")).is_none());
        assert!(registry.get(&PeerId::new("fresh")).is_some());
    }

    #[tokio::test]
    async fn evict_stale_is_exclusive_at_the_boundary() {
        let mut registry = PeerRegistry::new();
        let (conn, _rx) = open_conn();
        registry.register(PeerId::new("a"), record(&conn, "k", 5_000));

        // Exactly timeout old: not yet evictable.
        assert!(registry.evict_stale(10_000, 5_000).is_empty());
        // One past: gone.
        assert_eq!(registry.evict_stale(10_001, 5_000).len(), 1);
    }

    #[tokio::test]
    async fn active_conns_snapshots_open_handles() {
        let mut registry = PeerRegistry::new();
        let (conn_a, _rx_a) = open_conn();
        let (conn_b, rx_b) = open_conn();

        registry.register(PeerId::new("a"), record(&conn_a, "k", 0));
        registry.register(PeerId::new("b"), record(&conn_b, "k", 0));
        drop(rx_b);

        let conns = registry.active_conns(None);
        assert_eq!(conns.len(), 1);
        assert_eq!(conns[0].0, PeerId::new("a"));

        assert!(registry.active_conns(Some(&PeerId::new("a"))).is_empty());
    }
}
