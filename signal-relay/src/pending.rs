//! Pending delivery store.
//!
//! Holds directed messages addressed to peers that were offline at send
//! time, keyed by destination id, in arrival order. Queues exist only
//! while non-empty: created lazily on the first undeliverable relay,
//! deleted when drained or pruned empty.

use signal_types::{PeerId, ServerMessage};
use std::collections::{HashMap, VecDeque};

/// A buffered frame awaiting its destination's return.
#[derive(Debug, Clone)]
pub struct PendingEnvelope {
    /// The frame to deliver, exactly as it would have gone out live.
    pub frame: ServerMessage,
    /// Unix-millisecond creation time, for TTL pruning.
    pub created_at_ms: u64,
}

/// FIFO queues of undelivered frames per destination peer.
#[derive(Debug, Default)]
pub struct PendingStore {
    queues: HashMap<PeerId, VecDeque<PendingEnvelope>>,
}

impl PendingStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an envelope to `to`'s queue, creating the queue if absent.
    pub fn enqueue(&mut self, to: PeerId, envelope: PendingEnvelope) {
        self.queues.entry(to).or_default().push_back(envelope);
    }

    /// Take every envelope queued for `to`, in insertion order, deleting
    /// the queue entry.
    pub fn drain(&mut self, to: &PeerId) -> Vec<PendingEnvelope> {
        self.queues
            .remove(to)
            .map(Vec::from)
            .unwrap_or_default()
    }

    /// Discard envelopes with `now - created_at >= ttl` from every queue
    /// and delete queues left empty. Returns the number discarded.
    ///
    /// Expiry is monotonic: a pruned envelope never becomes deliverable
    /// again.
    pub fn prune_expired(&mut self, now_ms: u64, ttl_ms: u64) -> usize {
        let mut discarded = 0;
        self.queues.retain(|_, queue| {
            let before = queue.len();
            queue.retain(|env| now_ms.saturating_sub(env.created_at_ms) < ttl_ms);
            discarded += before - queue.len();
            !queue.is_empty()
        });
        discarded
    }

    /// Number of envelopes queued for one destination.
    pub fn queued_for(&self, to: &PeerId) -> usize {
        self.queues.get(to).map_or(0, VecDeque::len)
    }

    /// Number of destinations with at least one queued envelope.
    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }

    /// Total queued envelopes across all destinations.
    pub fn envelope_count(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }
}
