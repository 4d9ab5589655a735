//! Shared relay state.
//!
//! [`SignalRelay`] owns the peer registry and the pending delivery store
//! behind a single mutex. Every unit of work — one inbound message, one
//! disconnect, one sweep — locks it for its whole duration and never
//! awaits the network while holding it (sends go through non-blocking
//! [`crate::conn::ConnHandle`]s), so units run to completion relative to
//! each other.

use crate::config::Config;
use crate::pending::PendingStore;
use crate::registry::PeerRegistry;
use std::sync::atomic::AtomicU64;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, MutexGuard};

/// Operational metrics for monitoring relay activity.
///
/// All counters are monotonically increasing (reset only on restart).
/// Thread-safe via `AtomicU64` — no locks needed for incrementing.
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Total connections accepted.
    pub connections_total: AtomicU64,
    /// Total successful registrations (re-registrations included).
    pub registrations_total: AtomicU64,
    /// Total directed messages delivered to an online destination.
    pub messages_relayed: AtomicU64,
    /// Total directed messages buffered for an offline destination.
    pub messages_buffered: AtomicU64,
    /// Total broadcast/sync_request fan-outs performed.
    pub broadcasts_total: AtomicU64,
    /// Total inbound frames dropped (malformed, unknown, or unregistered).
    pub frames_dropped: AtomicU64,
    /// Total peers evicted by the liveness sweeper.
    pub peers_evicted: AtomicU64,
    /// Total buffered envelopes discarded past their TTL.
    pub envelopes_expired: AtomicU64,
}

/// The mutable core: registry plus pending store, guarded together.
#[derive(Debug, Default)]
pub struct RelayState {
    /// Who is reachable right now.
    pub registry: PeerRegistry,
    /// What is waiting for whom.
    pub pending: PendingStore,
}

/// Main relay server state.
pub struct SignalRelay {
    config: Config,
    state: Mutex<RelayState>,
    metrics: RelayMetrics,
}

impl std::fmt::Debug for SignalRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalRelay")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl SignalRelay {
    /// Create a relay with the given config and fresh, empty state.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: Mutex::new(RelayState::default()),
            metrics: RelayMetrics::default(),
        }
    }

    /// Get the relay configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    /// Lock the registry + pending store for one unit of work.
    pub async fn state(&self) -> MutexGuard<'_, RelayState> {
        self.state.lock().await
    }
}

/// Current wall-clock time in Unix milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn fresh_relay_has_empty_state() {
        let relay = SignalRelay::new(Config::default());
        let state = relay.state().await;
        assert!(state.registry.is_empty());
        assert_eq!(state.pending.envelope_count(), 0);
    }

    #[tokio::test]
    async fn metrics_start_at_zero() {
        let relay = SignalRelay::new(Config::default());
        assert_eq!(relay.metrics().registrations_total.load(Ordering::Relaxed), 0);
        assert_eq!(relay.metrics().messages_buffered.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn now_ms_is_plausible() {
        // After 2020-01-01 in milliseconds.
        assert!(now_ms() > 1_577_836_800_000);
    }
}
