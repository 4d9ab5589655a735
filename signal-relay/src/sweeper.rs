//! Background liveness sweeper and stats reporter.
//!
//! The sweeper runs periodically: peers silent past the liveness timeout
//! are closed and deregistered, and buffered envelopes past their TTL are
//! discarded. The stats task logs a one-line summary of the relay's state
//! at a slower cadence.

use crate::config::{StatsConfig, SweeperConfig};
use crate::server::{now_ms, SignalRelay};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// What one sweep did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Peers deregistered for silence.
    pub evicted: usize,
    /// Buffered envelopes discarded past their TTL.
    pub expired: usize,
}

/// Run one sweep against `now_ms`.
///
/// Evicted peers have their connections closed here; the `peer_left`
/// announcement happens when the closed connection's session winds down
/// and reports its disconnect. Eviction and expiry run under one lock
/// acquisition, so a sweep is atomic relative to message handling.
pub async fn sweep(relay: &SignalRelay, now_ms: u64) -> SweepReport {
    let sweeper = &relay.config().sweeper;
    let timeout_ms = sweeper.liveness_timeout_secs * 1_000;
    let ttl_ms = sweeper.message_ttl_secs * 1_000;

    let mut state = relay.state().await;
    let evicted = state.registry.evict_stale(now_ms, timeout_ms);
    for (peer_id, conn) in &evicted {
        tracing::info!(peer = %peer_id.short(), "evicting silent peer");
        conn.close();
    }
    let expired = state.pending.prune_expired(now_ms, ttl_ms);
    drop(state);

    relay
        .metrics()
        .peers_evicted
        .fetch_add(evicted.len() as u64, Ordering::Relaxed);
    relay
        .metrics()
        .envelopes_expired
        .fetch_add(expired as u64, Ordering::Relaxed);

    SweepReport {
        evicted: evicted.len(),
        expired,
    }
}

/// Spawn the background sweeper task.
///
/// Returns a handle that can be used to abort the task.
pub fn spawn_sweeper_task(
    relay: Arc<SignalRelay>,
    config: SweeperConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if !config.enabled {
            tracing::info!("Sweeper task disabled");
            return;
        }

        tracing::info!(
            "Sweeper task started (interval: {}s, liveness timeout: {}s, message TTL: {}s)",
            config.interval_secs,
            config.liveness_timeout_secs,
            config.message_ttl_secs
        );

        let mut timer = interval(Duration::from_secs(config.interval_secs));
        // The first tick fires immediately; skip it so a fresh relay does
        // not sweep an empty state at startup.
        timer.tick().await;

        loop {
            timer.tick().await;

            let report = sweep(&relay, now_ms()).await;
            if report.evicted > 0 || report.expired > 0 {
                tracing::info!(
                    "Sweep: evicted {} silent peers, expired {} buffered messages",
                    report.evicted,
                    report.expired
                );
            } else {
                tracing::debug!("Sweep: nothing to do");
            }
        }
    })
}

/// Spawn the periodic stats task.
///
/// Returns a handle that can be used to abort the task.
pub fn spawn_stats_task(
    relay: Arc<SignalRelay>,
    config: StatsConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if !config.enabled {
            tracing::info!("Stats task disabled");
            return;
        }

        let mut timer = interval(Duration::from_secs(config.interval_secs));
        timer.tick().await;

        loop {
            timer.tick().await;

            let (peers, queues, envelopes) = {
                let state = relay.state().await;
                (
                    state.registry.len(),
                    state.pending.queue_count(),
                    state.pending.envelope_count(),
                )
            };
            let metrics = relay.metrics();
            tracing::info!(
                peers,
                queues,
                envelopes,
                relayed = metrics.messages_relayed.load(Ordering::Relaxed),
                buffered = metrics.messages_buffered.load(Ordering::Relaxed),
                evicted = metrics.peers_evicted.load(Ordering::Relaxed),
                "relay stats"
            );
        }
    })
}
