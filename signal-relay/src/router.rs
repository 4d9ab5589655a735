//! Relay router.
//!
//! Single entry point for every parsed inbound frame and for disconnect
//! events. Decides and executes the correct action against the registry
//! and the pending store: deliver, buffer, fan out, or refresh liveness.
//!
//! All sends are fire-and-forget; no handler ever reports failure back to
//! the sending peer.

use crate::conn::{ConnHandle, ConnId};
use crate::pending::PendingEnvelope;
use crate::registry::{PeerRecord, PeerRegistry};
use crate::server::{now_ms, SignalRelay};
use signal_types::{ClientMessage, PeerId, ServerMessage};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Routes inbound frames against the shared relay state.
#[derive(Clone)]
pub struct Router {
    relay: Arc<SignalRelay>,
}

impl Router {
    /// Create a router over the given relay state.
    pub fn new(relay: Arc<SignalRelay>) -> Self {
        Self { relay }
    }

    /// Handle one parsed inbound frame.
    ///
    /// `registered` is the session's registration slot: `register` fills
    /// it, everything else reads it. A connection that never registered
    /// may only `register` or `ping`; its other frames are dropped (we
    /// could not stamp a `from` id on them).
    pub async fn handle(
        &self,
        conn: &ConnHandle,
        registered: &mut Option<PeerId>,
        origin: &str,
        msg: ClientMessage,
    ) {
        match msg {
            ClientMessage::Register {
                peer_id,
                public_key,
            } => {
                self.handle_register(conn, registered, origin, peer_id, public_key)
                    .await;
            }
            ClientMessage::Relay { to, payload } => {
                let Some(from) = registered.clone() else {
                    self.drop_unregistered("relay");
                    return;
                };
                self.handle_relay(from, to, payload).await;
            }
            ClientMessage::Broadcast { payload } => {
                let Some(from) = registered.clone() else {
                    self.drop_unregistered("broadcast");
                    return;
                };
                let frame = ServerMessage::Broadcast {
                    from: from.clone(),
                    payload,
                    timestamp: now_ms(),
                };
                let state = self.relay.state().await;
                fan_out(&state.registry, Some(&from), &frame);
                drop(state);
                self.relay
                    .metrics()
                    .broadcasts_total
                    .fetch_add(1, Ordering::Relaxed);
            }
            ClientMessage::SyncRequest { last_sync } => {
                let Some(from) = registered.clone() else {
                    self.drop_unregistered("sync_request");
                    return;
                };
                let frame = ServerMessage::SyncRequest {
                    from: from.clone(),
                    last_sync,
                };
                let state = self.relay.state().await;
                fan_out(&state.registry, Some(&from), &frame);
                drop(state);
                self.relay
                    .metrics()
                    .broadcasts_total
                    .fetch_add(1, Ordering::Relaxed);
            }
            ClientMessage::SyncResponse { to, messages } => {
                let Some(from) = registered.clone() else {
                    self.drop_unregistered("sync_response");
                    return;
                };
                // Stale if the requester left: silent drop, no buffering.
                let state = self.relay.state().await;
                match state.registry.get(&to) {
                    Some(record) if record.conn.is_open() => {
                        record.conn.send(ServerMessage::SyncResponse { from, messages });
                    }
                    _ => {
                        tracing::debug!(to = %to.short(), "sync_response to absent peer dropped");
                    }
                }
            }
            ClientMessage::Ping => {
                conn.send(ServerMessage::Pong);
                if let Some(id) = registered {
                    let mut state = self.relay.state().await;
                    state.registry.touch(id, now_ms());
                }
            }
        }
    }

    async fn handle_register(
        &self,
        conn: &ConnHandle,
        registered: &mut Option<PeerId>,
        origin: &str,
        peer_id: PeerId,
        public_key: serde_json::Value,
    ) {
        let now = now_ms();
        let mut state = self.relay.state().await;

        let outcome = state.registry.register(
            peer_id.clone(),
            PeerRecord {
                public_key: public_key.clone(),
                conn: conn.clone(),
                origin: origin.to_string(),
                last_seen_ms: now,
            },
        );

        // The id was taken: the later connection wins and the replaced one
        // is closed so it cannot keep receiving fan-out traffic.
        if let Some(old) = outcome.superseded {
            tracing::info!(peer = %peer_id.short(), old_conn = %old.conn_id(), "registration superseded");
            old.close();
        }

        conn.send(ServerMessage::Peers {
            peers: outcome.others,
        });

        fan_out(
            &state.registry,
            Some(&peer_id),
            &ServerMessage::PeerJoined {
                peer_id: peer_id.clone(),
                public_key,
            },
        );

        // Deliver whatever queued up while this peer was away, in the
        // order it arrived.
        let pending = state.pending.drain(&peer_id);
        let delivered = pending.len();
        for envelope in pending {
            conn.send(envelope.frame);
        }

        let total = state.registry.len();
        drop(state);

        self.relay
            .metrics()
            .registrations_total
            .fetch_add(1, Ordering::Relaxed);

        if delivered > 0 {
            tracing::info!(peer = %peer_id.short(), delivered, "delivered pending messages");
        }
        tracing::info!(peer = %peer_id.short(), origin, total, "peer registered");

        *registered = Some(peer_id);
    }

    async fn handle_relay(&self, from: PeerId, to: PeerId, payload: serde_json::Value) {
        let now = now_ms();
        let frame = ServerMessage::Message {
            from,
            payload,
            timestamp: now,
        };

        let mut state = self.relay.state().await;
        // A failed send means the connection died under us: treat the
        // destination as offline and buffer, same as if it were absent.
        let sent = match state.registry.get(&to) {
            Some(record) => record.conn.send(frame.clone()),
            None => false,
        };

        if sent {
            drop(state);
            self.relay
                .metrics()
                .messages_relayed
                .fetch_add(1, Ordering::Relaxed);
        } else {
            state.pending.enqueue(
                to.clone(),
                PendingEnvelope {
                    frame,
                    created_at_ms: now,
                },
            );
            let queued = state.pending.queued_for(&to);
            drop(state);
            self.relay
                .metrics()
                .messages_buffered
                .fetch_add(1, Ordering::Relaxed);
            tracing::debug!(to = %to.short(), queued, "buffered message for offline peer");
        }
    }

    /// Handle the connection-closed event for a session.
    ///
    /// Removes the registration only if it still belongs to this
    /// connection; a superseded connection closing late leaves the newer
    /// registration untouched and announces nothing. `peer_left` goes out
    /// when the peer is genuinely gone — whether this removal did it or
    /// the sweeper already had.
    pub async fn handle_disconnect(&self, registered: Option<PeerId>, conn_id: ConnId) {
        let Some(id) = registered else {
            return;
        };

        let state = {
            let mut state = self.relay.state().await;
            let removed = state.registry.remove_if_conn(&id, conn_id);
            if !removed && state.registry.get(&id).is_some() {
                tracing::debug!(peer = %id.short(), conn = %conn_id, "superseded connection closed");
                return;
            }
            state
        };

        fan_out(
            &state.registry,
            None,
            &ServerMessage::PeerLeft {
                peer_id: id.clone(),
            },
        );
        tracing::info!(peer = %id.short(), remaining = state.registry.len(), "peer disconnected");
    }

    fn drop_unregistered(&self, kind: &str) {
        self.relay
            .metrics()
            .frames_dropped
            .fetch_add(1, Ordering::Relaxed);
        tracing::debug!(kind, "frame from unregistered connection dropped");
    }
}

/// Send a frame to every active peer except `exclude`.
///
/// Best-effort: iterates over a snapshot of the active set (never the live
/// map) and a failed send to one peer does not abort delivery to the rest.
/// Returns the number of successful sends.
pub fn fan_out(
    registry: &PeerRegistry,
    exclude: Option<&PeerId>,
    frame: &ServerMessage,
) -> usize {
    let targets = registry.active_conns(exclude);
    let mut sent = 0;
    for (peer_id, conn) in targets {
        if conn.send(frame.clone()) {
            sent += 1;
        } else {
            tracing::debug!(peer = %peer_id.short(), kind = frame.kind(), "fan-out send failed");
        }
    }
    sent
}
