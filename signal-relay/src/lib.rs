//! # signal-relay
//!
//! Rendezvous and relay server for Orion peers.
//!
//! This crate implements a signaling server that:
//! - Tracks which peers are currently reachable and under which public key
//! - Routes opaque payloads between peers (the relay is a "dumb pipe")
//! - Buffers directed messages for offline peers until they reconnect
//! - Evicts silent peers and expired buffered messages over time
//!
//! ## Architecture
//!
//! ```text
//! Peer A ──┐                      ┌── Peer B
//!          │   WebSocket (JSON)   │
//!          ├─────────────────────►│
//!          │                      │
//!      ┌───┴──────────────────────┴───┐
//!      │         signal-relay         │
//!      │  ┌─────────┐  ┌───────────┐  │
//!      │  │registry │  │  pending  │  │
//!      │  └─────────┘  └───────────┘  │
//!      └──────────────────────────────┘
//! ```
//!
//! ## Protocol
//!
//! One JSON object per WebSocket text frame, dispatched on `type`:
//! - `register` → `peers` snapshot, `peer_joined` fan-out, pending drain
//! - `relay` → `message` to the destination, buffered if offline
//! - `broadcast` / `sync_request` → fan-out to every other peer
//! - `sync_response` → direct delivery, dropped if the requester left
//! - `ping` → `pong` (and refreshes the sender's liveness)
//!
//! Nothing survives a restart; peers are expected to re-register.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod conn;
pub mod error;
pub mod pending;
pub mod registry;
pub mod router;
pub mod server;
pub mod session;
pub mod sweeper;
