//! # signal-types
//!
//! Wire format types for the Orion signaling protocol.
//!
//! This crate provides the types shared between the relay server and peers:
//! - [`PeerId`] - Opaque, client-chosen peer identifier
//! - [`ClientMessage`] - Frames a peer sends to the server
//! - [`ServerMessage`] - Frames the server sends to peers
//! - [`WireError`] - Frame encode/decode errors
//!
//! Every frame is a single JSON object with a mandatory `type` field.
//! Payloads and public keys are carried as opaque JSON values; the relay
//! never interprets them.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod messages;

pub use error::WireError;
pub use ids::PeerId;
pub use messages::{ClientMessage, PeerInfo, ServerMessage};
