//! Connection handles.
//!
//! A [`ConnHandle`] is the send/close capability the rest of the server
//! holds for one accepted connection. Frames pushed into it are forwarded
//! to the WebSocket sink by a per-connection writer task, so no component
//! ever awaits on the network while holding relay state.

use signal_types::ServerMessage;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier for one accepted connection.
///
/// Used to tell a superseded connection's disconnect apart from the
/// current registration when the same peer id re-registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(u64);

impl ConnId {
    /// Allocate the next connection id.
    pub fn next() -> Self {
        Self(NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Items the writer task consumes for one connection.
#[derive(Debug)]
pub enum Outbound {
    /// Serialize and send a frame.
    Frame(ServerMessage),
    /// Close the WebSocket and stop the writer.
    Shutdown,
}

/// Send/close capability for one connection.
///
/// Cloneable; all clones feed the same writer task. Once the writer stops
/// (socket closed, peer gone, or [`close`](ConnHandle::close) requested)
/// every subsequent send fails silently and [`is_open`](ConnHandle::is_open)
/// reports `false`.
#[derive(Debug, Clone)]
pub struct ConnHandle {
    id: ConnId,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ConnHandle {
    /// Create a handle plus the receiving end for a writer task.
    pub fn open() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: ConnId::next(),
                tx,
            },
            rx,
        )
    }

    /// The connection id this handle belongs to.
    pub fn conn_id(&self) -> ConnId {
        self.id
    }

    /// Queue a frame for delivery. Fire-and-forget: returns `false` when
    /// the connection is already closed, never blocks, never errors into
    /// the caller.
    pub fn send(&self, frame: ServerMessage) -> bool {
        self.tx.send(Outbound::Frame(frame)).is_ok()
    }

    /// Ask the writer task to close the WebSocket.
    pub fn close(&self) {
        let _ = self.tx.send(Outbound::Shutdown);
    }

    /// Whether the writer task is still accepting frames.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}
