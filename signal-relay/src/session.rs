//! Connection acceptance and per-connection sessions.
//!
//! Each accepted TCP connection is upgraded to a WebSocket and split: a
//! writer task drains the connection's [`Outbound`] queue into the sink,
//! while the session's read loop parses inbound text frames and feeds
//! them to the [`Router`]. The session owns the registration slot; when
//! the read loop ends for any reason it reports the disconnect exactly
//! once.

use crate::conn::{ConnHandle, Outbound};
use crate::error::Result;
use crate::router::Router;
use crate::server::SignalRelay;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use signal_types::ClientMessage;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;

/// Accept connections on `listener` until the task is aborted.
///
/// Each connection runs in its own task; a failed handshake or a
/// misbehaving peer never affects the accept loop.
pub async fn serve(relay: Arc<SignalRelay>, listener: TcpListener) -> Result<()> {
    loop {
        let (stream, addr) = listener.accept().await?;
        relay
            .metrics()
            .connections_total
            .fetch_add(1, Ordering::Relaxed);
        tokio::spawn(handle_connection(relay.clone(), stream, addr));
    }
}

/// Run one connection from handshake to disconnect.
async fn handle_connection(relay: Arc<SignalRelay>, stream: TcpStream, addr: SocketAddr) {
    let ws_config = WebSocketConfig {
        max_message_size: Some(relay.config().limits.max_frame_bytes),
        max_frame_size: Some(relay.config().limits.max_frame_bytes),
        ..Default::default()
    };

    let ws = match tokio_tungstenite::accept_async_with_config(stream, Some(ws_config)).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::debug!(%addr, error = %e, "WebSocket handshake failed");
            return;
        }
    };
    tracing::debug!(%addr, "connection accepted");

    let (sink, mut inbound) = ws.split();
    let (conn, rx) = ConnHandle::open();
    let writer = tokio::spawn(write_loop(sink, rx));

    let router = Router::new(relay.clone());
    let origin = addr.to_string();
    let mut registered = None;

    while let Some(item) = inbound.next().await {
        // A superseded registration closes our writer; stop reading too.
        if !conn.is_open() {
            break;
        }

        // Some client libraries put JSON on the wire as binary frames;
        // treat those like text as long as they hold valid UTF-8.
        let text = match item {
            Ok(WsMessage::Text(text)) => text,
            Ok(WsMessage::Binary(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    relay
                        .metrics()
                        .frames_dropped
                        .fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(%addr, "dropping non-UTF-8 binary frame");
                    continue;
                }
            },
            Ok(WsMessage::Close(_)) => break,
            // Control frames; tungstenite answers pings itself.
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(%addr, error = %e, "connection error");
                break;
            }
        };

        match ClientMessage::from_json(&text) {
            Ok(msg) => {
                router.handle(&conn, &mut registered, &origin, msg).await;
            }
            Err(e) => {
                relay
                    .metrics()
                    .frames_dropped
                    .fetch_add(1, Ordering::Relaxed);
                tracing::debug!(%addr, error = %e, "dropping malformed frame");
            }
        }
    }

    router.handle_disconnect(registered, conn.conn_id()).await;
    conn.close();
    let _ = writer.await;
    tracing::debug!(%addr, "connection closed");
}

/// Drain one connection's outbound queue into its WebSocket sink.
///
/// Ends on [`Outbound::Shutdown`], on a failed write, or when every
/// [`ConnHandle`] clone is gone.
async fn write_loop(
    mut sink: SplitSink<WebSocketStream<TcpStream>, WsMessage>,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
) {
    while let Some(out) = rx.recv().await {
        match out {
            Outbound::Frame(frame) => match frame.to_json() {
                Ok(text) => {
                    if sink.send(WsMessage::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(kind = frame.kind(), error = %e, "failed to serialize frame");
                }
            },
            Outbound::Shutdown => {
                let _ = sink.send(WsMessage::Close(None)).await;
                break;
            }
        }
    }
}
