//! WebSocket endpoint for the live relay.
//!
//! `/ws` upgrades an authenticated HTTP request into a relay connection.
//! Each connection runs two halves:
//!
//! - **Reader:** the core [`IngressReader`](coachline_core::relay::ingress::IngressReader)
//!   decodes inbound frames and pushes them onto the dispatch queue.
//! - **Writer:** a spawned task drains the connection's outbound channel and
//!   writes chat and ack frames as JSON text.
//!
//! When the reader stops (close, bad frame, transport error) the writer is
//! told to close the socket. When the writer stops first (kicked by a newer
//! login of the same user) the client's close ends the reader.

use std::fmt::Display;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use coachline_core::relay::ingress::InboundFrame;
use coachline_core::relay::registry::Outbound;
use coachline_core::relay::{Relay, RelayConnection};
use coachline_types::user::Identity;
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::http::error::AppError;
use crate::http::extractors::auth::CurrentUser;
use crate::state::AppState;

/// GET /ws - Upgrade to a relay connection bound to the session's user.
pub async fn relay_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let identity = user.session.identity;
    state.relay.admit(&identity)?;
    let relay = state.relay.clone();

    Ok(ws.on_upgrade(move |socket| run_connection(socket, relay, identity)))
}

/// Runs only once the upgrade has completed, so a handshake that never
/// finishes neither registers a connection nor kicks an earlier session.
async fn run_connection(socket: WebSocket, relay: Relay, identity: Identity) {
    let connection = match relay.connect(identity) {
        Ok(connection) => connection,
        Err(err) => {
            tracing::warn!(error = %err, "refusing upgraded connection");
            return;
        }
    };
    let reader = relay.reader(&connection);
    let RelayConnection {
        identity,
        handle,
        outbound,
    } = connection;

    let (ws_sender, ws_receiver) = socket.split();
    let writer = tokio::spawn(write_outbound(ws_sender, outbound));

    let exit = reader
        .run(ws_receiver.map(|result| result.map(inbound_frame)))
        .await;
    tracing::debug!(%identity, ?exit, "ingress reader finished");

    handle.close();
    drop(handle);

    if let Err(err) = writer.await {
        tracing::warn!(%identity, error = %err, "socket writer task failed");
    }
}

/// Drain `outbound` into `sink` until a close is requested, the channel
/// ends, or a write fails.
async fn write_outbound<Si>(mut sink: Si, mut outbound: UnboundedReceiver<Outbound>)
where
    Si: Sink<Message> + Unpin,
    Si::Error: Display,
{
    while let Some(item) = outbound.recv().await {
        let json = match &item {
            Outbound::Chat(frame) => serde_json::to_string(frame),
            Outbound::Ack(ack) => serde_json::to_string(ack),
            Outbound::Close => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
        };

        let text = match json {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize outbound frame");
                continue;
            }
        };

        if let Err(err) = sink.send(Message::Text(text.into())).await {
            tracing::warn!(error = %err, "socket write failed, stopping writer");
            break;
        }
    }
}

fn inbound_frame(message: Message) -> InboundFrame {
    match message {
        Message::Text(text) => InboundFrame::Text(text.as_str().to_owned()),
        Message::Binary(bytes) => InboundFrame::Binary(bytes.to_vec()),
        Message::Ping(_) | Message::Pong(_) => InboundFrame::Control,
        Message::Close(_) => InboundFrame::Close,
    }
}
