//! Ingress reader: one per live connection.
//!
//! Reads inbound frames, turns each into a [`Message`] bound to the
//! connection's identity, and pushes it onto the dispatch queue. Any decode
//! or transport failure ends the reader; on the way out it releases its
//! registry binding. Failures here stay local to this one connection.

use std::fmt::Display;
use std::sync::Arc;

use coachline_types::error::FrameError;
use coachline_types::message::{ChatFrame, Message};
use coachline_types::user::Identity;
use futures_util::{Stream, StreamExt};
use tracing::{debug, info, warn};

use super::queue::DispatchSender;
use super::registry::{ConnectionId, ConnectionRegistry};

/// Transport-neutral view of one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Text(String),
    Binary(Vec<u8>),
    /// Ping/pong and other protocol frames; ignored.
    Control,
    /// The peer asked to close.
    Close,
}

/// Why an ingress reader stopped.
#[derive(Debug)]
pub enum IngressExit {
    /// Close frame or end of stream.
    PeerClosed,
    /// The peer sent something that is not a valid chat frame.
    Decode(FrameError),
    /// The transport reported an error.
    Transport(String),
    /// The dispatcher is gone.
    QueueClosed,
}

/// Reader bound to one connection and one identity.
pub struct IngressReader {
    identity: Identity,
    connection: ConnectionId,
    queue: DispatchSender,
    registry: Arc<ConnectionRegistry>,
    max_content_bytes: usize,
}

impl IngressReader {
    pub fn new(
        identity: Identity,
        connection: ConnectionId,
        queue: DispatchSender,
        registry: Arc<ConnectionRegistry>,
        max_content_bytes: usize,
    ) -> Self {
        Self {
            identity,
            connection,
            queue,
            registry,
            max_content_bytes,
        }
    }

    /// Read until the connection ends, then release the registry binding.
    pub async fn run<St, E>(self, mut frames: St) -> IngressExit
    where
        St: Stream<Item = Result<InboundFrame, E>> + Unpin,
        E: Display,
    {
        let exit = loop {
            let frame = match frames.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(err)) => break IngressExit::Transport(err.to_string()),
                None => break IngressExit::PeerClosed,
            };

            let decoded = match frame {
                InboundFrame::Text(text) => ChatFrame::decode(&text),
                InboundFrame::Binary(bytes) => ChatFrame::decode_bytes(&bytes),
                InboundFrame::Control => continue,
                InboundFrame::Close => break IngressExit::PeerClosed,
            };

            let message = match decoded.and_then(|frame| {
                Message::from_frame(frame, self.identity.clone(), self.max_content_bytes)
            }) {
                Ok(message) => message,
                Err(err) => break IngressExit::Decode(err),
            };

            debug!(
                sender = %self.identity,
                receiver = %message.receiver(),
                "queued inbound message"
            );
            // Unbounded queue: push never waits.
            if self.queue.push(message).is_err() {
                break IngressExit::QueueClosed;
            }
        };

        self.registry.release(&self.identity, self.connection);

        match &exit {
            IngressExit::PeerClosed => {
                info!(identity = %self.identity, connection_id = %self.connection, "connection closed");
            }
            IngressExit::Decode(err) => {
                warn!(identity = %self.identity, connection_id = %self.connection, error = %err, "undecodable frame, closing connection");
            }
            IngressExit::Transport(err) => {
                warn!(identity = %self.identity, connection_id = %self.connection, error = %err, "read error, closing connection");
            }
            IngressExit::QueueClosed => {
                warn!(identity = %self.identity, connection_id = %self.connection, "dispatcher stopped, closing connection");
            }
        }

        exit
    }
}
