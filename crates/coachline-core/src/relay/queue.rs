//! Dispatch queue: the single ordered hand-off from ingress readers to the
//! dispatcher.
//!
//! Backed by an unbounded tokio `mpsc` channel, which is FIFO across all
//! producers. Only ingress readers hold a [`DispatchSender`]; only the
//! dispatcher holds the [`DispatchReceiver`].

use coachline_types::message::Message;
use thiserror::Error;
use tokio::sync::mpsc;

/// The dispatcher is gone and the queue no longer accepts messages.
#[derive(Debug, Error)]
#[error("dispatch queue is closed")]
pub struct QueueClosed;

/// Create a connected sender/receiver pair.
pub fn dispatch_queue() -> (DispatchSender, DispatchReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (DispatchSender { tx }, DispatchReceiver { rx })
}

/// Producer half, cloned into every ingress reader.
#[derive(Debug, Clone)]
pub struct DispatchSender {
    tx: mpsc::UnboundedSender<Message>,
}

impl DispatchSender {
    /// Enqueue a message. Never waits: the queue is unbounded, so there is
    /// no overflow policy to apply.
    pub fn push(&self, message: Message) -> Result<(), QueueClosed> {
        self.tx.send(message).map_err(|_| QueueClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half, owned by the dispatcher.
#[derive(Debug)]
pub struct DispatchReceiver {
    rx: mpsc::UnboundedReceiver<Message>,
}

impl DispatchReceiver {
    /// Wait for the next message. `None` once every sender has been dropped
    /// and the queue is drained.
    pub async fn next(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    /// Number of messages waiting.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
