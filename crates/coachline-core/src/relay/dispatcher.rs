//! The dispatcher: sole consumer of the dispatch queue.
//!
//! For each message, in queue order:
//! 1. resolve sender and receiver names to user ids (unknown -> drop, no retry),
//! 2. append to the message store (failure is logged, delivery still runs),
//! 3. attempt live delivery through the configured [`DeliveryStep`].
//!
//! Each message is fully processed before the next is taken, so messages
//! from one sender are persisted and delivered in the order they were read.

use std::sync::Arc;

use coachline_types::message::{DeliveryOutcome, Message};
use coachline_types::user::{Identity, UserId};
use tracing::{debug, error, info, warn};

use super::delivery::DeliveryStep;
use super::queue::DispatchReceiver;
use super::registry::ConnectionRegistry;
use crate::repository::{IdentityDirectory, MessageStore};

/// What happened to one dispatched message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchReport {
    /// A name could not be resolved; nothing was stored or delivered.
    Dropped { unresolved: Identity },
    /// Storage and delivery were both attempted.
    Processed {
        persisted: bool,
        delivery: DeliveryOutcome,
    },
}

/// Persists and delivers messages taken off the dispatch queue.
pub struct Dispatcher<D: IdentityDirectory, S: MessageStore, L: DeliveryStep> {
    directory: D,
    store: S,
    delivery: L,
    registry: Arc<ConnectionRegistry>,
}

impl<D: IdentityDirectory, S: MessageStore, L: DeliveryStep> Dispatcher<D, S, L> {
    pub fn new(directory: D, store: S, delivery: L, registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            directory,
            store,
            delivery,
            registry,
        }
    }

    /// Drain the queue until every sender is gone.
    pub async fn run(self, mut queue: DispatchReceiver) {
        info!("dispatcher started");
        while let Some(message) = queue.next().await {
            self.dispatch(message).await;
        }
        info!("dispatch queue closed, dispatcher stopped");
    }

    /// Process a single message.
    pub async fn dispatch(&self, message: Message) -> DispatchReport {
        let Some(sender_id) = self.resolve(message.sender()).await else {
            return DispatchReport::Dropped {
                unresolved: message.sender().clone(),
            };
        };
        let Some(receiver_id) = self.resolve(message.receiver()).await else {
            return DispatchReport::Dropped {
                unresolved: message.receiver().clone(),
            };
        };

        let persisted = match self
            .store
            .append(&sender_id, &receiver_id, message.content())
            .await
        {
            Ok(stored) => {
                debug!(
                    message_id = %stored.id,
                    sender = %message.sender(),
                    receiver = %message.receiver(),
                    "message saved"
                );
                true
            }
            Err(err) => {
                error!(
                    sender = %message.sender(),
                    receiver = %message.receiver(),
                    error = %err,
                    "failed to save message"
                );
                false
            }
        };

        let delivery = self.delivery.deliver(&self.registry, &message);

        DispatchReport::Processed {
            persisted,
            delivery,
        }
    }

    async fn resolve(&self, identity: &Identity) -> Option<UserId> {
        match self.directory.lookup_identity(identity).await {
            Ok(Some(id)) => Some(id),
            Ok(None) => {
                warn!(%identity, "unknown user, dropping message");
                None
            }
            Err(err) => {
                warn!(%identity, error = %err, "user lookup failed, dropping message");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
