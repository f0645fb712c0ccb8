//! Live delivery step of the dispatcher.
//!
//! [`DirectDelivery`] writes a message to the receiver's registered
//! connection. [`AcknowledgingDelivery`] decorates any step and reports the
//! outcome back to the sender's connection.

use coachline_types::message::{AckFrame, DeliveryOutcome, Message};
use tracing::{debug, warn};

use super::registry::ConnectionRegistry;

/// One best-effort attempt to hand a message to its receiver.
///
/// Synchronous: writes only enqueue onto the connection's outbound channel.
pub trait DeliveryStep: Send + Sync {
    fn deliver(&self, registry: &ConnectionRegistry, message: &Message) -> DeliveryOutcome;
}

impl<L: DeliveryStep + ?Sized> DeliveryStep for Box<L> {
    fn deliver(&self, registry: &ConnectionRegistry, message: &Message) -> DeliveryOutcome {
        (**self).deliver(registry, message)
    }
}

/// Write to the receiver's live connection, if there is one.
///
/// A failed write means the connection is dead: it is released from the
/// registry so later messages see the receiver as offline.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectDelivery;

impl DeliveryStep for DirectDelivery {
    fn deliver(&self, registry: &ConnectionRegistry, message: &Message) -> DeliveryOutcome {
        let receiver = message.receiver();
        let Some(connection) = registry.lookup(receiver) else {
            debug!(%receiver, "receiver is not connected, skipping live delivery");
            return DeliveryOutcome::Offline;
        };

        match connection.send(message.to_frame()) {
            Ok(()) => {
                debug!(sender = %message.sender(), %receiver, "delivered message");
                DeliveryOutcome::Delivered
            }
            Err(err) => {
                registry.release(receiver, connection.id());
                warn!(
                    %receiver,
                    connection_id = %connection.id(),
                    error = %err,
                    "live delivery failed, dropping connection"
                );
                DeliveryOutcome::Failed
            }
        }
    }
}

/// Decorator that tells the sender what happened to each message.
///
/// After the inner step runs, an [`AckFrame`] is written to the sender's
/// connection. A sender who has already gone simply gets no ack.
#[derive(Debug, Clone, Default)]
pub struct AcknowledgingDelivery<L> {
    inner: L,
}

impl<L: DeliveryStep> AcknowledgingDelivery<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }
}

impl<L: DeliveryStep> DeliveryStep for AcknowledgingDelivery<L> {
    fn deliver(&self, registry: &ConnectionRegistry, message: &Message) -> DeliveryOutcome {
        let outcome = self.inner.deliver(registry, message);

        if let Some(sender) = registry.lookup(message.sender()) {
            let ack = AckFrame {
                receiver: message.receiver().to_string(),
                outcome,
            };
            if sender.acknowledge(ack).is_err() {
                debug!(sender = %message.sender(), "sender left before ack");
            }
        }

        outcome
    }
}

/// Build the delivery step selected by configuration.
pub fn configured_delivery(acknowledge: bool) -> Box<dyn DeliveryStep> {
    if acknowledge {
        Box::new(AcknowledgingDelivery::new(DirectDelivery))
    } else {
        Box::new(DirectDelivery)
    }
}
