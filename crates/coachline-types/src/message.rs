//! Chat messaging domain types for Coachline.
//!
//! Defines the three-field wire record exchanged over live connections
//! ([`ChatFrame`]), the validated in-process [`Message`], and the shapes the
//! message store hands back ([`StoredMessage`], [`HistoryEntry`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FrameError;
use crate::user::{Identity, UserId};

/// The wire record carried by inbound and outbound chat frames.
///
/// Exactly three textual fields. On input `sender` is optional and ignored:
/// the server always overwrites it with the identity bound to the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatFrame {
    #[serde(default)]
    pub sender: String,
    pub receiver: String,
    pub content: String,
}

impl ChatFrame {
    /// Decode a JSON text frame.
    pub fn decode(raw: &str) -> Result<Self, FrameError> {
        serde_json::from_str(raw).map_err(|e| FrameError::Malformed(e.to_string()))
    }

    /// Decode a JSON frame delivered as bytes.
    pub fn decode_bytes(raw: &[u8]) -> Result<Self, FrameError> {
        serde_json::from_slice(raw).map_err(|e| FrameError::Malformed(e.to_string()))
    }
}

/// A chat message on its way through the relay.
///
/// Immutable once constructed: the fields are private and only readable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    sender: Identity,
    receiver: Identity,
    content: String,
}

impl Message {
    /// Build a message from a decoded frame, binding it to `sender`.
    ///
    /// Whatever the frame claims as sender is discarded. Fails when the
    /// receiver is blank or the content exceeds `max_content_bytes`.
    pub fn from_frame(
        frame: ChatFrame,
        sender: Identity,
        max_content_bytes: usize,
    ) -> Result<Self, FrameError> {
        let receiver = frame.receiver.trim();
        if receiver.is_empty() {
            return Err(FrameError::MissingReceiver);
        }
        if frame.content.len() > max_content_bytes {
            return Err(FrameError::ContentTooLarge {
                len: frame.content.len(),
                max: max_content_bytes,
            });
        }

        Ok(Self {
            sender,
            receiver: Identity::new(receiver),
            content: frame.content,
        })
    }

    pub fn sender(&self) -> &Identity {
        &self.sender
    }

    pub fn receiver(&self) -> &Identity {
        &self.receiver
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// The outbound frame delivered to the receiver.
    pub fn to_frame(&self) -> ChatFrame {
        ChatFrame {
            sender: self.sender.to_string(),
            receiver: self.receiver.to_string(),
            content: self.content.clone(),
        }
    }
}

/// A message as recorded by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    /// UUIDv7 message ID.
    pub id: Uuid,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    /// Assigned by the store at append time.
    pub timestamp: DateTime<Utc>,
}

/// One line of a conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Display name (username) of the author.
    pub sender: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Result of the live delivery step for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// Written to the receiver's live connection.
    Delivered,
    /// Receiver had no live connection; nothing was written.
    Offline,
    /// The write failed and the receiver's connection was dropped.
    Failed,
}

impl std::fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryOutcome::Delivered => write!(f, "delivered"),
            DeliveryOutcome::Offline => write!(f, "offline"),
            DeliveryOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// Acknowledgement sent back to a sender when delivery acks are enabled.
///
/// Serialized as `{"type":"ack","receiver":"...","outcome":"delivered"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "ack")]
pub struct AckFrame {
    pub receiver: String,
    pub outcome: DeliveryOutcome,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
