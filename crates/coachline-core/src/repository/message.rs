//! Message store trait definition.
//!
//! Durable append of chat messages and ordered retrieval of the conversation
//! between two users. The infrastructure layer (coachline-infra) implements
//! this trait with SQLite persistence.

use coachline_types::error::RepositoryError;
use coachline_types::message::{HistoryEntry, StoredMessage};
use coachline_types::user::UserId;

/// Repository trait for chat message persistence.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait MessageStore: Send + Sync {
    /// Durably record one message.
    ///
    /// The store assigns the message id and timestamp from its own clock.
    /// Once this returns `Ok`, the message is visible to [`history`](Self::history).
    fn append(
        &self,
        sender_id: &UserId,
        receiver_id: &UserId,
        content: &str,
    ) -> impl std::future::Future<Output = Result<StoredMessage, RepositoryError>> + Send;

    /// Messages exchanged between two users in either direction, oldest first.
    ///
    /// Symmetric: `history(a, b)` and `history(b, a)` return the same sequence.
    fn history(
        &self,
        user_a: &UserId,
        user_b: &UserId,
    ) -> impl std::future::Future<Output = Result<Vec<HistoryEntry>, RepositoryError>> + Send;
}
