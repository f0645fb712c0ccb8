//! Conversation history between two users.

use coachline_types::error::HistoryError;
use coachline_types::message::HistoryEntry;
use coachline_types::user::{Identity, UserId};

use crate::repository::{IdentityDirectory, MessageStore};

/// Resolves both names and reads the stored conversation, oldest first.
pub struct HistoryService<D: IdentityDirectory, S: MessageStore> {
    directory: D,
    store: S,
}

impl<D: IdentityDirectory, S: MessageStore> HistoryService<D, S> {
    pub fn new(directory: D, store: S) -> Self {
        Self { directory, store }
    }

    /// Messages exchanged between `a` and `b` in either direction.
    ///
    /// Order does not depend on which side asks. A pair that never talked
    /// yields an empty list.
    pub async fn conversation(
        &self,
        a: &Identity,
        b: &Identity,
    ) -> Result<Vec<HistoryEntry>, HistoryError> {
        let a_id = self.resolve(a).await?;
        let b_id = self.resolve(b).await?;
        self.store
            .history(&a_id, &b_id)
            .await
            .map_err(|e| HistoryError::StorageError(e.to_string()))
    }

    async fn resolve(&self, identity: &Identity) -> Result<UserId, HistoryError> {
        self.directory
            .lookup_identity(identity)
            .await
            .map_err(|e| HistoryError::StorageError(e.to_string()))?
            .ok_or_else(|| HistoryError::UnknownUser(identity.to_string()))
    }
}
