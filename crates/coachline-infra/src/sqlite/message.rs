//! SQLite message store implementation.
//!
//! Implements `MessageStore` from `coachline-core`. Appends go through the
//! single-connection writer pool, so rows are inserted in dispatch order and
//! the `seq` column records that order.

use chrono::{SubsecRound, Utc};
use coachline_core::repository::MessageStore;
use coachline_types::error::RepositoryError;
use coachline_types::message::{HistoryEntry, StoredMessage};
use coachline_types::user::UserId;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime};

/// SQLite-backed implementation of `MessageStore`.
#[derive(Clone)]
pub struct SqliteMessageStore {
    pool: DatabasePool,
}

impl SqliteMessageStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for one line of a conversation.
struct HistoryRow {
    sender: String,
    content: String,
    timestamp: String,
}

impl HistoryRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            sender: row.try_get("sender")?,
            content: row.try_get("content")?,
            timestamp: row.try_get("timestamp")?,
        })
    }

    fn into_entry(self) -> Result<HistoryEntry, RepositoryError> {
        Ok(HistoryEntry {
            sender: self.sender,
            content: self.content,
            timestamp: parse_datetime(&self.timestamp)?,
        })
    }
}

impl MessageStore for SqliteMessageStore {
    async fn append(
        &self,
        sender_id: &UserId,
        receiver_id: &UserId,
        content: &str,
    ) -> Result<StoredMessage, RepositoryError> {
        let message = StoredMessage {
            id: Uuid::now_v7(),
            sender_id: *sender_id,
            receiver_id: *receiver_id,
            content: content.to_string(),
            // Stored at microsecond precision; keep the returned value equal to the row.
            timestamp: Utc::now().trunc_subsecs(6),
        };

        sqlx::query(
            "INSERT INTO messages (id, sender_id, receiver_id, content, timestamp)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(message.id.to_string())
        .bind(message.sender_id.to_string())
        .bind(message.receiver_id.to_string())
        .bind(&message.content)
        .bind(format_datetime(&message.timestamp))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(message)
    }

    async fn history(
        &self,
        user_a: &UserId,
        user_b: &UserId,
    ) -> Result<Vec<HistoryEntry>, RepositoryError> {
        let a = user_a.to_string();
        let b = user_b.to_string();

        let rows = sqlx::query(
            "SELECT u.username AS sender, m.content, m.timestamp
             FROM messages m
             JOIN users u ON u.id = m.sender_id
             WHERE (m.sender_id = ? AND m.receiver_id = ?)
                OR (m.sender_id = ? AND m.receiver_id = ?)
             ORDER BY m.timestamp ASC, m.seq ASC",
        )
        .bind(&a)
        .bind(&b)
        .bind(&b)
        .bind(&a)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                HistoryRow::from_row(row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_entry()
            })
            .collect()
    }
}
