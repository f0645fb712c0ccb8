//! SQLite session store implementation.

use chrono::{DateTime, Utc};
use coachline_core::repository::SessionStore;
use coachline_types::error::RepositoryError;
use coachline_types::user::{Identity, ResolvedSession, Role, UserId};
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_user_id};

/// SQLite-backed implementation of `SessionStore`.
#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: DatabasePool,
}

impl SqliteSessionStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

impl SessionStore for SqliteSessionStore {
    async fn create_session(
        &self,
        user_id: &UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(token_hash)
        .bind(user_id.to_string())
        .bind(format_datetime(&Utc::now()))
        .bind(format_datetime(&expires_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }

    async fn resolve_session(
        &self,
        token_hash: &str,
    ) -> Result<Option<ResolvedSession>, RepositoryError> {
        let row = sqlx::query(
            "SELECT s.user_id, s.expires_at, u.username, u.role
             FROM sessions s
             JOIN users u ON u.id = s.user_id
             WHERE s.token_hash = ?",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let get = |column: &str| -> Result<String, RepositoryError> {
            row.try_get(column)
                .map_err(|e| RepositoryError::Query(e.to_string()))
        };
        let role: Role = get("role")?.parse().map_err(RepositoryError::Query)?;

        Ok(Some(ResolvedSession {
            user_id: parse_user_id(&get("user_id")?)?,
            identity: Identity::new(get("username")?),
            role,
            expires_at: parse_datetime(&get("expires_at")?)?,
        }))
    }

    async fn delete_session(&self, token_hash: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(token_hash)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(format_datetime(&now))
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(result.rows_affected())
    }
}
