use chrono::{DateTime, Utc};
use coachline_types::error::RepositoryError;
use coachline_types::user::{ResolvedSession, UserId};

/// Login session persistence. Only token digests are stored, never tokens.
pub trait SessionStore: Send + Sync {
    fn create_session(
        &self,
        user_id: &UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Look up a session by token digest, joined with its user.
    ///
    /// Expiry is not checked here; callers compare `expires_at`.
    fn resolve_session(
        &self,
        token_hash: &str,
    ) -> impl std::future::Future<Output = Result<Option<ResolvedSession>, RepositoryError>> + Send;

    /// Returns `true` if a session was removed.
    fn delete_session(
        &self,
        token_hash: &str,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Remove sessions that expired before `now`. Returns the number removed.
    fn purge_expired(
        &self,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
