//! Identity directory trait definition.
//!
//! Maps display names to persistence keys and stores account records.

use coachline_types::error::RepositoryError;
use coachline_types::user::{Identity, Role, User, UserCredentials, UserId};

/// Repository trait for user accounts.
///
/// Implementations live in coachline-infra (e.g., `SqliteIdentityDirectory`).
pub trait IdentityDirectory: Send + Sync {
    /// Resolve a display name to the key the message store uses.
    ///
    /// Returns `Ok(None)` for a name nobody has registered.
    fn lookup_identity(
        &self,
        identity: &Identity,
    ) -> impl std::future::Future<Output = Result<Option<UserId>, RepositoryError>> + Send;

    /// Insert a new account. Returns `Conflict` if the username is taken.
    fn create_user(
        &self,
        credentials: &UserCredentials,
    ) -> impl std::future::Future<Output = Result<User, RepositoryError>> + Send;

    /// Fetch an account with its password hash, for login.
    fn find_credentials(
        &self,
        identity: &Identity,
    ) -> impl std::future::Future<Output = Result<Option<UserCredentials>, RepositoryError>> + Send;

    /// List accounts ordered by username, optionally restricted to one role.
    fn list_users(
        &self,
        role: Option<Role>,
    ) -> impl std::future::Future<Output = Result<Vec<User>, RepositoryError>> + Send;
}
