//! Account service: registration, login, and session resolution.
//!
//! A session token is what binds a relay connection to an identity. The
//! transport layer resolves the token before handing the connection to the
//! relay; the relay itself never sees credentials.

use chrono::{Duration, Utc};
use coachline_types::error::{AccountError, RepositoryError};
use coachline_types::user::{Identity, ResolvedSession, Role, User, UserCredentials, UserId};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::repository::{IdentityDirectory, SessionStore};
use crate::service::credentials::{PasswordHasher, TokenIssuer};

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;
const PASSWORD_MIN: usize = 8;

/// Input for [`AccountService::register`].
#[derive(Debug)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: SecretString,
    pub role: Role,
}

/// A successful login.
#[derive(Debug, Clone)]
pub struct LoginSession {
    /// Raw session token. Returned once and never stored.
    pub token: String,
    pub user: User,
    pub expires_at: chrono::DateTime<Utc>,
}

/// Service owning account and session use cases.
pub struct AccountService<D, S, H, T>
where
    D: IdentityDirectory,
    S: SessionStore,
    H: PasswordHasher,
    T: TokenIssuer,
{
    directory: D,
    sessions: S,
    hasher: H,
    tokens: T,
    session_ttl: Duration,
}

impl<D, S, H, T> AccountService<D, S, H, T>
where
    D: IdentityDirectory,
    S: SessionStore,
    H: PasswordHasher,
    T: TokenIssuer,
{
    /// Create a new AccountService.
    ///
    /// - `session_ttl_hours`: lifetime of a login session
    pub fn new(directory: D, sessions: S, hasher: H, tokens: T, session_ttl_hours: u32) -> Self {
        Self {
            directory,
            sessions,
            hasher,
            tokens,
            session_ttl: Duration::hours(i64::from(session_ttl_hours)),
        }
    }

    /// Create an account.
    pub async fn register(&self, registration: Registration) -> Result<User, AccountError> {
        let username = validate_username(&registration.username)?;
        validate_password(&registration.password)?;

        let password_hash = self.hasher.hash_password(&registration.password)?;
        let credentials = UserCredentials {
            user: User {
                id: UserId::new(),
                username,
                email: registration.email.trim().to_string(),
                role: registration.role,
                created_at: Utc::now(),
            },
            password_hash,
        };

        let user = self
            .directory
            .create_user(&credentials)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => {
                    AccountError::UsernameTaken(credentials.user.username.to_string())
                }
                other => AccountError::StorageError(other.to_string()),
            })?;

        info!(username = %user.username, role = %user.role, "account registered");
        Ok(user)
    }

    /// Check credentials and open a session.
    ///
    /// Unknown usernames and wrong passwords produce the same error.
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<LoginSession, AccountError> {
        let identity = Identity::new(username.trim());
        let credentials = self
            .directory
            .find_credentials(&identity)
            .await
            .map_err(storage)?
            .ok_or(AccountError::InvalidCredentials)?;

        if !self
            .hasher
            .verify_password(password, &credentials.password_hash)
        {
            debug!(%identity, "login rejected");
            return Err(AccountError::InvalidCredentials);
        }

        let issued = self.tokens.issue();
        let expires_at = Utc::now() + self.session_ttl;
        self.sessions
            .create_session(&credentials.user.id, &issued.digest, expires_at)
            .await
            .map_err(storage)?;

        info!(%identity, "session opened");
        Ok(LoginSession {
            token: issued.token,
            user: credentials.user,
            expires_at,
        })
    }

    /// Map a raw session token back to its owner.
    ///
    /// Expired sessions are deleted on sight and reported as unauthenticated.
    pub async fn resolve(&self, token: &str) -> Result<ResolvedSession, AccountError> {
        if token.is_empty() {
            return Err(AccountError::Unauthenticated);
        }

        let digest = self.tokens.digest(token);
        let session = self
            .sessions
            .resolve_session(&digest)
            .await
            .map_err(storage)?
            .ok_or(AccountError::Unauthenticated)?;

        if session.expires_at <= Utc::now() {
            self.sessions.delete_session(&digest).await.map_err(storage)?;
            debug!(identity = %session.identity, "session expired");
            return Err(AccountError::Unauthenticated);
        }

        Ok(session)
    }

    /// End a session. Returns `false` if the token was not a live session.
    pub async fn logout(&self, token: &str) -> Result<bool, AccountError> {
        let digest = self.tokens.digest(token);
        self.sessions.delete_session(&digest).await.map_err(storage)
    }

    /// Remove expired sessions. Returns the number removed.
    pub async fn purge_expired_sessions(&self) -> Result<u64, AccountError> {
        let removed = self
            .sessions
            .purge_expired(Utc::now())
            .await
            .map_err(storage)?;
        if removed > 0 {
            info!(removed, "purged expired sessions");
        }
        Ok(removed)
    }

    /// List accounts, optionally restricted to one role.
    pub async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>, AccountError> {
        self.directory.list_users(role).await.map_err(storage)
    }
}

fn storage(err: RepositoryError) -> AccountError {
    AccountError::StorageError(err.to_string())
}

/// Usernames are 3-32 characters of ASCII letters, digits, `_`, `.` or `-`.
pub fn validate_username(raw: &str) -> Result<Identity, AccountError> {
    let name = raw.trim();
    let len = name.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(AccountError::InvalidUsername(format!(
            "must be {USERNAME_MIN}-{USERNAME_MAX} characters"
        )));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')))
    {
        return Err(AccountError::InvalidUsername(format!(
            "character '{bad}' is not allowed"
        )));
    }
    Ok(Identity::new(name))
}

fn validate_password(password: &SecretString) -> Result<(), AccountError> {
    if password.expose_secret().chars().count() < PASSWORD_MIN {
        return Err(AccountError::InvalidPassword(format!(
            "must be at least {PASSWORD_MIN} characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
