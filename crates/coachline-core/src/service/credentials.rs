//! Password hashing and session token traits.
//!
//! Defined in coachline-core so the account service can hash passwords and
//! mint tokens without coupling to a specific algorithm. The Argon2 and
//! SHA-256 adapters live in coachline-infra.

use coachline_types::error::AccountError;
use secrecy::SecretString;

/// One-way password hashing.
pub trait PasswordHasher: Send + Sync {
    /// Hash a password into a self-describing string (salt included).
    fn hash_password(&self, password: &SecretString) -> Result<String, AccountError>;

    /// Check a password against a stored hash. A malformed hash never verifies.
    fn verify_password(&self, password: &SecretString, hash: &str) -> bool;
}

/// A freshly minted session token and the digest to persist for it.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Handed to the client exactly once.
    pub token: String,
    pub digest: String,
}

/// Session token generation.
///
/// Tokens are opaque random strings. Only `digest(token)` is ever stored, so
/// a leaked sessions table cannot be replayed.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self) -> IssuedToken;

    fn digest(&self, token: &str) -> String;
}
