use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Persistence key for a user, wrapping a UUID v7 (time-sortable).
///
/// Messages reference users by `UserId`; the live relay addresses them by
/// [`Identity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Create a new UserId using UUID v7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create a UserId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Stable identity of an authenticated principal: the unique username.
///
/// This is the key of the connection registry and the value written into
/// the `sender` field of every relayed frame. Usernames are unique in
/// storage and never reassigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The two kinds of account on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Coach,
    Client,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Coach => write!(f, "coach"),
            Role::Client => write!(f, "client"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "coach" => Ok(Role::Coach),
            "client" | "user" => Ok(Role::Client),
            other => Err(format!("invalid role: '{other}'")),
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Client
    }
}

/// A registered account.
///
/// The password hash never leaves the infrastructure layer and is not part
/// of this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: Identity,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Account record as stored, including the password hash (PHC string).
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// A session token resolved back to the principal that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSession {
    pub user_id: UserId,
    pub identity: Identity,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_display_and_parse() {
        let id = UserId::new();
        let parsed: UserId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_identity_serializes_as_plain_string() {
        let identity = Identity::new("coach_kim");
        assert_eq!(serde_json::to_string(&identity).unwrap(), "\"coach_kim\"");
        let parsed: Identity = serde_json::from_str("\"alex\"").unwrap();
        assert_eq!(parsed.as_str(), "alex");
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("coach".parse::<Role>().unwrap(), Role::Coach);
        assert_eq!("Client".parse::<Role>().unwrap(), Role::Client);
        assert_eq!("user".parse::<Role>().unwrap(), Role::Client);
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Coach).unwrap(), "\"coach\"");
        let role: Role = serde_json::from_str("\"client\"").unwrap();
        assert_eq!(role, Role::Client);
    }
}
