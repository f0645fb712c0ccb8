use thiserror::Error;

/// Errors from repository operations (used by trait definitions in coachline-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// An inbound frame that could not be turned into a message.
///
/// Fatal for the connection that sent it.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("frame has no receiver")]
    MissingReceiver,

    #[error("content is {len} bytes, limit is {max}")]
    ContentTooLarge { len: usize, max: usize },
}

/// A write to a live connection failed.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("connection closed")]
    ConnectionClosed,
}

/// Errors related to accounts and sessions.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("invalid username: {0}")]
    InvalidUsername(String),

    #[error("invalid password: {0}")]
    InvalidPassword(String),

    #[error("username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("wrong username or password")]
    InvalidCredentials,

    #[error("session is missing, expired or unknown")]
    Unauthenticated,

    #[error("password hashing failed")]
    Hashing,

    #[error("storage error: {0}")]
    StorageError(String),
}

/// Errors from conversation history retrieval.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("unknown user '{0}'")]
    UnknownUser(String),

    #[error("storage error: {0}")]
    StorageError(String),
}
