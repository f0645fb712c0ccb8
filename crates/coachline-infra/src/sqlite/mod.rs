//! SQLite storage layer.
//!
//! Repository implementations backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod identity;
pub mod message;
pub mod pool;
pub mod session;

use chrono::{DateTime, SecondsFormat, Utc};
use coachline_types::error::RepositoryError;
use coachline_types::user::UserId;

/// RFC 3339 with a fixed six-digit fraction, so text order is time order.
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

pub(crate) fn parse_user_id(s: &str) -> Result<UserId, RepositoryError> {
    s.parse()
        .map_err(|e| RepositoryError::Query(format!("invalid user id: {e}")))
}
