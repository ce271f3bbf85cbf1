//! SQLite storage backend.
//!
//! Implements the `porton-core` repository traits over a `sqlx` SQLite pool.
//! Timestamps are persisted as unix seconds in INTEGER columns; booleans as
//! 0/1. Row structs in the repository modules own the mapping between those
//! representations and the core types.

mod repositories;

pub use repositories::{
    SqliteAccountRepository, SqliteAuditRepository, SqliteRefreshTokenRepository,
    SqliteRepositoryProvider,
};

use chrono::{DateTime, Utc};

/// Decode a unix-seconds column. Out-of-range values (which the core never
/// writes) collapse to the epoch rather than aborting the read.
pub(crate) fn from_unix(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

pub(crate) fn from_unix_opt(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.map(from_unix)
}
