//! Error types for record store operations.

use std::fmt;

use thiserror::Error;

/// Primary `SQLite` result codes for a write that lost the lock race.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// What went wrong in the database, as far as callers act on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreDbErrorKind {
    /// Another connection holds the write lock; the write may be retried.
    BusyOrLocked,
    /// No pooled connection became free in time.
    PoolTimeout,
    /// The pool was closed.
    PoolClosed,
    /// Anything else.
    Other,
}

impl StoreDbErrorKind {
    #[must_use]
    pub fn from_sqlx(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut => Self::PoolTimeout,
            sqlx::Error::PoolClosed => Self::PoolClosed,
            sqlx::Error::Database(db_error) if is_lock_conflict(db_error.code().as_deref()) => {
                Self::BusyOrLocked
            }
            _ => Self::Other,
        }
    }
}

impl fmt::Display for StoreDbErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::BusyOrLocked => "busy_or_locked",
            Self::PoolTimeout => "pool_timeout",
            Self::PoolClosed => "pool_closed",
            Self::Other => "other",
        };
        write!(f, "{label}")
    }
}

/// `SQLite` reports extended result codes; the primary code is the low byte.
fn is_lock_conflict(code: Option<&str>) -> bool {
    code.and_then(|code| code.parse::<i32>().ok())
        .is_some_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
}

/// Errors that can occur during record store operations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error ({kind}): {message}")]
    Database {
        kind: StoreDbErrorKind,
        message: String,
    },

    /// A stored body could not be encoded or decoded.
    #[error("record serialization failed: {0}")]
    Serialization(String),

    /// The key passed to a write does not match the record's own name.
    #[error(
        "key '{key}' does not match record name '{name}'\n  Suggestion: Records are stored under their own name"
    )]
    KeyMismatch { key: String, name: String },

    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database {
            kind: StoreDbErrorKind::from_sqlx(&err),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl StoreError {
    /// Returns the typed database error kind, when this is a database error.
    #[must_use]
    pub fn database_kind(&self) -> Option<StoreDbErrorKind> {
        match self {
            Self::Database { kind, .. } => Some(*kind),
            Self::Serialization(_) | Self::KeyMismatch { .. } | Self::Unavailable(_) => None,
        }
    }

    /// Returns true when this error is a database busy/locked condition.
    #[must_use]
    pub fn is_busy_or_locked(&self) -> bool {
        self.database_kind() == Some(StoreDbErrorKind::BusyOrLocked)
    }
}
