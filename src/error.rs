//! Error taxonomy for task storage.
//!
//! [`StoreError`] is what every store operation returns. Storage failures are
//! classified into a [`StorageCause`] so callers can tell a missing table
//! from an unreachable database without inspecting driver errors.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::task::TaskId;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The request was rejected before touching storage.
    #[error("{0}")]
    Validation(String),

    /// No task with this id exists.
    #[error("Task {0} not found")]
    NotFound(TaskId),

    /// The backing storage failed.
    #[error("{cause}")]
    Storage {
        cause: StorageCause,
        #[source]
        source: BoxError,
    },
}

/// Why a storage call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageCause {
    MissingSchema,
    ConnectionRefused,
    Timeout,
    Corrupt,
    Other,
}

impl StorageCause {
    /// Short machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            StorageCause::MissingSchema => "missing_schema",
            StorageCause::ConnectionRefused => "connection_refused",
            StorageCause::Timeout => "timeout",
            StorageCause::Corrupt => "corrupt",
            StorageCause::Other => "other",
        }
    }

    /// True when the store could not be reached at all.
    pub fn is_connectivity(self) -> bool {
        matches!(self, StorageCause::ConnectionRefused | StorageCause::Timeout)
    }
}

impl fmt::Display for StorageCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            StorageCause::MissingSchema => "The todos table does not exist. Restart the server to create it.",
            StorageCause::ConnectionRefused => "Could not connect to the database. Check that it is reachable.",
            StorageCause::Timeout => "Timed out waiting for the database.",
            StorageCause::Corrupt => "Stored task data could not be read.",
            StorageCause::Other => "A storage error occurred.",
        };
        f.write_str(message)
    }
}

impl StoreError {
    pub fn storage(cause: StorageCause, source: impl Into<BoxError>) -> Self {
        StoreError::Storage {
            cause,
            source: source.into(),
        }
    }

    pub fn cause(&self) -> Option<StorageCause> {
        match self {
            StoreError::Storage { cause, .. } => Some(*cause),
            _ => None,
        }
    }
}

fn classify_io(err: &io::Error) -> StorageCause {
    match err.kind() {
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected => StorageCause::ConnectionRefused,
        io::ErrorKind::TimedOut => StorageCause::Timeout,
        io::ErrorKind::InvalidData => StorageCause::Corrupt,
        _ => StorageCause::Other,
    }
}

fn classify_sqlx(err: &sqlx::Error) -> StorageCause {
    match err {
        sqlx::Error::PoolTimedOut => StorageCause::Timeout,
        sqlx::Error::PoolClosed => StorageCause::ConnectionRefused,
        sqlx::Error::Io(io) => classify_io(io),
        sqlx::Error::Database(db) => {
            let message = db.message();
            if message.contains("no such table") {
                StorageCause::MissingSchema
            } else if message.contains("unable to open database") {
                StorageCause::ConnectionRefused
            } else {
                StorageCause::Other
            }
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            StorageCause::Corrupt
        }
        _ => StorageCause::Other,
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::storage(classify_sqlx(&err), err)
    }
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        StoreError::storage(classify_io(&err), err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::storage(StorageCause::Corrupt, err)
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        StoreError::storage(StorageCause::Other, err)
    }
}

impl From<tempfile::PersistError> for StoreError {
    fn from(err: tempfile::PersistError) -> Self {
        StoreError::from(err.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_classified() {
        let refused = StoreError::from(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert_eq!(refused.cause(), Some(StorageCause::ConnectionRefused));
        assert!(StorageCause::ConnectionRefused.is_connectivity());

        let timeout = StoreError::from(io::Error::from(io::ErrorKind::TimedOut));
        assert_eq!(timeout.cause(), Some(StorageCause::Timeout));

        let other = StoreError::from(io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(other.cause(), Some(StorageCause::Other));
        assert!(!StorageCause::Other.is_connectivity());
    }

    #[test]
    fn pool_timeout_is_a_timeout() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.cause(), Some(StorageCause::Timeout));
    }

    #[test]
    fn bad_json_is_corrupt() {
        let err = serde_json::from_str::<Vec<u8>>("{").unwrap_err();
        assert_eq!(StoreError::from(err).cause(), Some(StorageCause::Corrupt));
    }

    #[test]
    fn messages_are_human_readable() {
        assert_eq!(StoreError::NotFound(7).to_string(), "Task 7 not found");
        assert!(StoreError::from(sqlx::Error::PoolTimedOut).to_string().contains("Timed out"));
        assert_eq!(StoreError::NotFound(7).cause(), None);
    }
}
