//! Store error types
//!
//! Defines all errors that can occur while talking to the backing event store.

use thiserror::Error;

/// Errors that can occur in the store layer
#[derive(Error, Debug)]
pub enum StoreError {
    /// The SQL engine rejected or failed a statement
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O operation failed (opening the database file, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection lock was poisoned by a panicking holder
    #[error("Lock error: {0}")]
    Lock(String),

    /// The blocking task running a statement did not complete
    #[error("Task error: {0}")]
    Task(String),

    /// A returned row did not have the expected shape
    #[error("Row mapping error: {0}")]
    Mapping(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        StoreError::Task(err.to_string())
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::Mapping("expected integer in column 0".to_string());
        assert_eq!(
            err.to_string(),
            "Row mapping error: expected integer in column 0"
        );

        let err = StoreError::Lock("poisoned".to_string());
        assert_eq!(err.to_string(), "Lock error: poisoned");
    }

    #[test]
    fn test_sqlite_error_conversion() {
        let sqlite_err = rusqlite::Error::QueryReturnedNoRows;
        let store_err: StoreError = sqlite_err.into();
        assert!(matches!(store_err, StoreError::Sqlite(_)));
    }
}
