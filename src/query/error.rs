//! Query error types
//!
//! Defines the error conditions a request can hit on its way from raw
//! parameters to a result: rejected input, an unusable time range, or a
//! failing store.

use thiserror::Error;

/// Errors that can occur during query operations
#[derive(Error, Debug)]
pub enum QueryError {
    /// A supplied parameter failed its character policy
    #[error("Rejected parameter {field}: {value:?}")]
    Rejected { field: &'static str, value: String },

    /// Dates or resolution cannot form a window sequence
    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),

    /// Store layer error
    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),
}

impl QueryError {
    pub(crate) fn rejected(field: &'static str, value: impl Into<String>) -> Self {
        QueryError::Rejected {
            field,
            value: value.into(),
        }
    }

    /// Whether the caller caused this error (as opposed to the service)
    pub fn is_client_error(&self) -> bool {
        !matches!(self, QueryError::Store(_))
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[test]
    fn test_error_display() {
        let err = QueryError::rejected("territory", "a;b");
        assert_eq!(err.to_string(), "Rejected parameter territory: \"a;b\"");

        let err = QueryError::InvalidTimeRange("resolution must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid time range: resolution must be positive"
        );
    }

    #[test]
    fn test_client_vs_service() {
        assert!(QueryError::rejected("series", "users").is_client_error());
        assert!(QueryError::InvalidTimeRange(String::new()).is_client_error());

        let err: QueryError = StoreError::Lock("poisoned".to_string()).into();
        assert!(!err.is_client_error());
    }
}
