//! Error types for mnemo.

use thiserror::Error;

pub use crate::embedding::EmbeddingError;
pub use crate::sqlite::StorageError;

/// Main error type for mnemo operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Persistent entry store failure. Fatal to the triggering operation.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Primary and fallback embedding models both failed.
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Vector index unreachable or incompatible.
    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    /// Malformed caller input, rejected before any I/O.
    #[error("Invalid query: {0}")]
    Query(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Storage(StorageError::Sqlite(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_is_wrapped() {
        let err: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, Error::Storage(StorageError::Sqlite(_))));
        assert!(err.to_string().starts_with("Storage error"));
    }

    #[test]
    fn test_query_error_display() {
        let err = Error::Query("query cannot be empty".to_string());
        assert_eq!(err.to_string(), "Invalid query: query cannot be empty");
    }
}
