//! Error types for local store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StorageError>;

/// Errors that can occur during local store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying backend failed to read or write.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A transaction could not commit.
    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    /// Persisted bytes are not in the expected shape.
    #[error("stored value corrupted: {0}")]
    Corrupted(String),

    /// The store has been closed.
    #[error("store is closed")]
    Closed,
}

impl StorageError {
    /// Creates a backend error from any message.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Creates a corruption error from any message.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StorageError::backend("disk full");
        assert_eq!(err.to_string(), "storage backend error: disk full");
        assert_eq!(StorageError::Closed.to_string(), "store is closed");
    }
}
