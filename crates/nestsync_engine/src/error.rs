//! Error types for the sync engine.

use nestsync_protocol::CodecError;
use nestsync_store::StorageError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Transient network failure (timeout, connection refused, transport
    /// dropped). Retried with backoff, never surfaced as fatal.
    #[error("transient network error: {message}")]
    Transient {
        /// Error message.
        message: String,
    },

    /// A pull or push call exceeded its fixed timeout. Treated exactly
    /// like a transport failure.
    #[error("operation timed out")]
    Timeout,

    /// The remote service permanently rejected an action. Retrying
    /// cannot succeed.
    #[error("remote rejected action: {reason}")]
    Rejected {
        /// Rejection reason reported by the server.
        reason: String,
    },

    /// No connectivity; a cycle cannot start.
    #[error("offline")]
    Offline,

    /// Local store failure. Fatal for the triggering operation only.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A persisted or transported value failed to encode or decode.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The state machine refused a transition.
    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition {
        /// Current state.
        from: String,
        /// Attempted target state.
        to: String,
    },

    /// A direct operation referenced a record the store does not hold.
    #[error("unknown record {id} in collection {entity_type}")]
    UnknownRecord {
        /// Collection searched.
        entity_type: String,
        /// Record identifier.
        id: String,
    },
}

impl SyncError {
    /// Creates a transient transport error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Returns true if the failure should be retried with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SyncError::Transient { .. } | SyncError::Timeout | SyncError::Offline
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(SyncError::transient("connection reset").is_transient());
        assert!(SyncError::Timeout.is_transient());
        assert!(SyncError::Offline.is_transient());
        assert!(!SyncError::Rejected {
            reason: "bad payload".into()
        }
        .is_transient());
        assert!(!SyncError::Storage(StorageError::Closed).is_transient());
    }

    #[test]
    fn error_display() {
        let err = SyncError::InvalidTransition {
            from: "pulling".into(),
            to: "idle".into(),
        };
        assert!(err.to_string().contains("pulling"));
        assert!(err.to_string().contains("idle"));
    }
}
