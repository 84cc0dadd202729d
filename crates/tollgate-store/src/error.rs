//! # Store Error Types
//!
//! Error types for record store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  Remote store failure (permission, network, quota)                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (this module) ← Categorized, keeps the store's message     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SyncError (tollgate-sync) ← Adds operation / topic context            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Operator UI displays the message                                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Record store operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store's access rules refused the operation.
    ///
    /// ## When This Occurs
    /// - Session token expired or was revoked
    /// - Namespace rules do not grant the actor access
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Document does not exist (merge update or required read).
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// Transient failure; the same call may succeed later.
    ///
    /// ## When This Occurs
    /// - Network partition, backend restart
    /// - Live query stream dropped by the server
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Batch exceeds the store's per-commit document limit.
    #[error("batch of {size} writes exceeds the limit of {max}")]
    BatchTooLarge { size: usize, max: usize },

    /// A document or write payload is not a JSON object.
    #[error("invalid document {id}: {reason}")]
    InvalidDocument { id: String, reason: String },

    /// The store ended a live query or was shut down.
    #[error("store is closed")]
    Closed,

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Creates a NotFound error.
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Returns true if retrying the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Result type for record store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(StoreError::Unavailable("stream reset".into()).is_retryable());
        assert!(!StoreError::PermissionDenied("rules".into()).is_retryable());
        assert!(!StoreError::BatchTooLarge { size: 600, max: 500 }.is_retryable());
        assert!(!StoreError::Closed.is_retryable());
    }

    #[test]
    fn test_not_found_message() {
        let err = StoreError::not_found("artifacts/app/public/data/machines", "t-9");
        assert_eq!(
            err.to_string(),
            "document not found: artifacts/app/public/data/machines/t-9"
        );
    }
}
