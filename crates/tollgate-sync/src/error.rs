//! # Sync Error Types
//!
//! Error types for the synchronization engine.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │     Input       │  │       Store             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Validation     │  │  Write                  │ │
//! │  │  ConfigLoad...  │  │  Io (batch file)│  │  Subscription           │ │
//! │  │  ConfigSave...  │  │                 │  │  Import                 │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │    Session      │                                                   │
//! │  │                 │                                                   │
//! │  │ SessionNotReady │                                                   │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use tollgate_core::ValidationError;
use tollgate_store::StoreError;

use crate::snapshot::Topic;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering every failure the operator can see.
///
/// ## Design Principles
/// - Store failures keep the store's error as `#[source]`
/// - Each variant names the operation, topic or batch it came from
/// - All errors are `Send + Sync` for async compatibility
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Input Errors
    // =========================================================================
    /// Operator input or batch file rejected before any write.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Batch file could not be read.
    #[error("Failed to read batch file: {0}")]
    Io(#[from] std::io::Error),

    // =========================================================================
    // Store Errors
    // =========================================================================
    /// A single-document write failed.
    #[error("Failed to {operation}: {source}")]
    Write {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    /// The store refused to establish a live query.
    #[error("Failed to subscribe to {topic}: {source}")]
    Subscription {
        topic: Topic,
        #[source]
        source: StoreError,
    },

    /// A batch import failed; nothing was written.
    #[error("Import of {staged} tokens failed: {source}")]
    Import {
        staged: usize,
        #[source]
        source: StoreError,
    },

    // =========================================================================
    // Session Errors
    // =========================================================================
    /// No actor attached yet.
    #[error("Session not ready: no actor attached")]
    SessionNotReady,

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration value.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if the store reported a transient failure.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Write { source, .. }
            | SyncError::Subscription { source, .. }
            | SyncError::Import { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Returns true if the operator can fix this by changing their input.
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, SyncError::Validation(_) | SyncError::Io(_))
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }
}
