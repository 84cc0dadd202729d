//! # Error Types
//!
//! Domain-specific error types for tollgate-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tollgate-core errors (this file)                                      │
//! │  └── ValidationError  - Bad batch file or operator input               │
//! │                                                                         │
//! │  tollgate-store errors                                                 │
//! │  └── StoreError       - The record store refused or failed             │
//! │                                                                         │
//! │  tollgate-sync errors                                                  │
//! │  └── SyncError        - What the UI sees (Write, Import, ...)          │
//! │                                                                         │
//! │  Flow: ValidationError ─┐                                              │
//! │        StoreError ──────┴─► SyncError ──► UI message                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Name the offending field or column in the message
//! 3. Validation errors are user-correctable; they never wrap I/O failures

use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any write is attempted, so a `ValidationError` always means
/// the record store was not touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or blank.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value is not in the allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// The batch file header lacks a required column.
    ///
    /// ## When This Occurs
    /// ```text
    /// Header: Login,Plan,SellerFee
    ///                            ▲
    ///                            └── no "Price" column
    ///      │
    ///      ▼
    /// MissingColumn { column: "Price" }
    /// ```
    #[error("batch file is missing required column '{column}'")]
    MissingColumn { column: String },

    /// The batch file has a header but no data lines at all.
    #[error("batch file is empty or has no data rows")]
    NoDataRows,

    /// Every data row was skipped (blank codes).
    #[error("no valid tokens found in batch file")]
    NoValidTokens,

    /// Re-importing these codes would reset tokens that were already sold.
    #[error("tokens already sold cannot be re-imported: {}", codes.join(", "))]
    AlreadySold { codes: Vec<String> },
}

impl ValidationError {
    /// Creates a Required error for the given field.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Returns true when the batch file yielded nothing to import.
    ///
    /// Covers both the header-only file and the all-rows-skipped file.
    pub fn is_empty_batch(&self) -> bool {
        matches!(
            self,
            ValidationError::NoDataRows | ValidationError::NoValidTokens
        )
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_names_the_column() {
        let err = ValidationError::MissingColumn {
            column: "SellerFee".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "batch file is missing required column 'SellerFee'"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::required("name").to_string(), "name is required");

        let err = ValidationError::OutOfRange {
            field: "paper level".to_string(),
            min: 0,
            max: 100,
        };
        assert_eq!(err.to_string(), "paper level must be between 0 and 100");

        let err = ValidationError::AlreadySold {
            codes: vec!["ABC123".to_string(), "XYZ789".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "tokens already sold cannot be re-imported: ABC123, XYZ789"
        );
    }

    #[test]
    fn test_empty_batch_classification() {
        assert!(ValidationError::NoDataRows.is_empty_batch());
        assert!(ValidationError::NoValidTokens.is_empty_batch());
        assert!(!ValidationError::required("Login").is_empty_batch());
    }
}
