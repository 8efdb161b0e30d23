//! # Error Types
//!
//! Domain-specific error types for retail-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  retail-core errors (this file)                                        │
//! │  ├── CoreError        - Batch / domain rule failures                   │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  retail-store errors (separate crate)                                  │
//! │  └── StoreError       - File persistence failures                      │
//! │                                                                         │
//! │  retail-sync errors (separate crate)                                   │
//! │  └── SyncError        - ERP / orchestration failures                   │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SyncError → Failure (caller)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Tracked SKU cannot be found.
    #[error("SKU not found: {0}")]
    SkuNotFound(String),

    /// Import batch was requested without column headers.
    #[error("Import batch requires at least one header")]
    MissingHeaders,

    /// Import batch was requested without any cycle records.
    ///
    /// ## When This Occurs
    /// - Both ERP inventory queries came back empty
    /// - The cycle data merge failed and returned nothing
    #[error("Import batch requires at least one inventory record")]
    EmptyBatch,

    /// A header does not map to any cycle record column.
    #[error("Unknown import column: {0}")]
    UnknownColumn(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., SKU already tracked).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CoreError::SkuNotFound("TSHIRT-RED".into()).to_string(),
            "SKU not found: TSHIRT-RED"
        );
        assert_eq!(
            CoreError::UnknownColumn("Bin".into()).to_string(),
            "Unknown import column: Bin"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::OutOfRange {
            field: "sync_interval_minutes".to_string(),
            min: 1,
            max: 180,
        };
        assert_eq!(
            err.to_string(),
            "sync_interval_minutes must be between 1 and 180"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "sku".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
