//! # Store Error Types
//!
//! Error types for file persistence.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  std::io::Error / serde_json::Error                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (this module) ← Adds path and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SyncError::Store (retail-sync) ← Logged, then returned as Failure     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use retail_core::ValidationError;
use thiserror::Error;

/// File persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record not found in a document.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique key already present.
    ///
    /// ## When This Occurs
    /// - Adding a SKU that is already tracked
    #[error("Duplicate {field}: '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// Input rejected before it reached the document.
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Filesystem error outside the retried read/write path.
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// Document could not be encoded.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Every read or write attempt failed.
    ///
    /// ## When This Occurs
    /// - File locked by another process for longer than the retry window
    /// - File content is not a valid document and cannot be parsed
    /// - Disk full or permissions changed
    #[error("{operation} of {path} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        operation: &'static str,
        path: String,
        attempts: u32,
        last_error: String,
    },
}

impl StoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Duplicate error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        StoreError::Duplicate {
            field: field.into(),
            value: value.into(),
        }
    }

    pub(crate) fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        StoreError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            StoreError::duplicate("sku", "MUG-BLUE").to_string(),
            "Duplicate sku: 'MUG-BLUE' already exists"
        );
        let err = StoreError::RetriesExhausted {
            operation: "read",
            path: "inventory.json".into(),
            attempts: 5,
            last_error: "EOF".into(),
        };
        assert_eq!(
            err.to_string(),
            "read of inventory.json failed after 5 attempts: EOF"
        );
    }
}
