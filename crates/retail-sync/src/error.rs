//! # Sync Error Types
//!
//! Error types for ERP calls and sync orchestration.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │      ERP        │  │     Orchestration       │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  AuthFailed     │  │  NoInventoryData        │ │
//! │  │  InvalidUrl     │  │  CallFailure    │  │  SalesCheckFailed       │ │
//! │  │  ConfigLoad/Save│  │  Transport      │  │  Decode                 │ │
//! │  │                 │  │  NotLoggedIn    │  │  Store / Core           │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  Engine boundary: SyncError ──► error log entry ──► Failure            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use retail_core::{CoreError, ErrorKind};
use retail_store::StoreError;
use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering every failure below the engine boundary.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid service configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// ERP base URL could not be built.
    #[error("Invalid ERP URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // ERP Errors
    // =========================================================================
    /// Login failed on every attempt.
    #[error("Failed to login to Fishbowl after {attempts} attempts: {message}")]
    AuthFailed { attempts: u32, message: String },

    /// ERP answered with a non-OK status. The session was logged out.
    #[error("Fishbowl {operation} call failed: {status} {reason}")]
    CallFailure {
        operation: String,
        status: u16,
        reason: String,
    },

    /// Request never got an answer (connect, timeout, body read).
    #[error("Fishbowl transport error: {0}")]
    Transport(String),

    /// Call attempted on a session that is not logged in.
    #[error("Fishbowl session is logged out or inactive")]
    NotLoggedIn,

    // =========================================================================
    // Orchestration Errors
    // =========================================================================
    /// Both inventory queries came back empty.
    #[error("There are no inventory records present in the Fishbowl query. Sync failed.")]
    NoInventoryData,

    /// The sales check that precedes a manual sync failed.
    #[error("Sales check failed during manual sync: {0}")]
    SalesCheckFailed(String),

    /// ERP rows did not have the expected shape.
    #[error("Unexpected ERP data: {0}")]
    Decode(String),

    /// Store read or write failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Business rule rejected the data.
    #[error("{0}")]
    Core(#[from] CoreError),

    // =========================================================================
    // Scheduler Errors
    // =========================================================================
    /// A scheduler job could not be (re)scheduled.
    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SyncError::Decode(err.to_string())
        } else {
            SyncError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Decode(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

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
    /// Returns true if the ERP call might succeed on the next scheduled pass.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport(_) | SyncError::AuthFailed { .. } => true,
            SyncError::CallFailure { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns true if the ERP itself (login, call, transport) failed.
    pub fn is_erp_failure(&self) -> bool {
        matches!(
            self,
            SyncError::AuthFailed { .. }
                | SyncError::CallFailure { .. }
                | SyncError::Transport(_)
                | SyncError::NotLoggedIn
        )
    }

    /// ERP-level cause recorded alongside the operation's error kind.
    pub fn cause_kind(&self) -> Option<ErrorKind> {
        match self {
            SyncError::AuthFailed { .. } => Some(ErrorKind::AuthError),
            SyncError::CallFailure { .. } | SyncError::Transport(_) | SyncError::NotLoggedIn => {
                Some(ErrorKind::CallFailure)
            }
            _ => None,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SyncError::Transport("connection refused".into()).is_retryable());
        assert!(SyncError::CallFailure {
            operation: "query".into(),
            status: 503,
            reason: "Service Unavailable".into(),
        }
        .is_retryable());

        assert!(!SyncError::CallFailure {
            operation: "query".into(),
            status: 400,
            reason: "Bad Request".into(),
        }
        .is_retryable());
        assert!(!SyncError::NoInventoryData.is_retryable());
    }

    #[test]
    fn test_cause_kind() {
        let auth = SyncError::AuthFailed {
            attempts: 2,
            message: "401 Unauthorized".into(),
        };
        assert_eq!(auth.cause_kind(), Some(ErrorKind::AuthError));
        assert!(auth.is_erp_failure());

        assert_eq!(SyncError::NotLoggedIn.cause_kind(), Some(ErrorKind::CallFailure));
        assert_eq!(SyncError::NoInventoryData.cause_kind(), None);
        assert!(!SyncError::SalesCheckFailed("x".into()).is_erp_failure());
    }

    #[test]
    fn test_error_display() {
        let err = SyncError::CallFailure {
            operation: "data-query".into(),
            status: 500,
            reason: "Internal Server Error".into(),
        };
        assert_eq!(
            err.to_string(),
            "Fishbowl data-query call failed: 500 Internal Server Error"
        );
    }
}
