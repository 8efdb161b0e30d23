//! # Error Log Repository
//!
//! Persistent record of every failure the sync service hit, with
//! resolution tracking and a notification hook.
//!
//! ## Logging Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  log_error(NewError)                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  same {kind, message, source} already unresolved?                      │
//! │       │                                                                 │
//! │       ├── append entry, bump stats  (always)                           │
//! │       │                                                                 │
//! │       └── new problem? ──► ErrorNotifier::notify(entry)                │
//! │                            (repeat of an open problem: silent)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Entries are stored oldest first; readers get them newest first.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use retail_core::{ErrorLogEntry, ErrorStats, NewError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::document::JsonDocument;
use crate::error::StoreResult;

/// On-disk shape of the error log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorLogData {
    #[serde(default)]
    pub errors: Vec<ErrorLogEntry>,
    #[serde(default)]
    pub stats: ErrorStats,
}

/// Result of [`ErrorLog::log_error`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedError {
    pub entry: ErrorLogEntry,
    /// `false` when an unresolved entry already described this problem.
    pub is_new: bool,
}

// =============================================================================
// Notification
// =============================================================================

/// Receives newly seen problems.
#[async_trait]
pub trait ErrorNotifier: Send + Sync {
    async fn notify(&self, entry: &ErrorLogEntry);
}

/// Emits new problems as `warn!` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl ErrorNotifier for TracingNotifier {
    async fn notify(&self, entry: &ErrorLogEntry) {
        warn!(
            error_id = entry.id,
            kind = %entry.kind,
            source = %entry.source,
            user = %entry.user,
            details = %entry.details,
            "New error: {}",
            entry.message
        );
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the error log.
#[derive(Clone)]
pub struct ErrorLog {
    doc: Arc<JsonDocument<ErrorLogData>>,
    notifier: Arc<dyn ErrorNotifier>,
}

impl std::fmt::Debug for ErrorLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorLog").field("doc", &self.doc).finish()
    }
}

impl ErrorLog {
    pub fn new(doc: Arc<JsonDocument<ErrorLogData>>, notifier: Arc<dyn ErrorNotifier>) -> Self {
        ErrorLog { doc, notifier }
    }

    /// Appends an error entry, notifying only for problems not already open.
    pub async fn log_error(&self, error: NewError) -> StoreResult<LoggedError> {
        let logged = self
            .doc
            .update(|data| {
                let is_new = !data
                    .errors
                    .iter()
                    .any(|e| e.same_problem(error.kind, &error.message, &error.source));

                let now = Utc::now();
                data.stats.total_errors += 1;
                data.stats.last_error = Some(now);

                let entry = ErrorLogEntry {
                    id: data.stats.total_errors,
                    timestamp: now,
                    kind: error.kind,
                    message: error.message,
                    source: error.source,
                    user: error.user,
                    details: error.details,
                    resolved: false,
                    resolved_by: None,
                    resolved_at: None,
                };
                data.errors.push(entry.clone());
                Ok(LoggedError { entry, is_new })
            })
            .await?;

        if logged.is_new {
            self.notifier.notify(&logged.entry).await;
        }
        Ok(logged)
    }

    /// The most recent `limit` entries, newest first.
    pub async fn get_errors(
        &self,
        limit: usize,
        unresolved_only: bool,
    ) -> StoreResult<Vec<ErrorLogEntry>> {
        let data = self.doc.read().await?;
        Ok(data
            .errors
            .into_iter()
            .rev()
            .filter(|e| !unresolved_only || !e.resolved)
            .take(limit)
            .collect())
    }

    pub async fn get_error_by_id(&self, id: u64) -> StoreResult<Option<ErrorLogEntry>> {
        let data = self.doc.read().await?;
        Ok(data.errors.into_iter().find(|e| e.id == id))
    }

    /// Marks an entry resolved. Returns `false` when no entry has this ID.
    pub async fn mark_resolved(&self, id: u64, resolved_by: &str) -> StoreResult<bool> {
        let found = self
            .doc
            .update(|data| {
                let Some(entry) = data.errors.iter_mut().find(|e| e.id == id) else {
                    return Ok(false);
                };
                entry.resolved = true;
                entry.resolved_by = Some(resolved_by.to_string());
                entry.resolved_at = Some(Utc::now());
                Ok(true)
            })
            .await?;

        if found {
            info!(error_id = id, resolved_by = %resolved_by, "Error resolved");
        }
        Ok(found)
    }

    /// Removes every entry and resets the counters. Returns the number removed.
    pub async fn clear_all_errors(&self) -> StoreResult<usize> {
        let cleared = self
            .doc
            .update(|data| {
                let count = data.errors.len();
                data.errors.clear();
                data.stats = ErrorStats::default();
                Ok(count)
            })
            .await?;

        info!(cleared, "Error log cleared");
        Ok(cleared)
    }

    pub async fn get_stats(&self) -> StoreResult<ErrorStats> {
        let data = self.doc.read().await?;
        let unresolved = data.errors.iter().filter(|e| !e.resolved).count();
        Ok(ErrorStats {
            total_errors: data.stats.total_errors,
            last_error: data.stats.last_error,
            current_errors: data.errors.len(),
            unresolved_errors: unresolved,
            resolved_errors: data.errors.len() - unresolved,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Store, StoreConfig};
    use retail_core::ErrorKind;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingNotifier {
        seen: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl ErrorNotifier for RecordingNotifier {
        async fn notify(&self, entry: &ErrorLogEntry) {
            self.seen.lock().unwrap().push(entry.id);
        }
    }

    async fn open(dir: &TempDir) -> (ErrorLog, Arc<RecordingNotifier>) {
        let config = StoreConfig::new(
            dir.path().join("inventory.json"),
            dir.path().join("error_log.json"),
        )
        .retry_backoff(Duration::from_millis(1));
        let notifier = Arc::new(RecordingNotifier::default());
        let store = Store::open(config)
            .await
            .unwrap()
            .with_notifier(notifier.clone());
        (store.errors(), notifier)
    }

    fn boom() -> NewError {
        NewError::new(ErrorKind::SyncError, "boom", "engine")
    }

    #[tokio::test]
    async fn test_repeat_of_open_problem_is_logged_but_not_notified() {
        let dir = TempDir::new().unwrap();
        let (log, notifier) = open(&dir).await;

        let first = log.log_error(boom()).await.unwrap();
        let second = log.log_error(boom()).await.unwrap();
        assert!(first.is_new);
        assert!(!second.is_new);
        assert_eq!(second.entry.id, 2);
        assert_eq!(*notifier.seen.lock().unwrap(), vec![1]);

        assert_eq!(log.get_stats().await.unwrap().current_errors, 2);
    }

    #[tokio::test]
    async fn test_resolved_problem_notifies_again() {
        let dir = TempDir::new().unwrap();
        let (log, notifier) = open(&dir).await;

        log.log_error(boom()).await.unwrap();
        assert!(log.mark_resolved(1, "ops").await.unwrap());
        let again = log.log_error(boom()).await.unwrap();
        assert!(again.is_new);
        assert_eq!(*notifier.seen.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_different_source_is_a_new_problem() {
        let dir = TempDir::new().unwrap();
        let (log, _) = open(&dir).await;

        log.log_error(boom()).await.unwrap();
        let other = log
            .log_error(NewError::new(ErrorKind::SyncError, "boom", "scheduler"))
            .await
            .unwrap();
        assert!(other.is_new);
    }

    #[tokio::test]
    async fn test_get_errors_newest_first_with_filter() {
        let dir = TempDir::new().unwrap();
        let (log, _) = open(&dir).await;

        for i in 0..4 {
            log.log_error(NewError::new(ErrorKind::SyncError, format!("e{}", i), "engine"))
                .await
                .unwrap();
        }
        log.mark_resolved(4, "ops").await.unwrap();

        let recent = log.get_errors(2, false).await.unwrap();
        assert_eq!(recent.iter().map(|e| e.id).collect::<Vec<_>>(), vec![4, 3]);

        let open_only = log.get_errors(10, true).await.unwrap();
        assert_eq!(open_only.iter().map(|e| e.id).collect::<Vec<_>>(), vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_resolve_and_stats() {
        let dir = TempDir::new().unwrap();
        let (log, _) = open(&dir).await;

        log.log_error(boom()).await.unwrap();
        log.log_error(NewError::new(ErrorKind::AuthError, "login", "erp"))
            .await
            .unwrap();
        assert!(!log.mark_resolved(99, "ops").await.unwrap());
        assert!(log.mark_resolved(2, "ops").await.unwrap());

        let entry = log.get_error_by_id(2).await.unwrap().unwrap();
        assert!(entry.resolved);
        assert_eq!(entry.resolved_by.as_deref(), Some("ops"));
        assert!(entry.resolved_at.is_some());

        let stats = log.get_stats().await.unwrap();
        assert_eq!(stats.total_errors, 2);
        assert_eq!(stats.unresolved_errors, 1);
        assert_eq!(stats.resolved_errors, 1);
    }

    #[tokio::test]
    async fn test_clear_all_errors_resets_ids() {
        let dir = TempDir::new().unwrap();
        let (log, _) = open(&dir).await;

        log.log_error(boom()).await.unwrap();
        log.log_error(boom()).await.unwrap();
        assert_eq!(log.clear_all_errors().await.unwrap(), 2);

        let next = log.log_error(boom()).await.unwrap();
        assert_eq!(next.entry.id, 1);
        assert!(next.is_new);
    }

    #[tokio::test]
    async fn test_log_written_by_older_release_still_accepts_errors() {
        let dir = TempDir::new().unwrap();
        let older = serde_json::json!({
            "errors": [{
                "id": 1,
                "timestamp": "2025-03-01T10:00:00.123456",
                "error_type": "cycle_inventory_error",
                "message": "Import rejected",
                "source": "cycle_inventory",
                "user": "system",
                "details": {},
                "resolved": true,
                "resolved_by": "alice",
                "resolved_at": "2025-03-01T11:00:00.5"
            }],
            "stats": {"total_errors": 1, "last_error": "2025-03-01T10:00:00.123456"}
        });
        tokio::fs::write(dir.path().join("error_log.json"), older.to_string())
            .await
            .unwrap();

        let (log, notifier) = open(&dir).await;
        let logged = log.log_error(boom()).await.unwrap();
        assert!(logged.is_new);
        assert_eq!(logged.entry.id, 2);
        assert_eq!(*notifier.seen.lock().unwrap(), vec![2]);

        let errors = log.get_errors(10, false).await.unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[1].kind, ErrorKind::CycleInventoryError);
        assert!(errors[1].resolved_at.is_some());
    }
}
