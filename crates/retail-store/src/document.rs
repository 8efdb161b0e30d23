//! # JSON Document
//!
//! One JSON file holding one serde type, shared by every task in the process.
//!
//! ## Access Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        JsonDocument<T>                                  │
//! │                                                                         │
//! │  read()            update(|doc| ...)                                   │
//! │    │                  │                                                 │
//! │    ▼                  ▼                                                 │
//! │  ┌────────────────────────────────────┐                                │
//! │  │  tokio Mutex (one holder at a time) │                               │
//! │  └────────────────────────────────────┘                                │
//! │    │                  │                                                 │
//! │    │                  ├── read file (retry)                             │
//! │    │                  ├── apply closure                                 │
//! │    │                  └── write file.tmp → rename (retry)               │
//! │    ▼                                                                    │
//! │  read file (retry)                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The lock is held across the whole read-modify-write, so two concurrent
//! updates never lose each other's changes.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};

/// A JSON file with locked, retried access.
#[derive(Debug)]
pub struct JsonDocument<T> {
    path: PathBuf,
    lock: Mutex<()>,
    max_retries: u32,
    retry_backoff: Duration,
    /// Content written when the file is missing, empty or unreadable JSON.
    initial: T,
}

impl<T> JsonDocument<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    /// Opens the document, creating the file from `initial` if it is missing,
    /// empty, or not valid JSON.
    pub async fn open(
        path: impl Into<PathBuf>,
        initial: T,
        max_retries: u32,
        retry_backoff: Duration,
    ) -> StoreResult<Self> {
        let doc = JsonDocument {
            path: path.into(),
            lock: Mutex::new(()),
            max_retries: max_retries.max(1),
            retry_backoff,
            initial,
        };
        doc.ensure_exists().await?;
        Ok(doc)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the current document.
    pub async fn read(&self) -> StoreResult<T> {
        let _guard = self.lock.lock().await;
        self.read_inner().await
    }

    /// Read-modify-write under the document lock.
    ///
    /// The document is written only when `f` returns `Ok`.
    pub async fn update<R, F>(&self, f: F) -> StoreResult<R>
    where
        F: FnOnce(&mut T) -> StoreResult<R>,
    {
        let _guard = self.lock.lock().await;
        let mut doc = self.read_inner().await?;
        let result = f(&mut doc)?;
        self.write_inner(&doc).await?;
        Ok(result)
    }

    // =========================================================================
    // File Access
    // =========================================================================

    async fn ensure_exists(&self) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::io(parent, e))?;
            }
        }

        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if !content.trim().is_empty() => {
                if serde_json::from_str::<serde_json::Value>(&content).is_ok() {
                    return Ok(());
                }
                warn!(path = %self.path.display(), "Document is not valid JSON, recreating");
            }
            Ok(_) => {
                debug!(path = %self.path.display(), "Document is empty, initializing");
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Creating document");
            }
            Err(e) => return Err(StoreError::io(&self.path, e)),
        }

        let _guard = self.lock.lock().await;
        self.write_inner(&self.initial).await
    }

    async fn read_inner(&self) -> StoreResult<T> {
        let mut last_error = String::new();

        for attempt in 1..=self.max_retries {
            match tokio::fs::read_to_string(&self.path).await {
                Ok(content) => match serde_json::from_str::<T>(&content) {
                    Ok(doc) => return Ok(doc),
                    Err(e) => last_error = e.to_string(),
                },
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!(path = %self.path.display(), "Document disappeared, recreating");
                    let doc = self.initial.clone();
                    self.write_inner(&doc).await?;
                    return Ok(doc);
                }
                Err(e) => last_error = e.to_string(),
            }

            if attempt < self.max_retries {
                debug!(
                    path = %self.path.display(),
                    attempt,
                    error = %last_error,
                    "Document read failed, retrying"
                );
                tokio::time::sleep(self.retry_backoff).await;
            }
        }

        Err(StoreError::RetriesExhausted {
            operation: "read",
            path: self.path.display().to_string(),
            attempts: self.max_retries,
            last_error,
        })
    }

    async fn write_inner(&self, doc: &T) -> StoreResult<()> {
        let content = serde_json::to_string_pretty(doc)?;
        let temp = temp_path(&self.path);
        let mut last_error = String::new();

        for attempt in 1..=self.max_retries {
            let written = match tokio::fs::write(&temp, content.as_bytes()).await {
                Ok(()) => tokio::fs::rename(&temp, &self.path).await,
                Err(e) => Err(e),
            };

            match written {
                Ok(()) => return Ok(()),
                Err(e) => last_error = e.to_string(),
            }

            if attempt < self.max_retries {
                debug!(
                    path = %self.path.display(),
                    attempt,
                    error = %last_error,
                    "Document write failed, retrying"
                );
                tokio::time::sleep(self.retry_backoff).await;
            }
        }

        Err(StoreError::RetriesExhausted {
            operation: "write",
            path: self.path.display().to_string(),
            attempts: self.max_retries,
            last_error,
        })
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Counter {
        value: u64,
    }

    async fn open(dir: &TempDir) -> JsonDocument<Counter> {
        JsonDocument::open(
            dir.path().join("counter.json"),
            Counter::default(),
            3,
            Duration::from_millis(1),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_creates_missing_file() {
        let dir = TempDir::new().unwrap();
        let doc = open(&dir).await;
        assert!(doc.path().exists());
        assert_eq!(doc.read().await.unwrap(), Counter::default());
    }

    #[tokio::test]
    async fn test_recreates_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("counter.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let doc = open(&dir).await;
        assert_eq!(doc.read().await.unwrap(), Counter::default());
    }

    #[tokio::test]
    async fn test_keeps_existing_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("counter.json");
        tokio::fs::write(&path, r#"{"value": 7}"#).await.unwrap();

        let doc = open(&dir).await;
        assert_eq!(doc.read().await.unwrap().value, 7);
    }

    #[tokio::test]
    async fn test_failed_update_does_not_write() {
        let dir = TempDir::new().unwrap();
        let doc = open(&dir).await;

        let result: StoreResult<()> = doc
            .update(|c| {
                c.value = 99;
                Err(StoreError::not_found("Counter", "x"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(doc.read().await.unwrap().value, 0);
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let doc = Arc::new(open(&dir).await);

        let mut handles = Vec::new();
        for _ in 0..20 {
            let doc = Arc::clone(&doc);
            handles.push(tokio::spawn(async move {
                doc.update(|c| {
                    c.value += 1;
                    Ok(())
                })
                .await
                .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(doc.read().await.unwrap().value, 20);
    }

    #[tokio::test]
    async fn test_unparseable_document_exhausts_retries() {
        let dir = TempDir::new().unwrap();
        let doc = open(&dir).await;
        tokio::fs::write(doc.path(), r#"{"value": "seven"}"#).await.unwrap();

        let err = doc.read().await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::RetriesExhausted { operation: "read", attempts: 3, .. }
        ));
    }
}
