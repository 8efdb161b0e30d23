//! # Store Handle
//!
//! Opens both documents and hands out repositories.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  StoreConfig::new(data_file, error_log_file) ← paths + retry policy   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Store::open(config).await ← create / repair both files                │
//! │       │                                                                 │
//! │       ├── store.inventory()  → InventoryStore (clone, shares the lock)  │
//! │       └── store.errors()     → ErrorLog       (clone, shares the lock)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use retail_core::SyncConfig;
use tracing::info;

use crate::document::JsonDocument;
use crate::error::StoreResult;
use crate::repository::errors::{ErrorLog, ErrorLogData, ErrorNotifier, TracingNotifier};
use crate::repository::inventory::{InventoryData, InventoryStore};

// =============================================================================
// Configuration
// =============================================================================

/// Store configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = StoreConfig::new("data/inventory.json", "data/error_log.json")
///     .max_retries(3)
///     .retry_backoff(Duration::from_millis(50));
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Inventory document (SKUs, runtime config, audit log).
    pub data_file: PathBuf,

    /// Error log document.
    pub error_log_file: PathBuf,

    /// Attempts per read or write.
    /// Default: 5
    pub max_retries: u32,

    /// Pause between attempts.
    /// Default: 100 ms
    pub retry_backoff: Duration,

    /// Runtime config written into a freshly created inventory document.
    pub initial_config: SyncConfig,
}

impl StoreConfig {
    pub fn new(data_file: impl Into<PathBuf>, error_log_file: impl Into<PathBuf>) -> Self {
        StoreConfig {
            data_file: data_file.into(),
            error_log_file: error_log_file.into(),
            max_retries: 5,
            retry_backoff: Duration::from_millis(100),
            initial_config: SyncConfig::default(),
        }
    }

    pub fn max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Sets the config seeded into a new inventory document.
    pub fn initial_config(mut self, config: SyncConfig) -> Self {
        self.initial_config = config;
        self
    }
}

// =============================================================================
// Store
// =============================================================================

/// Handle to both documents. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    inventory: Arc<JsonDocument<InventoryData>>,
    errors: Arc<JsonDocument<ErrorLogData>>,
    notifier: Arc<dyn ErrorNotifier>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("data_file", &self.inventory.path())
            .field("error_log_file", &self.errors.path())
            .finish()
    }
}

impl Store {
    /// Opens (and if needed creates) both documents.
    pub async fn open(config: StoreConfig) -> StoreResult<Self> {
        info!(
            data_file = %config.data_file.display(),
            error_log_file = %config.error_log_file.display(),
            "Opening store"
        );

        let inventory = JsonDocument::open(
            config.data_file.clone(),
            InventoryData::with_config(config.initial_config.clone()),
            config.max_retries,
            config.retry_backoff,
        )
        .await?;

        let errors = JsonDocument::open(
            config.error_log_file.clone(),
            ErrorLogData::default(),
            config.max_retries,
            config.retry_backoff,
        )
        .await?;

        Ok(Store {
            inventory: Arc::new(inventory),
            errors: Arc::new(errors),
            notifier: Arc::new(TracingNotifier),
        })
    }

    /// Replaces the notifier used for new errors.
    pub fn with_notifier(mut self, notifier: Arc<dyn ErrorNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Returns the inventory repository.
    pub fn inventory(&self) -> InventoryStore {
        InventoryStore::new(Arc::clone(&self.inventory))
    }

    /// Returns the error log repository.
    pub fn errors(&self) -> ErrorLog {
        ErrorLog::new(Arc::clone(&self.errors), Arc::clone(&self.notifier))
    }
}
