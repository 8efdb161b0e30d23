//! # Sync Engine
//!
//! The one object that talks to both the ERP and the store. Every public
//! operation returns `Result<_, Failure>`: failures are written to the error
//! log here and never travel further as `SyncError`.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  run_sales_check()   sales.rs   decrement tracked SKUs from new orders │
//! │  get_cycle_data()    cycle.rs   ERP queries + merge                    │
//! │  determine_sync()    mod.rs     full pass for the configured method    │
//! │  get_sku_info()      lookup.rs  validate a SKU against the ERP         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Exclusive Regions
//! - `sales_check_lock`: one sales check at a time, process-wide
//! - `sync_lock`: one sync pass at a time (a manual pass takes the sales
//!   check lock inside it)

mod cycle;
mod lookup;
mod sales;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use chrono::Utc;
use retail_core::{
    build_import_batch, ConfigUpdate, CycleRecord, ErrorKind, Failure, ImportBatch,
    InventoryMethod, NewError, SyncReport, IMPORT_HEADERS,
};
use retail_store::Store;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::erp::{ErpConnector, FishbowlConnector, QuerySet};
use crate::error::{SyncError, SyncResult};

// =============================================================================
// Engine State
// =============================================================================

/// What the engine is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    #[default]
    Idle,
    /// A sync pass for this method is in progress.
    Running(InventoryMethod),
}

/// Marks the engine running until dropped.
struct RunningGuard<'a> {
    state: &'a RwLock<EngineState>,
}

impl<'a> RunningGuard<'a> {
    fn enter(state: &'a RwLock<EngineState>, method: InventoryMethod) -> Self {
        set_state(state, EngineState::Running(method));
        RunningGuard { state }
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        set_state(self.state, EngineState::Idle);
    }
}

fn set_state(state: &RwLock<EngineState>, value: EngineState) {
    match state.write() {
        Ok(mut guard) => *guard = value,
        Err(poisoned) => *poisoned.into_inner() = value,
    }
}

// =============================================================================
// Sync Engine
// =============================================================================

/// Sales check, cycle-count sync and SKU lookup against one ERP and store.
pub struct SyncEngine {
    erp: Arc<dyn ErpConnector>,
    store: Store,
    queries: QuerySet,
    company: String,
    state: RwLock<EngineState>,
    sales_check_lock: Mutex<()>,
    sync_lock: Mutex<()>,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("company", &self.company)
            .field("store", &self.store)
            .field("state", &self.state())
            .finish()
    }
}

impl SyncEngine {
    pub fn new(
        erp: Arc<dyn ErpConnector>,
        store: Store,
        queries: QuerySet,
        company: impl Into<String>,
    ) -> Self {
        SyncEngine {
            erp,
            store,
            queries,
            company: company.into(),
            state: RwLock::new(EngineState::Idle),
            sales_check_lock: Mutex::new(()),
            sync_lock: Mutex::new(()),
        }
    }

    /// Engine talking to Fishbowl as configured.
    pub fn from_config(config: &ServiceConfig, store: Store) -> SyncResult<Self> {
        let connector = FishbowlConnector::new(&config.erp)?;
        let queries = QuerySet::from_config(config)?;
        info!(
            base_url = %connector.base_url(),
            company = %config.company.name,
            "Sync engine configured"
        );
        Ok(Self::new(
            Arc::new(connector),
            store,
            queries,
            config.company.name.clone(),
        ))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn state(&self) -> EngineState {
        match self.state.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Writes an error log entry and returns the matching failure.
    pub(crate) async fn fail(
        &self,
        kind: ErrorKind,
        message: String,
        source: &str,
        details: serde_json::Value,
    ) -> Failure {
        let entry = NewError::new(kind, message.clone(), source).with_details(details);
        if let Err(e) = self.store.errors().log_error(entry).await {
            error!(error = %e, kind = %kind, "Failed to write error log entry");
        }
        Failure::new(kind, message)
    }

    // =========================================================================
    // Sync Pass
    // =========================================================================

    /// Runs one sync pass for the configured inventory method.
    pub async fn determine_sync(&self) -> Result<SyncReport, Failure> {
        let _pass = self.sync_lock.lock().await;
        let span = info_span!("sync_pass", run_id = %Uuid::new_v4());
        self.sync_pass().instrument(span).await
    }

    async fn sync_pass(&self) -> Result<SyncReport, Failure> {
        let config = match self.store.inventory().get_config().await {
            Ok(config) => config,
            Err(e) => {
                return Err(self
                    .fail(
                        ErrorKind::SyncError,
                        format!("Failed to read sync config: {}", e),
                        "determine_sync",
                        json!({}),
                    )
                    .await);
            }
        };

        let method = config.inventory_method;
        let _running = RunningGuard::enter(&self.state, method);
        let started = Instant::now();
        info!(method = %method, "Sync pass started");

        let result = match method {
            InventoryMethod::Manual => self.manual_sync().await,
            InventoryMethod::Automated => self.sync_records(HashMap::new()).await,
        };

        match result {
            Ok((records_updated, batch)) => {
                let duration_secs = started.elapsed().as_secs_f64();
                let serials_created = batch.matrix_len() - records_updated - 1;
                let message = match method {
                    InventoryMethod::Manual => format!(
                        "Ran a Sales Check then updated {} inventory records and {} serial numbers in {:.2} seconds!",
                        records_updated, serials_created, duration_secs
                    ),
                    InventoryMethod::Automated => format!(
                        "Updated {} inventory records and {} serial numbers in {:.2} seconds!",
                        records_updated, serials_created, duration_secs
                    ),
                };
                info!(
                    method = %method,
                    records_updated,
                    serials_created,
                    duration_secs,
                    "Sync pass complete"
                );
                Ok(SyncReport {
                    method,
                    records_updated,
                    serials_created,
                    duration_secs,
                    message,
                })
            }
            Err(e) => {
                let kind = match method {
                    InventoryMethod::Manual
                        if e.is_erp_failure() || matches!(e, SyncError::SalesCheckFailed(_)) =>
                    {
                        ErrorKind::FishbowlApiError
                    }
                    InventoryMethod::Manual => ErrorKind::ManualSyncError,
                    InventoryMethod::Automated => ErrorKind::AutomatedSyncError,
                };
                Err(self
                    .fail(kind, e.to_string(), "determine_sync", error_details(&e, method))
                    .await)
            }
        }
    }

    async fn manual_sync(&self) -> SyncResult<(usize, ImportBatch)> {
        self.run_sales_check()
            .await
            .map_err(|failure| SyncError::SalesCheckFailed(failure.error))?;
        let overrides = self.manual_overrides().await?;
        self.sync_records(overrides).await
    }

    /// Merge, build, push, then stamp `last_sync_run`.
    async fn sync_records(
        &self,
        overrides: HashMap<String, CycleRecord>,
    ) -> SyncResult<(usize, ImportBatch)> {
        let records = self.collect_cycle_data(&overrides).await?;
        let batch = build_import_batch(&IMPORT_HEADERS[..], &records)?;
        self.push(&batch).await?;

        self.store
            .inventory()
            .update_config(&ConfigUpdate::last_sync_run(Utc::now()))
            .await?;
        Ok((records.len(), batch))
    }
}

/// Structured details stored with an error log entry.
pub(crate) fn error_details(err: &SyncError, method: InventoryMethod) -> serde_json::Value {
    json!({
        "method": method,
        "cause": err.cause_kind(),
        "retryable": err.is_retryable(),
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use retail_core::NewSku;
    use retail_store::{Store, StoreConfig};
    use tempfile::TempDir;

    use super::SyncEngine;
    use crate::erp::fake::FakeErp;
    use crate::erp::QuerySet;

    pub(crate) const COMPANY: &str = "Acme";

    pub(crate) fn queries() -> QuerySet {
        QuerySet::standard(COMPANY, vec![95, 25])
    }

    pub(crate) async fn engine(dir: &TempDir, erp: &FakeErp) -> SyncEngine {
        let config = StoreConfig::new(
            dir.path().join("inventory.json"),
            dir.path().join("error_log.json"),
        )
        .retry_backoff(Duration::from_millis(1));
        let store = Store::open(config).await.unwrap();
        SyncEngine::new(Arc::new(erp.clone()), store, queries(), COMPANY)
    }

    pub(crate) fn new_sku(sku: &str, part: &str, qty: i64, serialized: bool) -> NewSku {
        NewSku {
            sku: sku.into(),
            product_name: format!("{} product", sku),
            available_qty: qty,
            notes: String::new(),
            is_serialized: serialized,
            part_number: part.into(),
        }
    }
}
