//! # retail-sync: ERP Client, Sync Engine and Scheduler
//!
//! Keeps the ERP's retail location in line with what the storefront can
//! actually sell.
//!
//! ## Sync Pass
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          determine_sync()                               │
//! │                                                                         │
//! │   inventory_method?                                                     │
//! │       │                                                                 │
//! │       ├── MANUAL ──► run_sales_check() ──► overrides from tracked SKUs  │
//! │       │                                         │                       │
//! │       └── AUTOMATED ────────────────────────────┤                       │
//! │                                                 ▼                       │
//! │                         ERP: cycle-out query, QOH query                 │
//! │                                                 │                       │
//! │                                  merge_cycle_data (retail-core)         │
//! │                                                 │                       │
//! │                                  build_import_batch (retail-core)       │
//! │                                                 │                       │
//! │                         ERP: Cycle-Count-Data import                    │
//! │                                                 │                       │
//! │                                  last_sync_run = now                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`engine`] - `SyncEngine`: sales check, cycle data, sync, SKU lookup
//! - [`erp`] - ERP connector/session traits and the Fishbowl client
//! - [`scheduler`] - Interval jobs driving the engine
//! - [`config`] - Service configuration (TOML + environment)
//! - [`error`] - `SyncError`

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod engine;
pub mod erp;
pub mod error;
pub mod scheduler;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::ServiceConfig;
pub use engine::{EngineState, SyncEngine};
pub use erp::{ErpConnector, ErpSession, FishbowlConnector, QueryResponse, QuerySet};
pub use error::{SyncError, SyncResult};
pub use scheduler::{ConfigChange, JobInfo, JobKind, Scheduler, SchedulerHandle};
