//! # retail-store: File Persistence for Retail Sync
//!
//! This crate keeps the sync service's state in two JSON files: the
//! inventory document (tracked SKUs, runtime config, audit log) and the
//! error log.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Retail Sync Data Flow                            │
//! │                                                                         │
//! │  SyncEngine / Scheduler / service binary                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   retail-store (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │    Store      │    │  Repositories  │    │ JsonDocument │  │   │
//! │  │   │  (store.rs)   │    │                │    │ (document.rs)│  │   │
//! │  │   │               │    │ InventoryStore │    │              │  │   │
//! │  │   │ StoreConfig   │───►│ ErrorLog       │───►│ lock, retry, │  │   │
//! │  │   │ open()        │    │                │    │ temp+rename  │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │   inventory.json                error_log.json                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - Store handle and configuration
//! - [`document`] - Locked, retried JSON file access
//! - [`repository`] - Inventory and error log operations
//! - [`error`] - Store error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use retail_store::{Store, StoreConfig};
//!
//! let store = Store::open(StoreConfig::new("inventory.json", "error_log.json")).await?;
//!
//! let skus = store.inventory().get_all_skus().await?;
//! let stats = store.errors().get_stats().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod document;
pub mod error;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use document::JsonDocument;
pub use error::{StoreError, StoreResult};
pub use store::{Store, StoreConfig};

pub use repository::errors::{ErrorLog, ErrorLogData, ErrorNotifier, LoggedError, TracingNotifier};
pub use repository::inventory::{InventoryData, InventoryStore};
