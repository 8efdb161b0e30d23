//! # retail-core: Pure Business Logic for Retail Sync
//!
//! This crate holds the reconciliation rules that decide what the ERP's
//! retail location should contain. Everything here is a pure function over
//! plain data: no files, no network, no clock-driven behavior.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Retail Sync Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Scheduler / service binary                         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ determine_sync / run_sales_check       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 retail-sync (engine + ERP client)               │   │
//! │  └──────────────┬──────────────────────────────────┬───────────────┘   │
//! │                 │                                  │                    │
//! │  ┌──────────────▼──────────────────┐  ┌───────────▼────────────────┐  │
//! │  │   ★ retail-core (THIS CRATE) ★  │  │  retail-store (JSON files) │  │
//! │  │                                 │  │  inventory, audit, errors  │  │
//! │  │  types  reconcile  batch        │  └────────────────────────────┘  │
//! │  │  validation  error              │                                   │
//! │  │                                 │                                   │
//! │  │  NO I/O • NO NETWORK • PURE     │                                   │
//! │  └─────────────────────────────────┘                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Tracked SKUs, runtime sync config, logs, command results
//! - [`reconcile`] - ERP cycle records and the QOH / cycle-out merge
//! - [`batch`] - Cycle-count import batch with serialized unit rows
//! - [`validation`] - Input rules for SKUs and config updates
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use std::collections::HashMap;
//! use retail_core::reconcile::{merge_cycle_data, CycleRecord};
//!
//! let qoh = vec![CycleRecord::new("A", 5, false)];
//! let cycle_out = vec![CycleRecord::new("B", 2, false)];
//!
//! let merged = merge_cycle_data(qoh, cycle_out, &HashMap::new());
//! assert_eq!(merged.len(), 2);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod batch;
pub mod error;
pub mod reconcile;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use batch::{build_import_batch, BatchRow, ImportBatch, IMPORT_HEADERS};
pub use error::{CoreError, CoreResult, ValidationError};
pub use reconcile::{merge_cycle_data, CycleRecord};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// User recorded on SKUs decremented by the sales check.
pub const AUTO_SYNC_USER: &str = "auto-sync";

/// Look-back window for the very first sales check, in minutes.
pub const DEFAULT_SALES_WINDOW_MINUTES: i64 = 60;

/// Lower bound for scheduler intervals (minutes).
pub const MIN_INTERVAL_MINUTES: u32 = 1;

/// Upper bound for scheduler intervals (minutes).
///
/// ## Business Reason
/// A three-hour ceiling keeps the sales-check window small enough that a
/// single ERP order query stays cheap.
pub const MAX_INTERVAL_MINUTES: u32 = 180;

/// Name of the retail location inside the company's ERP location tree.
pub const RETAIL_LOCATION_NAME: &str = "Main-Retail Website Inventory";
