//! # Domain Types
//!
//! Core domain types used throughout Retail Sync.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   TrackedSku    │   │   SyncConfig    │   │ AuditLogEntry   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  sku (key)      │   │  method         │   │  id (monotonic) │       │
//! │  │  available_qty  │   │  intervals      │   │  action         │       │
//! │  │  part_number    │   │  last_sync_run  │   │  sku / user     │       │
//! │  │  is_serialized  │   │  last_check_run │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ ErrorLogEntry   │   │ SalesCheckReport│   │    Failure      │       │
//! │  │  ─────────────  │   │ SyncReport      │   │  ─────────────  │       │
//! │  │  kind / source  │   │ SkuLookup       │   │  kind + error   │       │
//! │  │  resolved       │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Field names of persisted types keep the on-disk names used by existing
//! `inventory.json` / `error_log.json` files (`sn_flag`, `part_num`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::reconcile::{
    lenient_bool, lenient_i64, lenient_string, lenient_timestamp, lenient_timestamp_opt,
};

// =============================================================================
// Inventory Method
// =============================================================================

/// How the sync engine treats locally tracked quantities.
///
/// ```text
/// MANUAL     sales check → tracked SKUs override ERP quantities → push
/// AUTOMATED  ERP quantities trusted as-is → push
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryMethod {
    /// Locally tracked quantities are authoritative.
    #[default]
    Manual,
    /// ERP-reported data is authoritative.
    Automated,
}

impl std::fmt::Display for InventoryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InventoryMethod::Manual => write!(f, "manual"),
            InventoryMethod::Automated => write!(f, "automated"),
        }
    }
}

impl std::str::FromStr for InventoryMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "manual" => Ok(InventoryMethod::Manual),
            "automated" => Ok(InventoryMethod::Automated),
            _ => Err(ValidationError::NotAllowed {
                field: "inventory_method".to_string(),
                allowed: vec!["manual".to_string(), "automated".to_string()],
            }),
        }
    }
}

// =============================================================================
// Tracked SKU
// =============================================================================

/// A SKU whose retail quantity is tracked locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedSku {
    /// Stock Keeping Unit - the store key.
    #[serde(default)]
    pub sku: String,

    /// Display name.
    pub product_name: String,

    /// Quantity currently available for sale. May go negative (oversold).
    pub available_qty: i64,

    /// Quantity set by the last manual add/edit.
    pub initial_qty: i64,

    /// When the record was last touched, by a human or the sales check.
    #[serde(deserialize_with = "lenient_timestamp")]
    pub last_modified: DateTime<Utc>,

    /// Who touched it last (`auto-sync` for sales-check decrements).
    pub modified_by: String,

    #[serde(default)]
    pub notes: String,

    /// Whether the ERP part is tracked per serial number.
    #[serde(rename = "sn_flag", default)]
    pub is_serialized: bool,

    /// ERP part number this SKU maps to.
    #[serde(rename = "part_num", default)]
    pub part_number: String,

    /// Orders counted against this SKU since the last manual edit.
    #[serde(default)]
    pub orders_processed: i64,
}

/// Input for adding a tracked SKU.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSku {
    pub sku: String,
    pub product_name: String,
    pub available_qty: i64,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub is_serialized: bool,
    #[serde(default)]
    pub part_number: String,
}

impl NewSku {
    /// Builds the stored record for this input.
    pub fn into_tracked(self, modified_by: &str, now: DateTime<Utc>) -> TrackedSku {
        TrackedSku {
            sku: self.sku,
            product_name: self.product_name,
            available_qty: self.available_qty,
            initial_qty: self.available_qty,
            last_modified: now,
            modified_by: modified_by.to_string(),
            notes: self.notes,
            is_serialized: self.is_serialized,
            part_number: self.part_number,
            orders_processed: 0,
        }
    }
}

/// Manual edit of a tracked SKU. Only these three fields are editable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkuUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_qty: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TrackedSku {
    /// Applies a manual edit.
    ///
    /// A manual edit restarts order counting: `orders_processed` goes back to
    /// zero and a new quantity becomes the new `initial_qty`.
    pub fn apply_update(&mut self, update: &SkuUpdate, modified_by: &str, now: DateTime<Utc>) {
        if let Some(name) = &update.product_name {
            self.product_name = name.clone();
        }
        if let Some(qty) = update.available_qty {
            self.available_qty = qty;
            self.initial_qty = qty;
        }
        if let Some(notes) = &update.notes {
            self.notes = notes.clone();
        }
        self.orders_processed = 0;
        self.last_modified = now;
        self.modified_by = modified_by.to_string();
    }

    /// Applies a sales-check decrement. No floor is applied.
    pub fn apply_decrement(&mut self, qty: i64, order_count: i64, now: DateTime<Utc>) {
        self.available_qty -= qty;
        self.orders_processed += order_count;
        self.last_modified = now;
        self.modified_by = crate::AUTO_SYNC_USER.to_string();
    }
}

// =============================================================================
// Sync Config (runtime, persisted with the inventory)
// =============================================================================

/// Process-wide runtime sync settings, stored alongside the tracked SKUs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub inventory_method: InventoryMethod,

    #[serde(default = "default_sync_interval")]
    pub sync_interval_minutes: u32,

    #[serde(default = "default_sales_interval")]
    pub sales_interval_minutes: u32,

    #[serde(default)]
    pub auto_sync_enabled: bool,

    #[serde(default, deserialize_with = "lenient_timestamp_opt")]
    pub last_sync_run: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "lenient_timestamp_opt")]
    pub last_check_run: Option<DateTime<Utc>>,
}

fn default_sync_interval() -> u32 {
    5
}

fn default_sales_interval() -> u32 {
    180
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            inventory_method: InventoryMethod::default(),
            sync_interval_minutes: default_sync_interval(),
            sales_interval_minutes: default_sales_interval(),
            auto_sync_enabled: false,
            last_sync_run: None,
            last_check_run: None,
        }
    }
}

/// Partial update of [`SyncConfig`]. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory_method: Option<InventoryMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_interval_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales_interval_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_sync_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_run: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_check_run: Option<DateTime<Utc>>,
}

impl ConfigUpdate {
    /// Update that only stamps `last_sync_run`.
    pub fn last_sync_run(at: DateTime<Utc>) -> Self {
        ConfigUpdate {
            last_sync_run: Some(at),
            ..Default::default()
        }
    }

    /// Update that only stamps `last_check_run`.
    pub fn last_check_run(at: DateTime<Utc>) -> Self {
        ConfigUpdate {
            last_check_run: Some(at),
            ..Default::default()
        }
    }
}

impl SyncConfig {
    /// Merges a partial update into this config.
    pub fn apply(&mut self, update: &ConfigUpdate) {
        if let Some(method) = update.inventory_method {
            self.inventory_method = method;
        }
        if let Some(minutes) = update.sync_interval_minutes {
            self.sync_interval_minutes = minutes;
        }
        if let Some(minutes) = update.sales_interval_minutes {
            self.sales_interval_minutes = minutes;
        }
        if let Some(enabled) = update.auto_sync_enabled {
            self.auto_sync_enabled = enabled;
        }
        if let Some(at) = update.last_sync_run {
            self.last_sync_run = Some(at);
        }
        if let Some(at) = update.last_check_run {
            self.last_check_run = Some(at);
        }
    }
}

// =============================================================================
// Audit Log
// =============================================================================

/// Manual inventory actions recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Add,
    Update,
    Delete,
}

/// One audit log entry. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: u64,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub sku: String,
    pub user: String,
    /// Record snapshot (add/delete) or the applied update (update).
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Counters kept next to the audit log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditLogStats {
    pub total_logs: u64,
    #[serde(default, deserialize_with = "lenient_timestamp_opt")]
    pub last_log: Option<DateTime<Utc>>,
    /// Entries currently retained (not persisted, filled on read).
    #[serde(default, skip_deserializing)]
    pub current_logs: usize,
}

// =============================================================================
// Error Log
// =============================================================================

/// Error taxonomy recorded in the error log.
///
/// `AuthError` and `CallFailure` describe the ERP-level cause; the others name
/// the operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// ERP login failed after all retries.
    AuthError,
    /// ERP answered with a non-OK reason.
    CallFailure,
    CycleDataError,
    SalesCheckError,
    AutomatedSyncError,
    ManualSyncError,
    FishbowlApiError,
    FishbowlQueryError,
    SyncError,
    SchedulerError,
    /// Written by earlier releases; kept so their logs still load.
    CycleInventoryError,
    MatrixCreationError,
    CsvExportError,
    ApiError,
    /// Any kind this release does not know.
    #[serde(other)]
    Other,
}

impl ErrorKind {
    /// Wire name, as stored in the error log.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::AuthError => "auth_error",
            ErrorKind::CallFailure => "call_failure",
            ErrorKind::CycleDataError => "cycle_data_error",
            ErrorKind::SalesCheckError => "sales_check_error",
            ErrorKind::AutomatedSyncError => "automated_sync_error",
            ErrorKind::ManualSyncError => "manual_sync_error",
            ErrorKind::FishbowlApiError => "fishbowl_api_error",
            ErrorKind::FishbowlQueryError => "fishbowl_query_error",
            ErrorKind::SyncError => "sync_error",
            ErrorKind::SchedulerError => "scheduler_error",
            ErrorKind::CycleInventoryError => "cycle_inventory_error",
            ErrorKind::MatrixCreationError => "matrix_creation_error",
            ErrorKind::CsvExportError => "csv_export_error",
            ErrorKind::ApiError => "api_error",
            ErrorKind::Other => "other",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted error entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    pub id: u64,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "error_type")]
    pub kind: ErrorKind,
    pub message: String,
    pub source: String,
    pub user: String,
    #[serde(default)]
    pub details: serde_json::Value,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_timestamp_opt"
    )]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ErrorLogEntry {
    /// True when `other` describes the same unresolved problem.
    pub fn same_problem(&self, kind: ErrorKind, message: &str, source: &str) -> bool {
        !self.resolved && self.kind == kind && self.message == message && self.source == source
    }
}

/// Input for a new error log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct NewError {
    pub kind: ErrorKind,
    pub message: String,
    pub source: String,
    pub details: serde_json::Value,
    pub user: String,
}

impl NewError {
    /// Creates an error attributed to the `system` user with no details.
    pub fn new(kind: ErrorKind, message: impl Into<String>, source: impl Into<String>) -> Self {
        NewError {
            kind,
            message: message.into(),
            source: source.into(),
            details: serde_json::Value::Object(Default::default()),
            user: "system".to_string(),
        }
    }

    /// Attaches structured details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    /// Attributes the error to a user.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }
}

/// Error log counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorStats {
    pub total_errors: u64,
    #[serde(default, deserialize_with = "lenient_timestamp_opt")]
    pub last_error: Option<DateTime<Utc>>,
    #[serde(default)]
    pub current_errors: usize,
    #[serde(default)]
    pub unresolved_errors: usize,
    #[serde(default)]
    pub resolved_errors: usize,
}

// =============================================================================
// ERP Order Summary
// =============================================================================

/// Orders for one SKU inside a sales-check window, as the ERP groups them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderSummary {
    #[serde(deserialize_with = "lenient_string")]
    pub sku: String,
    #[serde(deserialize_with = "lenient_i64")]
    pub qty_sold: i64,
    #[serde(deserialize_with = "lenient_i64")]
    pub order_count: i64,
}

/// An active product and the part behind it, as the SKU lookup returns it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProductPart {
    #[serde(rename = "Sku", deserialize_with = "lenient_string")]
    pub sku: String,
    #[serde(rename = "PartNumber", deserialize_with = "lenient_string")]
    pub part_number: String,
    #[serde(rename = "SnFlag", default, deserialize_with = "lenient_bool")]
    pub is_serialized: bool,
}

// =============================================================================
// Command Results
// =============================================================================

/// Outcome of a sales check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesCheckReport {
    /// Orders seen in the window, tracked or not.
    pub orders_processed: i64,
    /// Tracked SKUs that were decremented.
    pub skus_updated: usize,
    pub message: String,
}

/// Outcome of a successful sync pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub method: InventoryMethod,
    #[serde(rename = "inventory_updated")]
    pub records_updated: usize,
    #[serde(rename = "sn_created")]
    pub serials_created: usize,
    pub duration_secs: f64,
    pub message: String,
}

/// Result of validating a SKU against the ERP.
///
/// `success = false` means the ERP could not be asked; `success = true,
/// validated_sku = false` is a clean "not found".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuLookup {
    pub success: bool,
    pub validated_sku: bool,
    pub is_serialized: Option<bool>,
    #[serde(rename = "part_num")]
    pub part_number: Option<String>,
    pub message: String,
}

impl SkuLookup {
    pub fn found(part_number: String, is_serialized: bool) -> Self {
        SkuLookup {
            success: true,
            validated_sku: true,
            is_serialized: Some(is_serialized),
            part_number: Some(part_number),
            message: "Found and validated the SKU.".to_string(),
        }
    }

    pub fn not_found(sku: &str) -> Self {
        SkuLookup {
            success: true,
            validated_sku: false,
            is_serialized: None,
            part_number: None,
            message: format!(
                "Did not find {} as an active part and product in Fishbowl. \
                 Ensure the SKU is an exact match for an active part/product.",
                sku
            ),
        }
    }

    pub fn failed(message: String) -> Self {
        SkuLookup {
            success: false,
            validated_sku: false,
            is_serialized: None,
            part_number: None,
            message,
        }
    }
}

/// A failure returned across the engine boundary after it was logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub error: String,
}

impl Failure {
    pub fn new(kind: ErrorKind, error: impl Into<String>) -> Self {
        Failure {
            kind,
            error: error.into(),
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.error)
    }
}

/// JSON shape handed to callers: `{"success": true, ...report}` or
/// `{"success": false, "error": "...", "kind": "..."}`.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResponse<T> {
    pub success: bool,
    #[serde(flatten)]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl<T> From<Result<T, Failure>> for CommandResponse<T> {
    fn from(result: Result<T, Failure>) -> Self {
        match result {
            Ok(data) => CommandResponse {
                success: true,
                data: Some(data),
                error: None,
                kind: None,
            },
            Err(failure) => CommandResponse {
                success: false,
                data: None,
                error: Some(failure.error),
                kind: Some(failure.kind),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracked(qty: i64) -> TrackedSku {
        NewSku {
            sku: "MUG-BLUE".into(),
            product_name: "Blue Mug".into(),
            available_qty: qty,
            ..Default::default()
        }
        .into_tracked("alice", Utc::now())
    }

    #[test]
    fn test_inventory_method_parsing() {
        assert_eq!("manual".parse::<InventoryMethod>().unwrap(), InventoryMethod::Manual);
        assert_eq!(" Automated ".parse::<InventoryMethod>().unwrap(), InventoryMethod::Automated);
        assert!("hybrid".parse::<InventoryMethod>().is_err());
    }

    #[test]
    fn test_new_sku_sets_initial_qty() {
        let sku = tracked(12);
        assert_eq!(sku.initial_qty, 12);
        assert_eq!(sku.orders_processed, 0);
        assert_eq!(sku.modified_by, "alice");
    }

    #[test]
    fn test_manual_edit_resets_order_count() {
        let mut sku = tracked(10);
        sku.apply_decrement(3, 2, Utc::now());
        assert_eq!(sku.orders_processed, 2);

        let update = SkuUpdate {
            available_qty: Some(20),
            ..Default::default()
        };
        sku.apply_update(&update, "bob", Utc::now());
        assert_eq!(sku.available_qty, 20);
        assert_eq!(sku.initial_qty, 20);
        assert_eq!(sku.orders_processed, 0);
        assert_eq!(sku.modified_by, "bob");
    }

    #[test]
    fn test_decrement_can_oversell() {
        let mut sku = tracked(1);
        sku.apply_decrement(4, 1, Utc::now());
        assert_eq!(sku.available_qty, -3);
        assert_eq!(sku.modified_by, crate::AUTO_SYNC_USER);
    }

    #[test]
    fn test_config_apply_partial() {
        let mut config = SyncConfig::default();
        config.apply(&ConfigUpdate {
            inventory_method: Some(InventoryMethod::Automated),
            sync_interval_minutes: Some(15),
            ..Default::default()
        });
        assert_eq!(config.inventory_method, InventoryMethod::Automated);
        assert_eq!(config.sync_interval_minutes, 15);
        assert_eq!(config.sales_interval_minutes, 180);
        assert!(config.last_sync_run.is_none());
    }

    #[test]
    fn test_order_summary_accepts_numeric_strings() {
        let row = serde_json::json!({"sku": "MUG-BLUE", "qty_sold": "3.0", "order_count": 2});
        let summary: OrderSummary = serde_json::from_value(row).unwrap();
        assert_eq!(summary.qty_sold, 3);
        assert_eq!(summary.order_count, 2);
    }

    #[test]
    fn test_product_part_from_erp_row() {
        let row = serde_json::json!({"Sku": "TENT-2P", "PartNumber": "P-100", "SnFlag": 1});
        let part: ProductPart = serde_json::from_value(row).unwrap();
        assert_eq!(part.part_number, "P-100");
        assert!(part.is_serialized);
    }

    #[test]
    fn test_command_response_shape() {
        let ok: CommandResponse<SalesCheckReport> = Ok(SalesCheckReport {
            orders_processed: 4,
            skus_updated: 1,
            message: "done".into(),
        })
        .into();
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["orders_processed"], 4);
        assert!(json.get("error").is_none());

        let err: CommandResponse<SalesCheckReport> =
            Err(Failure::new(ErrorKind::SalesCheckError, "ERP down")).into();
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "ERP down");
        assert_eq!(json["kind"], "sales_check_error");
    }

    #[test]
    fn test_error_entry_dedup_match() {
        let entry = ErrorLogEntry {
            id: 1,
            timestamp: Utc::now(),
            kind: ErrorKind::SyncError,
            message: "boom".into(),
            source: "engine".into(),
            user: "system".into(),
            details: serde_json::Value::Null,
            resolved: false,
            resolved_by: None,
            resolved_at: None,
        };
        assert!(entry.same_problem(ErrorKind::SyncError, "boom", "engine"));
        assert!(!entry.same_problem(ErrorKind::SyncError, "boom", "scheduler"));
    }

    #[test]
    fn test_error_kinds_from_older_logs_decode() {
        let legacy: ErrorKind = serde_json::from_str("\"cycle_inventory_error\"").unwrap();
        assert_eq!(legacy, ErrorKind::CycleInventoryError);
        assert_eq!(legacy.as_str(), "cycle_inventory_error");

        let unknown: ErrorKind = serde_json::from_str("\"disk_on_fire\"").unwrap();
        assert_eq!(unknown, ErrorKind::Other);
    }

    #[test]
    fn test_naive_timestamps_in_stored_records() {
        let row = serde_json::json!({
            "product_name": "Widget",
            "available_qty": 4,
            "initial_qty": 5,
            "last_modified": "2025-03-01T10:00:00.123456",
            "modified_by": "auto-sync"
        });
        let sku: TrackedSku = serde_json::from_value(row).unwrap();
        assert_eq!(
            sku.last_modified.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string(),
            "2025-03-01 10:00:00"
        );

        let config: SyncConfig =
            serde_json::from_value(serde_json::json!({"last_check_run": "2025-03-01T10:05:00.000001", "last_sync_run": null}))
                .unwrap();
        assert!(config.last_check_run.is_some());
        assert!(config.last_sync_run.is_none());
    }
}
