//! # Inventory Repository
//!
//! Tracked SKUs, the runtime sync config and the audit log, all in one
//! document.
//!
//! ## Document Layout
//! ```text
//! {
//!   "skus":            { "<SKU>": TrackedSku, ... },
//!   "config":          SyncConfig,
//!   "audit_log_stats": { "total_logs": n, "last_log": ts },
//!   "audit_log":       [ newest, ..., oldest ]
//! }
//! ```
//!
//! Manual add/update/delete write an audit entry; sales-check decrements and
//! config changes do not.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use retail_core::validation::{validate_config_update, validate_new_sku, validate_sku_update};
use retail_core::{
    AuditAction, AuditLogEntry, AuditLogStats, ConfigUpdate, NewSku, SkuUpdate, SyncConfig,
    TrackedSku,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::JsonDocument;
use crate::error::{StoreError, StoreResult};

/// On-disk shape of the inventory document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryData {
    #[serde(default)]
    pub skus: BTreeMap<String, TrackedSku>,
    #[serde(default)]
    pub config: SyncConfig,
    #[serde(default)]
    pub audit_log_stats: AuditLogStats,
    #[serde(default)]
    pub audit_log: Vec<AuditLogEntry>,
}

impl InventoryData {
    pub fn with_config(config: SyncConfig) -> Self {
        InventoryData {
            config,
            ..Default::default()
        }
    }

    fn record_audit(
        &mut self,
        action: AuditAction,
        sku: &str,
        user: &str,
        data: serde_json::Value,
    ) {
        let now = Utc::now();
        self.audit_log_stats.total_logs += 1;
        self.audit_log_stats.last_log = Some(now);
        self.audit_log.insert(
            0,
            AuditLogEntry {
                id: self.audit_log_stats.total_logs,
                timestamp: now,
                action,
                sku: sku.to_string(),
                user: user.to_string(),
                data,
            },
        );
    }
}

fn sku_key(sku: &str) -> String {
    sku.trim().to_uppercase()
}

/// Repository for tracked SKUs, runtime config and the audit log.
#[derive(Debug, Clone)]
pub struct InventoryStore {
    doc: Arc<JsonDocument<InventoryData>>,
}

impl InventoryStore {
    pub fn new(doc: Arc<JsonDocument<InventoryData>>) -> Self {
        InventoryStore { doc }
    }

    // =========================================================================
    // SKUs
    // =========================================================================

    /// All tracked SKUs keyed by SKU.
    pub async fn get_all_skus(&self) -> StoreResult<BTreeMap<String, TrackedSku>> {
        let data = self.doc.read().await?;
        Ok(data
            .skus
            .into_iter()
            .map(|(key, mut record)| {
                record.sku = key.clone();
                (key, record)
            })
            .collect())
    }

    pub async fn get_sku(&self, sku: &str) -> StoreResult<Option<TrackedSku>> {
        let key = sku_key(sku);
        let data = self.doc.read().await?;
        Ok(data.skus.get(&key).cloned().map(|mut record| {
            record.sku = key;
            record
        }))
    }

    /// Starts tracking a SKU.
    ///
    /// ## Errors
    /// - `StoreError::Validation` for a malformed SKU or name
    /// - `StoreError::Duplicate` when the SKU is already tracked
    pub async fn add_sku(&self, input: NewSku, modified_by: &str) -> StoreResult<TrackedSku> {
        let input = validate_new_sku(input)?;

        let record = self
            .doc
            .update(|data| {
                if data.skus.contains_key(&input.sku) {
                    return Err(StoreError::duplicate("sku", input.sku.clone()));
                }

                let record = input.into_tracked(modified_by, Utc::now());
                let snapshot = serde_json::to_value(&record)?;
                data.skus.insert(record.sku.clone(), record.clone());
                data.record_audit(AuditAction::Add, &record.sku, modified_by, snapshot);
                Ok(record)
            })
            .await?;

        info!(sku = %record.sku, qty = record.available_qty, user = %modified_by, "SKU added");
        Ok(record)
    }

    /// Applies a manual edit. Returns `None` when the SKU is not tracked.
    pub async fn update_sku(
        &self,
        sku: &str,
        update: &SkuUpdate,
        modified_by: &str,
    ) -> StoreResult<Option<TrackedSku>> {
        validate_sku_update(update)?;
        let key = sku_key(sku);

        let updated = self
            .doc
            .update(|data| {
                let Some(record) = data.skus.get_mut(&key) else {
                    return Ok(None);
                };
                record.apply_update(update, modified_by, Utc::now());
                record.sku = key.clone();
                let record = record.clone();

                let payload = serde_json::to_value(update)?;
                data.record_audit(AuditAction::Update, &key, modified_by, payload);
                Ok(Some(record))
            })
            .await?;

        if updated.is_some() {
            info!(sku = %key, user = %modified_by, "SKU updated");
        }
        Ok(updated)
    }

    /// Stops tracking a SKU. Returns `false` when it was not tracked.
    pub async fn delete_sku(&self, sku: &str, modified_by: &str) -> StoreResult<bool> {
        let key = sku_key(sku);

        let deleted = self
            .doc
            .update(|data| {
                let Some(record) = data.skus.remove(&key) else {
                    return Ok(false);
                };
                let snapshot = serde_json::to_value(&record)?;
                data.record_audit(AuditAction::Delete, &key, modified_by, snapshot);
                Ok(true)
            })
            .await?;

        if deleted {
            info!(sku = %key, user = %modified_by, "SKU deleted");
        }
        Ok(deleted)
    }

    /// Subtracts sold units from a tracked SKU. No floor is applied.
    ///
    /// Returns `None` when the SKU is not tracked.
    pub async fn decrement_sku(
        &self,
        sku: &str,
        qty: i64,
        order_count: i64,
    ) -> StoreResult<Option<TrackedSku>> {
        let key = sku_key(sku);

        let updated = self
            .doc
            .update(|data| {
                Ok(data.skus.get_mut(&key).map(|record| {
                    record.apply_decrement(qty, order_count, Utc::now());
                    record.sku = key.clone();
                    record.clone()
                }))
            })
            .await?;

        if let Some(record) = &updated {
            debug!(
                sku = %key,
                qty,
                order_count,
                available_qty = record.available_qty,
                "SKU decremented"
            );
        }
        Ok(updated)
    }

    // =========================================================================
    // Runtime Config
    // =========================================================================

    pub async fn get_config(&self) -> StoreResult<SyncConfig> {
        Ok(self.doc.read().await?.config)
    }

    /// Validates and merges a partial config update, returning the result.
    pub async fn update_config(&self, update: &ConfigUpdate) -> StoreResult<SyncConfig> {
        validate_config_update(update)?;
        self.doc
            .update(|data| {
                data.config.apply(update);
                Ok(data.config.clone())
            })
            .await
    }

    // =========================================================================
    // Audit Log
    // =========================================================================

    /// The newest `limit` audit entries, newest first.
    pub async fn get_audit_log(&self, limit: usize) -> StoreResult<Vec<AuditLogEntry>> {
        let data = self.doc.read().await?;
        Ok(data.audit_log.into_iter().take(limit).collect())
    }

    pub async fn get_log_stats(&self) -> StoreResult<AuditLogStats> {
        let data = self.doc.read().await?;
        Ok(AuditLogStats {
            current_logs: data.audit_log.len(),
            ..data.audit_log_stats
        })
    }

    pub async fn get_log_by_id(&self, id: u64) -> StoreResult<Option<AuditLogEntry>> {
        let data = self.doc.read().await?;
        Ok(data.audit_log.into_iter().find(|entry| entry.id == id))
    }

    /// Empties the audit log and resets its counters. Returns the number of
    /// entries removed.
    pub async fn clear_audit_log(&self) -> StoreResult<usize> {
        let cleared = self
            .doc
            .update(|data| {
                let count = data.audit_log.len();
                data.audit_log.clear();
                data.audit_log_stats = AuditLogStats::default();
                Ok(count)
            })
            .await?;

        info!(cleared, "Audit log cleared");
        Ok(cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Store, StoreConfig};
    use retail_core::InventoryMethod;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn open(dir: &TempDir) -> InventoryStore {
        let config = StoreConfig::new(
            dir.path().join("inventory.json"),
            dir.path().join("error_log.json"),
        )
        .retry_backoff(Duration::from_millis(1));
        Store::open(config).await.unwrap().inventory()
    }

    fn mug(qty: i64) -> NewSku {
        NewSku {
            sku: "mug-blue".into(),
            product_name: "Blue Mug".into(),
            available_qty: qty,
            part_number: "P-100".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_add_and_get() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;

        let added = store.add_sku(mug(10), "alice").await.unwrap();
        assert_eq!(added.sku, "MUG-BLUE");
        assert_eq!(added.initial_qty, 10);

        let fetched = store.get_sku("Mug-Blue").await.unwrap().unwrap();
        assert_eq!(fetched, added);
        assert_eq!(store.get_all_skus().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_duplicate_rejected() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;

        store.add_sku(mug(10), "alice").await.unwrap();
        let err = store.add_sku(mug(3), "bob").await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
        assert_eq!(store.get_log_stats().await.unwrap().total_logs, 1);
    }

    #[tokio::test]
    async fn test_update_resets_order_count_and_audits() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;
        store.add_sku(mug(10), "alice").await.unwrap();
        store.decrement_sku("MUG-BLUE", 2, 1).await.unwrap();

        let update = SkuUpdate {
            available_qty: Some(25),
            notes: Some("restocked".into()),
            ..Default::default()
        };
        let updated = store.update_sku("MUG-BLUE", &update, "bob").await.unwrap().unwrap();
        assert_eq!(updated.available_qty, 25);
        assert_eq!(updated.initial_qty, 25);
        assert_eq!(updated.orders_processed, 0);
        assert_eq!(updated.notes, "restocked");

        let log = store.get_audit_log(10).await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].action, AuditAction::Update);
        assert_eq!(log[0].id, 2);
        assert_eq!(log[0].data["available_qty"], 25);
        assert_eq!(log[1].action, AuditAction::Add);
    }

    #[tokio::test]
    async fn test_update_missing_sku() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;
        let result = store
            .update_sku("NOPE", &SkuUpdate::default(), "bob")
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(store.get_log_stats().await.unwrap().total_logs, 0);
    }

    #[tokio::test]
    async fn test_delete_sku() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;
        store.add_sku(mug(10), "alice").await.unwrap();

        assert!(store.delete_sku("MUG-BLUE", "bob").await.unwrap());
        assert!(!store.delete_sku("MUG-BLUE", "bob").await.unwrap());
        assert!(store.get_sku("MUG-BLUE").await.unwrap().is_none());

        let entry = store.get_log_by_id(2).await.unwrap().unwrap();
        assert_eq!(entry.action, AuditAction::Delete);
        assert_eq!(entry.data["product_name"], "Blue Mug");
    }

    #[tokio::test]
    async fn test_decrement_allows_negative_and_skips_audit() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;
        store.add_sku(mug(1), "alice").await.unwrap();

        let record = store.decrement_sku("MUG-BLUE", 3, 2).await.unwrap().unwrap();
        assert_eq!(record.available_qty, -2);
        assert_eq!(record.orders_processed, 2);
        assert_eq!(record.modified_by, retail_core::AUTO_SYNC_USER);

        assert!(store.decrement_sku("UNTRACKED", 1, 1).await.unwrap().is_none());
        assert_eq!(store.get_log_stats().await.unwrap().total_logs, 1);
    }

    #[tokio::test]
    async fn test_config_update_validated_and_persisted() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;

        let config = store
            .update_config(&ConfigUpdate {
                inventory_method: Some(InventoryMethod::Automated),
                sales_interval_minutes: Some(60),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(config.inventory_method, InventoryMethod::Automated);
        assert_eq!(store.get_config().await.unwrap().sales_interval_minutes, 60);

        let err = store
            .update_config(&ConfigUpdate {
                sync_interval_minutes: Some(0),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(store.get_config().await.unwrap().sync_interval_minutes, 5);
    }

    #[tokio::test]
    async fn test_clear_audit_log() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;
        store.add_sku(mug(1), "alice").await.unwrap();
        store.delete_sku("MUG-BLUE", "alice").await.unwrap();

        assert_eq!(store.clear_audit_log().await.unwrap(), 2);
        let stats = store.get_log_stats().await.unwrap();
        assert_eq!(stats.total_logs, 0);
        assert_eq!(stats.current_logs, 0);
        assert!(stats.last_log.is_none());
    }

    #[tokio::test]
    async fn test_reads_legacy_document_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inventory.json");
        let legacy = serde_json::json!({
            "skus": {
                "R0166": {
                    "product_name": "Widget",
                    "available_qty": 4,
                    "initial_qty": 5,
                    "last_modified": "2025-03-01T10:00:00.123456",
                    "modified_by": "auto-sync",
                    "notes": "",
                    "sn_flag": true,
                    "part_num": "R0166",
                    "orders_processed": 1
                }
            },
            "config": {
                "inventory_method": "manual",
                "sync_interval_minutes": 5,
                "last_check_run": "2025-03-01T10:05:00.000001"
            },
            "audit_log_stats": {"total_logs": 1, "last_log": "2025-03-01T09:00:00.5"},
            "audit_log": []
        });
        tokio::fs::write(&path, legacy.to_string()).await.unwrap();

        let store = open(&dir).await;
        let record = store.get_sku("r0166").await.unwrap().unwrap();
        assert_eq!(record.sku, "R0166");
        assert!(record.is_serialized);

        let config = store.get_config().await.unwrap();
        assert_eq!(config.sales_interval_minutes, 180);
        assert!(record.last_modified < config.last_check_run.unwrap());

        // Writes go back out as RFC 3339.
        store.decrement_sku("R0166", 1, 1).await.unwrap();
        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let written = doc["skus"]["R0166"]["last_modified"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(written).is_ok());
    }
}
