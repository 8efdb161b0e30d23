//! Cycle data: ERP inventory queries, manual overrides and the push.

use std::collections::HashMap;

use chrono::Local;
use retail_core::{merge_cycle_data, CycleRecord, ErrorKind, ImportBatch};
use serde_json::json;
use tracing::{debug, info};

use super::SyncEngine;
use crate::erp::{self, retail_location};
use crate::error::{SyncError, SyncResult};

impl SyncEngine {
    /// Tracked SKUs as override records, keyed by part number.
    ///
    /// SKUs without a part number are left out. When two SKUs share a part,
    /// the one sorting last wins.
    pub async fn manual_overrides(&self) -> SyncResult<HashMap<String, CycleRecord>> {
        let skus = self.store.inventory().get_all_skus().await?;
        let location = retail_location(&self.company);
        let note = format!(
            "Retail Website Inventory API Manual Override: {}",
            Local::now().format("%Y-%m-%d")
        );

        let overrides: HashMap<String, CycleRecord> = skus
            .values()
            .filter(|sku| !sku.part_number.trim().is_empty())
            .map(|sku| {
                let part = sku.part_number.trim().to_string();
                let record = CycleRecord::new(part.clone(), sku.available_qty, sku.is_serialized)
                    .with_location(location.clone())
                    .with_note(note.clone());
                (part, record)
            })
            .collect();

        debug!(overrides = overrides.len(), "Built manual overrides");
        Ok(overrides)
    }

    /// Current ERP inventory merged with `overrides`.
    ///
    /// Returns an empty list when the ERP could not be read; the failure is
    /// in the error log.
    pub async fn get_cycle_data(&self, overrides: &HashMap<String, CycleRecord>) -> Vec<CycleRecord> {
        self.collect_cycle_data(overrides).await.unwrap_or_default()
    }

    /// Like [`get_cycle_data`](Self::get_cycle_data), but hands the error
    /// back to the sync pass after logging it.
    pub(crate) async fn collect_cycle_data(
        &self,
        overrides: &HashMap<String, CycleRecord>,
    ) -> SyncResult<Vec<CycleRecord>> {
        match self.query_inventory().await {
            Ok((cycle_out, qoh)) => {
                let merged = merge_cycle_data(qoh, cycle_out, overrides);
                info!(records = merged.len(), "Cycle data merged");
                Ok(merged)
            }
            Err(e) => {
                self.fail(
                    ErrorKind::CycleDataError,
                    e.to_string(),
                    "get_cycle_data",
                    json!({
                        "cause": e.cause_kind(),
                        "overrides": overrides.len(),
                    }),
                )
                .await;
                Err(e)
            }
        }
    }

    /// Runs the cycle-out then the QOH query on one session.
    ///
    /// Only a pass where both sets come back empty is rejected. An empty QOH
    /// next to a non-empty cycle-out is pushed as is, so a QOH query that
    /// silently returns nothing still produces a cycle-out-only batch.
    async fn query_inventory(&self) -> SyncResult<(Vec<CycleRecord>, Vec<CycleRecord>)> {
        let mut session = self.erp.connect().await?;

        let result: SyncResult<(Vec<CycleRecord>, Vec<CycleRecord>)> = async {
            let cycle_out = session.query(&self.queries.cycle_out).await?.rows_as()?;
            let qoh = session.query(&self.queries.qoh).await?.rows_as()?;
            Ok((cycle_out, qoh))
        }
        .await;
        erp::close(session).await;

        let (cycle_out, qoh) = result?;
        debug!(cycle_out = cycle_out.len(), qoh = qoh.len(), "Inventory queried");
        if cycle_out.is_empty() && qoh.is_empty() {
            return Err(SyncError::NoInventoryData);
        }
        Ok((cycle_out, qoh))
    }

    /// Sends a batch to the ERP's cycle-count import.
    pub(crate) async fn push(&self, batch: &ImportBatch) -> SyncResult<()> {
        let mut session = self.erp.connect().await?;
        let result = session.cycle_inventory(batch).await;
        erp::close(session).await;
        result?;

        info!(
            records = batch.record_count(),
            serials = batch.serial_count(),
            "Cycle count imported"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::erp::fake::FakeErp;
    use tempfile::TempDir;

    fn part(part: &str, qty: i64, serialized: bool) -> serde_json::Value {
        json!({"PartNumber": part, "Location": "x", "Qty": qty, "Note": "", "SnFlag": serialized})
    }

    #[tokio::test]
    async fn test_overrides_keyed_by_part_number() {
        let dir = TempDir::new().unwrap();
        let erp = FakeErp::new();
        let engine = engine(&dir, &erp).await;
        let inventory = engine.store().inventory();

        inventory.add_sku(new_sku("MUG-BLUE", "P-1", 4, false), "alice").await.unwrap();
        inventory.add_sku(new_sku("MUG-RED", "P-2", -1, true), "alice").await.unwrap();
        inventory.add_sku(new_sku("NO-PART", "", 9, false), "alice").await.unwrap();

        let overrides = engine.manual_overrides().await.unwrap();
        assert_eq!(overrides.len(), 2);

        let red = &overrides["P-2"];
        assert_eq!(red.qty, -1);
        assert!(red.is_serialized);
        assert_eq!(red.location, "Acme / Main-Retail Website Inventory");
        assert!(red.note.starts_with("Retail Website Inventory API Manual Override: "));
    }

    #[tokio::test]
    async fn test_cycle_data_queries_cycle_out_first_on_one_session() {
        let dir = TempDir::new().unwrap();
        let erp = FakeErp::new();
        let q = queries();
        erp.respond(&q.qoh, vec![part("A", 5, false)]);
        erp.respond(&q.cycle_out, vec![part("A", 0, true), part("B", 0, false)]);

        let engine = engine(&dir, &erp).await;
        let records = engine.get_cycle_data(&HashMap::new()).await;

        // A is serialized and already stocked, so it is dropped; B is added.
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].part_number, "B");

        assert_eq!(erp.queries(), vec![q.cycle_out.clone(), q.qoh.clone()]);
        assert_eq!(erp.logins(), 1);
        assert_eq!(erp.logouts(), 1);
    }

    #[tokio::test]
    async fn test_cycle_data_failure_returns_empty_and_logs() {
        let dir = TempDir::new().unwrap();
        let erp = FakeErp::new();
        let q = queries();
        erp.fail_query(&q.qoh, 500);

        let engine = engine(&dir, &erp).await;
        assert!(engine.get_cycle_data(&HashMap::new()).await.is_empty());

        let errors = engine.store().errors().get_errors(10, false).await.unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::CycleDataError);
        assert_eq!(errors[0].source, "get_cycle_data");
    }

    #[tokio::test]
    async fn test_only_cycle_out_rows_is_still_data() {
        let dir = TempDir::new().unwrap();
        let erp = FakeErp::new();
        erp.respond(&queries().cycle_out, vec![part("B", 0, false)]);

        let engine = engine(&dir, &erp).await;
        let records = engine.get_cycle_data(&HashMap::new()).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].qty, 0);
    }
}
