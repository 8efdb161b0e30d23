//! Sales check: subtract storefront orders from tracked quantities.
//!
//! ```text
//! window start = last_check_run, or now - 60 min on the first run
//!        │
//!        ▼
//! ERP orders since window start, grouped by SKU
//!        │
//!        ├── untracked SKU ─────────────────────────► counted, skipped
//!        ├── edited after window start ─────────────► counted, skipped
//!        └── otherwise ── decrement_sku(qty, orders) ► counted, updated
//!        │
//!        ▼
//! last_check_run = now
//! ```
//!
//! A failed check leaves `last_check_run` alone, so the next check covers the
//! same window again.

use std::time::Instant;

use chrono::{DateTime, Duration, Local, Utc};
use retail_core::{
    ConfigUpdate, ErrorKind, Failure, OrderSummary, SalesCheckReport, DEFAULT_SALES_WINDOW_MINUTES,
};
use serde_json::json;
use tracing::{debug, info};

use super::SyncEngine;
use crate::erp;
use crate::error::SyncResult;

impl SyncEngine {
    /// Decrements tracked SKUs by the orders placed since the last check.
    pub async fn run_sales_check(&self) -> Result<SalesCheckReport, Failure> {
        let _check = self.sales_check_lock.lock().await;
        let started = Instant::now();

        match self.sales_check(started).await {
            Ok(report) => {
                info!(
                    orders_processed = report.orders_processed,
                    skus_updated = report.skus_updated,
                    "Sales check complete"
                );
                Ok(report)
            }
            Err(e) => Err(self
                .fail(
                    ErrorKind::SalesCheckError,
                    e.to_string(),
                    "run_sales_check",
                    json!({
                        "cause": e.cause_kind(),
                        "retryable": e.is_retryable(),
                    }),
                )
                .await),
        }
    }

    async fn sales_check(&self, started: Instant) -> SyncResult<SalesCheckReport> {
        let inventory = self.store.inventory();
        let config = inventory.get_config().await?;
        let since = config
            .last_check_run
            .unwrap_or_else(|| Utc::now() - Duration::minutes(DEFAULT_SALES_WINDOW_MINUTES));

        let orders = self.orders_since(since).await?;
        let tracked = inventory.get_all_skus().await?;

        let mut orders_processed = 0i64;
        let mut skus_updated = 0usize;

        for order in &orders {
            orders_processed += order.order_count;

            let key = order.sku.trim().to_uppercase();
            let Some(record) = tracked.get(&key) else {
                continue;
            };
            if record.last_modified > since {
                debug!(sku = %key, "Edited after window start, skipping");
                continue;
            }

            if inventory
                .decrement_sku(&key, order.qty_sold, order.order_count)
                .await?
                .is_some()
            {
                skus_updated += 1;
            }
        }

        inventory
            .update_config(&ConfigUpdate::last_check_run(Utc::now()))
            .await?;

        let secs = started.elapsed().as_secs_f64();
        let message = if orders.is_empty() {
            format!("No new orders since {}", describe_since(since))
        } else if skus_updated > 0 {
            format!(
                "Check complete: {} new products/orders checked and {} SKUs updated in {:.2} seconds!",
                orders_processed, skus_updated, secs
            )
        } else {
            format!(
                "Check complete: {} new products/orders checked in {:.2} seconds, but none of them are tracked below.",
                orders_processed, secs
            )
        };

        Ok(SalesCheckReport {
            orders_processed,
            skus_updated,
            message,
        })
    }

    async fn orders_since(&self, since: DateTime<Utc>) -> SyncResult<Vec<OrderSummary>> {
        let sql = self.queries.orders_since(since);
        let mut session = self.erp.connect().await?;
        let response = session.query(&sql).await;
        erp::close(session).await;
        response?.rows_as()
    }
}

/// `March 01 at 02:05:09 PM`, in local time.
fn describe_since(since: DateTime<Utc>) -> String {
    since
        .with_timezone(&Local)
        .format("%B %d at %I:%M:%S %p")
        .to_string()
}
