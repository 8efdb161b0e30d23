//! # ERP Access
//!
//! Connector/session traits the engine talks to, and the Fishbowl client
//! that implements them.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  connector.connect()  ── login (retried with backoff) ──► session      │
//! │       │                                                                 │
//! │       ├── session.query(sql)          ──► QueryResponse               │
//! │       ├── session.cycle_inventory(b)  ──► ()                          │
//! │       │        │                                                        │
//! │       │        └── reason != "OK" ──► logout, Err(CallFailure)        │
//! │       │                                                                 │
//! │       └── close(session)  ── logout, failure only warns               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod fishbowl;
mod queries;

pub use fishbowl::{FishbowlConnector, FishbowlSession};
pub use queries::{quote, retail_location, QuerySet};

use async_trait::async_trait;
use retail_core::ImportBatch;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::{SyncError, SyncResult};

/// One result row, keyed by column alias.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Reason string the ERP sends with a successful call.
pub const REASON_OK: &str = "OK";

// =============================================================================
// Query Response
// =============================================================================

/// Answer to a data query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    /// Rows, or `None` when the ERP sent no data.
    pub data: Option<Vec<Row>>,
    pub status: u16,
    pub reason: String,
}

impl QueryResponse {
    pub fn ok(rows: Vec<Row>) -> Self {
        QueryResponse {
            data: Some(rows),
            status: 200,
            reason: REASON_OK.to_string(),
        }
    }

    pub fn rows(&self) -> &[Row] {
        self.data.as_deref().unwrap_or_default()
    }

    /// Decodes every row into `T`.
    pub fn rows_as<T: DeserializeOwned>(&self) -> SyncResult<Vec<T>> {
        self.rows()
            .iter()
            .map(|row| {
                let value = serde_json::Value::Object(row.clone());
                serde_json::from_value(value.clone())
                    .map_err(|e| SyncError::Decode(format!("{}: {}", e, value)))
            })
            .collect()
    }
}

// =============================================================================
// Traits
// =============================================================================

/// Opens logged-in ERP sessions.
#[async_trait]
pub trait ErpConnector: Send + Sync {
    /// Logs in, retrying per the connector's policy.
    async fn connect(&self) -> SyncResult<Box<dyn ErpSession>>;
}

/// A logged-in ERP session.
#[async_trait]
pub trait ErpSession: Send {
    fn is_logged_in(&self) -> bool;

    /// Ends the session. A no-op when already logged out.
    async fn logout(&mut self) -> SyncResult<()>;

    /// Runs a read-only SQL query.
    async fn query(&mut self, sql: &str) -> SyncResult<QueryResponse>;

    /// Imports a cycle-count batch.
    async fn cycle_inventory(&mut self, batch: &ImportBatch) -> SyncResult<()>;
}

/// Logs the session out if it is still active. Failure only warns.
pub async fn close(mut session: Box<dyn ErpSession>) {
    if !session.is_logged_in() {
        return;
    }
    if let Err(e) = session.logout().await {
        warn!(error = %e, "Failed to log out of Fishbowl");
    }
}

// =============================================================================
// In-memory ERP (tests)
// =============================================================================


#[cfg(test)]
mod tests {
    use super::fake::{row, FakeErp};
    use super::*;
    use retail_core::OrderSummary;
    use serde_json::json;

    #[test]
    fn test_rows_as_decodes_rows() {
        let response = QueryResponse::ok(vec![row(
            json!({"sku": "MUG-BLUE", "qty_sold": 3, "order_count": 2}),
        )]);
        let orders: Vec<OrderSummary> = response.rows_as().unwrap();
        assert_eq!(orders[0].sku, "MUG-BLUE");
        assert_eq!(orders[0].qty_sold, 3);
    }

    #[test]
    fn test_rows_as_reports_bad_rows() {
        let response = QueryResponse::ok(vec![row(json!({"qty_sold": 3}))]);
        let err = response.rows_as::<OrderSummary>().unwrap_err();
        assert!(matches!(err, SyncError::Decode(_)));
    }

    #[test]
    fn test_missing_data_reads_as_no_rows() {
        let response = QueryResponse {
            data: None,
            status: 200,
            reason: REASON_OK.into(),
        };
        assert!(response.rows().is_empty());
        assert!(response.rows_as::<OrderSummary>().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_close_logs_out_once() {
        let erp = FakeErp::new();
        let session = erp.connect().await.unwrap();
        close(session).await;
        assert_eq!(erp.logouts(), 1);
    }

    #[tokio::test]
    async fn test_failed_query_logs_session_out() {
        let erp = FakeErp::new();
        erp.fail_query("FROM so", 500);

        let mut session = erp.connect().await.unwrap();
        let err = session.query("SELECT 1 FROM so").await.unwrap_err();
        assert!(matches!(err, SyncError::CallFailure { status: 500, .. }));
        assert!(!session.is_logged_in());

        close(session).await;
        assert_eq!(erp.logouts(), 1);
    }
}
