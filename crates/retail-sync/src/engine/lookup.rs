//! SKU lookup against the ERP's active products.

use retail_core::validation::normalize_sku;
use retail_core::{ErrorKind, ProductPart, SkuLookup};
use serde_json::json;
use tracing::{debug, info};

use super::SyncEngine;
use crate::erp;
use crate::error::SyncResult;

impl SyncEngine {
    /// Checks that `sku` is an active product and returns its part.
    ///
    /// Malformed input comes back as `success = false` without touching the
    /// ERP or the error log.
    pub async fn get_sku_info(&self, sku: &str) -> SkuLookup {
        let sku = match normalize_sku(sku) {
            Ok(sku) => sku,
            Err(e) => {
                debug!(error = %e, "Rejected SKU lookup input");
                return SkuLookup::failed(e.to_string());
            }
        };

        match self.find_product(&sku).await {
            Ok(Some(product)) => {
                info!(sku = %sku, part_number = %product.part_number, "SKU validated");
                SkuLookup::found(product.part_number, product.is_serialized)
            }
            Ok(None) => {
                info!(sku = %sku, "SKU not found in Fishbowl");
                SkuLookup::not_found(&sku)
            }
            Err(e) => {
                let kind = if e.is_erp_failure() {
                    ErrorKind::FishbowlApiError
                } else {
                    ErrorKind::FishbowlQueryError
                };
                let failure = self
                    .fail(
                        kind,
                        format!("Failed to look up SKU {}: {}", sku, e),
                        "get_sku_info",
                        json!({ "sku": sku, "cause": e.cause_kind() }),
                    )
                    .await;
                SkuLookup::failed(failure.error)
            }
        }
    }

    async fn find_product(&self, sku: &str) -> SyncResult<Option<ProductPart>> {
        let sql = self.queries.sku_lookup(sku);
        let mut session = self.erp.connect().await?;
        let response = session.query(&sql).await;
        erp::close(session).await;

        let products: Vec<ProductPart> = response?.rows_as()?;
        Ok(products.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::erp::fake::FakeErp;
    use retail_core::ErrorKind;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_lookup_found() {
        let dir = TempDir::new().unwrap();
        let erp = FakeErp::new();
        erp.respond(
            "Product.num = 'TENT-2P'",
            vec![json!({"Sku": "TENT-2P", "PartNumber": "P-100", "SnFlag": true})],
        );

        let engine = engine(&dir, &erp).await;
        let lookup = engine.get_sku_info(" tent-2p ").await;
        assert!(lookup.success);
        assert!(lookup.validated_sku);
        assert_eq!(lookup.part_number.as_deref(), Some("P-100"));
        assert_eq!(lookup.is_serialized, Some(true));
    }

    #[tokio::test]
    async fn test_lookup_not_found_is_clean_negative() {
        let dir = TempDir::new().unwrap();
        let erp = FakeErp::new();
        let engine = engine(&dir, &erp).await;

        let lookup = engine.get_sku_info("GHOST-1").await;
        assert!(lookup.success);
        assert!(!lookup.validated_sku);
        assert!(lookup.message.starts_with("Did not find GHOST-1"));
        assert!(engine.store().errors().get_errors(10, false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_erp_failure_is_logged() {
        let dir = TempDir::new().unwrap();
        let erp = FakeErp::new();
        erp.fail_login();
        let engine = engine(&dir, &erp).await;

        let lookup = engine.get_sku_info("TENT-2P").await;
        assert!(!lookup.success);
        assert!(!lookup.validated_sku);

        let errors = engine.store().errors().get_errors(10, false).await.unwrap();
        assert_eq!(errors[0].kind, ErrorKind::FishbowlApiError);
        assert_eq!(errors[0].details["cause"], "auth_error");
    }

    #[tokio::test]
    async fn test_lookup_bad_row_is_query_error() {
        let dir = TempDir::new().unwrap();
        let erp = FakeErp::new();
        erp.respond("Product.num = 'TENT-2P'", vec![json!({"Sku": "TENT-2P"})]);
        let engine = engine(&dir, &erp).await;

        let lookup = engine.get_sku_info("TENT-2P").await;
        assert!(!lookup.success);

        let errors = engine.store().errors().get_errors(10, false).await.unwrap();
        assert_eq!(errors[0].kind, ErrorKind::FishbowlQueryError);
    }

    #[tokio::test]
    async fn test_malformed_sku_never_reaches_erp() {
        let dir = TempDir::new().unwrap();
        let erp = FakeErp::new();
        let engine = engine(&dir, &erp).await;

        let lookup = engine.get_sku_info("   ").await;
        assert!(!lookup.success);
        assert_eq!(erp.logins(), 0);
        assert!(engine.store().errors().get_errors(10, false).await.unwrap().is_empty());
    }
}
