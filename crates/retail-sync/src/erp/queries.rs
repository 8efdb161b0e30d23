//! SQL sent to the Fishbowl data-query endpoint.
//!
//! The two inventory queries return rows in import shape (`PartNumber`,
//! `Location`, `Qty`, `Note`, `SnFlag`), already addressed to the retail
//! location:
//!
//! ```text
//! cycle-out  parts currently stocked in the retail location, Qty 0
//! QOH        sellable quantity per part in the company's other locations
//! ```
//!
//! Query files configured in `[erp]` replace the built-in inventory queries.
//! `{company}` and `{location}` in a file are substituted before use.

use std::path::Path;

use chrono::{DateTime, Local, Utc};
use retail_core::RETAIL_LOCATION_NAME;
use tracing::info;

use crate::config::ServiceConfig;
use crate::error::{SyncError, SyncResult};

/// Sales order statuses that are closed (fulfilled, voided, ...).
const CLOSED_ORDER_STATUSES: &str = "60,70,80,85,90,95";

/// Sales order item statuses that are closed.
const CLOSED_ITEM_STATUSES: &str = "50,60,70,75,95";

/// Quotes a value as a SQL string literal.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Full import location of the retail location for a company.
pub fn retail_location(company: &str) -> String {
    format!("{} / {}", company, RETAIL_LOCATION_NAME)
}

/// The SQL a sync service issues for one company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySet {
    pub qoh: String,
    pub cycle_out: String,
    /// Fishbowl users whose sales orders count as storefront sales.
    pub order_user_ids: Vec<i64>,
}

impl QuerySet {
    /// Built-in queries for `company`.
    pub fn standard(company: &str, order_user_ids: Vec<i64>) -> Self {
        QuerySet {
            qoh: qoh_query(company),
            cycle_out: cycle_out_query(company),
            order_user_ids,
        }
    }

    /// Queries per service config, reading any configured query files.
    pub fn from_config(config: &ServiceConfig) -> SyncResult<Self> {
        let company = &config.company.name;
        let mut queries = Self::standard(company, config.erp.order_user_ids.clone());

        if let Some(path) = &config.erp.qoh_query_file {
            queries.qoh = load_query_file(path, company)?;
        }
        if let Some(path) = &config.erp.cycle_out_query_file {
            queries.cycle_out = load_query_file(path, company)?;
        }
        Ok(queries)
    }

    /// Storefront orders grouped by product since `since`.
    ///
    /// Fishbowl stores local wall-clock time, so `since` is rendered in the
    /// service's local time zone.
    pub fn orders_since(&self, since: DateTime<Utc>) -> String {
        let since = since.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string();
        let users = self
            .order_user_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "SELECT product.num AS sku, SUM(soitem.qtyordered) AS qty_sold, \
             COUNT(DISTINCT so.id) AS order_count \
             FROM so \
             JOIN soitem ON so.id = soitem.soid \
             JOIN product ON soitem.productid = product.id \
             WHERE so.dateissued >= '{since}' \
             AND (so.statusid NOT IN ({closed}) OR so.datecompleted >= '{since}') \
             AND (soitem.statusid NOT IN ({closed_items}) OR soitem.datelastfulfillment >= '{since}') \
             AND so.createdbyuserid IN ({users}) \
             GROUP BY product.num",
            since = since,
            closed = CLOSED_ORDER_STATUSES,
            closed_items = CLOSED_ITEM_STATUSES,
            users = users,
        )
    }

    /// Active product/part pair for a SKU.
    pub fn sku_lookup(&self, sku: &str) -> String {
        format!(
            "SELECT Product.num AS Sku, Part.num AS PartNumber, Part.serializedFlag AS SnFlag \
             FROM Product \
             JOIN Part ON Product.partId = Part.id \
             WHERE Part.activeFlag = 1 AND Product.activeFlag = 1 AND Product.num = {} \
             LIMIT 1",
            quote(sku)
        )
    }
}

fn qoh_query(company: &str) -> String {
    format!(
        "SELECT Part.num AS PartNumber, {location} AS Location, \
         SUM(Tag.qty - Tag.qtyCommitted) AS Qty, \
         'Retail Website Inventory API Sync' AS Note, \
         Part.serializedFlag AS SnFlag \
         FROM Tag \
         JOIN Part ON Tag.partId = Part.id \
         JOIN Location ON Tag.locationId = Location.id \
         JOIN LocationGroup ON Location.locationGroupId = LocationGroup.id \
         WHERE Part.activeFlag = 1 \
         AND LocationGroup.name = {company} \
         AND Location.name <> {retail} \
         AND Location.pickable = 1 \
         GROUP BY Part.num, Part.serializedFlag \
         HAVING SUM(Tag.qty - Tag.qtyCommitted) > 0",
        location = quote(&retail_location(company)),
        company = quote(company),
        retail = quote(RETAIL_LOCATION_NAME),
    )
}

fn cycle_out_query(company: &str) -> String {
    format!(
        "SELECT Part.num AS PartNumber, {location} AS Location, 0 AS Qty, \
         'Retail Website Inventory API Cycle Out' AS Note, \
         Part.serializedFlag AS SnFlag \
         FROM Tag \
         JOIN Part ON Tag.partId = Part.id \
         JOIN Location ON Tag.locationId = Location.id \
         JOIN LocationGroup ON Location.locationGroupId = LocationGroup.id \
         WHERE LocationGroup.name = {company} \
         AND Location.name = {retail} \
         AND Tag.qty > 0 \
         GROUP BY Part.num, Part.serializedFlag",
        location = quote(&retail_location(company)),
        company = quote(company),
        retail = quote(RETAIL_LOCATION_NAME),
    )
}

fn load_query_file(path: &Path, company: &str) -> SyncResult<String> {
    let sql = std::fs::read_to_string(path).map_err(|e| {
        SyncError::ConfigLoadFailed(format!("query file {}: {}", path.display(), e))
    })?;
    info!(path = %path.display(), "Loaded query file");

    Ok(sql
        .replace("{company}", company)
        .replace("{location}", &retail_location(company)))
}
