//! # Cycle-Count Import Batch
//!
//! Turns reconciled [`CycleRecord`]s into the tabular payload the ERP's
//! cycle-count import accepts.
//!
//! ## Layout
//! ```text
//! ┌────────────┬──────────────────┬─────┬──────────┬─────┐
//! │ PartNumber │ Location         │ Qty │ Note     │ ... │   header row
//! ├────────────┼──────────────────┼─────┼──────────┼─────┤
//! │ A          │ Acme / Retail    │ 5   │          │     │   aggregate (bulk)
//! │ S          │ Acme / Retail    │ 2   │ override │     │   aggregate (serialized)
//! │ FAKE_SN_S-1│                  │     │          │     │   unit
//! │ FAKE_SN_S-2│                  │     │          │     │   unit
//! └────────────┴──────────────────┴─────┴──────────┴─────┘
//! ```
//!
//! The import rejects serialized parts without one row per serial, so each
//! serialized record is followed by `max(qty, 0)` placeholder unit rows.

use serde::Serialize;

use crate::error::{CoreError, CoreResult};
use crate::reconcile::CycleRecord;

/// Column headers of the standard cycle-count import.
pub const IMPORT_HEADERS: [&str; 7] = [
    "PartNumber",
    "Location",
    "Qty",
    "Note",
    "Tracking-Lot Number",
    "Tracking-Revision Level",
    "Tracking-Expiration Date",
];

/// Prefix of generated placeholder serial numbers.
pub const PLACEHOLDER_SERIAL_PREFIX: &str = "FAKE_SN_";

/// A row below the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BatchRow {
    /// One cell per header, taken from the record.
    Aggregate(Vec<String>),
    /// Placeholder serial for one unit of a serialized part.
    Unit { serial: String },
}

/// Import payload ready to send to the ERP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBatch {
    pub headers: Vec<String>,
    pub rows: Vec<BatchRow>,
}

/// Builds the import batch for `records` using `headers` as columns.
pub fn build_import_batch<S: AsRef<str>>(
    headers: &[S],
    records: &[CycleRecord],
) -> CoreResult<ImportBatch> {
    if headers.is_empty() {
        return Err(CoreError::MissingHeaders);
    }
    if records.is_empty() {
        return Err(CoreError::EmptyBatch);
    }

    let headers: Vec<String> = headers.iter().map(|h| h.as_ref().to_string()).collect();
    let mut rows = Vec::with_capacity(records.len());

    for record in records {
        let cells = headers
            .iter()
            .map(|h| {
                record
                    .column(h)
                    .ok_or_else(|| CoreError::UnknownColumn(h.clone()))
            })
            .collect::<CoreResult<Vec<String>>>()?;
        rows.push(BatchRow::Aggregate(cells));

        if record.is_serialized {
            for n in 1..=record.qty.max(0) {
                rows.push(BatchRow::Unit {
                    serial: format!("{}{}-{}", PLACEHOLDER_SERIAL_PREFIX, record.part_number, n),
                });
            }
        }
    }

    Ok(ImportBatch { headers, rows })
}

impl ImportBatch {
    /// Header row followed by every row, unit rows padded to full width.
    pub fn to_matrix(&self) -> Vec<Vec<String>> {
        let width = self.headers.len();
        let mut matrix = Vec::with_capacity(self.matrix_len());
        matrix.push(self.headers.clone());

        for row in &self.rows {
            match row {
                BatchRow::Aggregate(cells) => matrix.push(cells.clone()),
                BatchRow::Unit { serial } => {
                    let mut cells = Vec::with_capacity(width);
                    cells.push(serial.clone());
                    cells.resize(width, String::new());
                    matrix.push(cells);
                }
            }
        }
        matrix
    }

    /// Number of aggregate rows.
    pub fn record_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| matches!(r, BatchRow::Aggregate(_)))
            .count()
    }

    /// Number of placeholder unit rows.
    pub fn serial_count(&self) -> usize {
        self.rows.len() - self.record_count()
    }

    /// Rows in the rendered matrix, header included.
    pub fn matrix_len(&self) -> usize {
        self.rows.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_record_gets_unit_rows() {
        let records = vec![
            CycleRecord::new("A", 5, false).with_location("Acme / Retail"),
            CycleRecord::new("S", 2, true).with_location("Acme / Retail"),
        ];
        let batch = build_import_batch(&IMPORT_HEADERS, &records).unwrap();

        assert_eq!(batch.record_count(), 2);
        assert_eq!(batch.serial_count(), 2);
        assert_eq!(batch.matrix_len(), 5);

        let matrix = batch.to_matrix();
        assert_eq!(matrix[0][0], "PartNumber");
        assert_eq!(matrix[1], vec!["A", "Acme / Retail", "5", "", "", "", ""]);
        assert_eq!(matrix[3][0], "FAKE_SN_S-1");
        assert_eq!(matrix[4][0], "FAKE_SN_S-2");
        assert!(matrix[4][1..].iter().all(|c| c.is_empty()));
        assert!(matrix.iter().all(|row| row.len() == IMPORT_HEADERS.len()));
    }

    #[test]
    fn test_negative_serialized_qty_adds_no_units() {
        let records = vec![CycleRecord::new("S", -3, true)];
        let batch = build_import_batch(&IMPORT_HEADERS, &records).unwrap();
        assert_eq!(batch.serial_count(), 0);
        assert_eq!(batch.matrix_len(), 2);
    }

    #[test]
    fn test_missing_inputs_rejected() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            build_import_batch(&empty, &[CycleRecord::new("A", 1, false)]),
            Err(CoreError::MissingHeaders)
        ));
        assert!(matches!(
            build_import_batch(&IMPORT_HEADERS, &[]),
            Err(CoreError::EmptyBatch)
        ));
    }

    #[test]
    fn test_unknown_header_rejected() {
        let result = build_import_batch(&["PartNumber", "Bin"], &[CycleRecord::new("A", 1, false)]);
        assert!(matches!(result, Err(CoreError::UnknownColumn(h)) if h == "Bin"));
    }

    #[test]
    fn test_custom_header_subset() {
        let batch =
            build_import_batch(&["PartNumber", "Qty"], &[CycleRecord::new("A", 7, false)]).unwrap();
        assert_eq!(batch.to_matrix(), vec![vec!["PartNumber", "Qty"], vec!["A", "7"]]);
    }
}
