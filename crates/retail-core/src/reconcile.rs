//! # Cycle Data Reconciliation
//!
//! Combines the ERP's two inventory views into the list of records pushed
//! back as a cycle count.
//!
//! ## Inputs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  QOH          parts with quantity on hand in the retail location        │
//! │  CYCLE-OUT    parts that should be counted out (zeroed) there           │
//! │  OVERRIDES    locally tracked quantities, keyed by part number          │
//! │                                                                         │
//! │        QOH ──────────────┐                                              │
//! │                          ├──► merge_cycle_data ──► Vec<CycleRecord>     │
//! │        CYCLE-OUT ────────┤        (pure)                                │
//! │        OVERRIDES ────────┘                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tie-break Rules (applied in this order)
//!
//! 1. A cycle-out part with an override is replaced by the override.
//! 2. A serialized cycle-out part already in QOH is dropped entirely.
//! 3. A bulk cycle-out part missing from QOH is appended once.
//! 4. Everything else in cycle-out is ignored.
//! 5. One record per part survives, carrying the last-seen values.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Cycle Record
// =============================================================================

/// One inventory row as the ERP reports it and as the import expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleRecord {
    #[serde(rename = "PartNumber", deserialize_with = "lenient_string")]
    pub part_number: String,

    #[serde(rename = "Location", default, deserialize_with = "lenient_string")]
    pub location: String,

    #[serde(rename = "Qty", default, deserialize_with = "lenient_i64")]
    pub qty: i64,

    #[serde(rename = "Note", default, deserialize_with = "lenient_string")]
    pub note: String,

    #[serde(rename = "SnFlag", default, deserialize_with = "lenient_bool")]
    pub is_serialized: bool,

    #[serde(rename = "Tracking-Lot Number", default, deserialize_with = "lenient_string")]
    pub tracking_lot: String,

    #[serde(rename = "Tracking-Revision Level", default, deserialize_with = "lenient_string")]
    pub tracking_revision: String,

    #[serde(rename = "Tracking-Expiration Date", default, deserialize_with = "lenient_string")]
    pub tracking_expiration: String,
}

impl CycleRecord {
    /// Creates a record with no location, note or tracking values.
    pub fn new(part_number: impl Into<String>, qty: i64, is_serialized: bool) -> Self {
        CycleRecord {
            part_number: part_number.into(),
            location: String::new(),
            qty,
            note: String::new(),
            is_serialized,
            tracking_lot: String::new(),
            tracking_revision: String::new(),
            tracking_expiration: String::new(),
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// Cell value for an import column, by ERP header name.
    pub fn column(&self, header: &str) -> Option<String> {
        let value = match header {
            "PartNumber" => self.part_number.clone(),
            "Location" => self.location.clone(),
            "Qty" => self.qty.to_string(),
            "Note" => self.note.clone(),
            "Tracking-Lot Number" => self.tracking_lot.clone(),
            "Tracking-Revision Level" => self.tracking_revision.clone(),
            "Tracking-Expiration Date" => self.tracking_expiration.clone(),
            _ => return None,
        };
        Some(value)
    }
}

// =============================================================================
// Merge
// =============================================================================

/// Merges QOH and cycle-out records, applying overrides.
///
/// QOH records keep their order; appended cycle-out records and overrides
/// follow in cycle-out order. Records with an empty part number never
/// survive.
pub fn merge_cycle_data(
    qoh: Vec<CycleRecord>,
    cycle_out: Vec<CycleRecord>,
    overrides: &HashMap<String, CycleRecord>,
) -> Vec<CycleRecord> {
    let mut existing: HashSet<String> = qoh
        .iter()
        .filter(|r| !r.part_number.is_empty())
        .map(|r| r.part_number.clone())
        .collect();
    let mut to_remove: HashSet<String> = HashSet::new();
    let mut processed: HashSet<String> = HashSet::new();
    let mut working = qoh;

    for record in cycle_out {
        let part = record.part_number.clone();
        if part.is_empty() || processed.contains(&part) {
            continue;
        }

        if let Some(over) = overrides.get(&part) {
            working.push(over.clone());
            processed.insert(part);
            continue;
        }
        processed.insert(part.clone());

        let in_qoh = existing.contains(&part);
        if in_qoh && record.is_serialized {
            to_remove.insert(part);
        } else if !in_qoh && !record.is_serialized {
            existing.insert(part);
            working.push(record);
        }
    }

    working.retain(|r| !to_remove.contains(&r.part_number));
    dedup_keep_last(working)
}

/// One record per part number: the last value wins, placed where the part
/// first appeared.
fn dedup_keep_last(records: Vec<CycleRecord>) -> Vec<CycleRecord> {
    let mut slot: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<CycleRecord> = Vec::with_capacity(records.len());

    for record in records {
        if record.part_number.is_empty() {
            continue;
        }
        match slot.get(&record.part_number) {
            Some(&idx) => out[idx] = record,
            None => {
                slot.insert(record.part_number.clone(), out.len());
                out.push(record);
            }
        }
    }
    out
}

// =============================================================================
// Lenient ERP Column Decoding
// =============================================================================
//
// The ERP data-query endpoint returns every column as whatever its JDBC
// driver produced: numbers may be strings, flags may be 0/1 or booleans, and
// any column may be null.

pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

pub(crate) fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = serde_json::Value::deserialize(deserializer)?;
    match &value {
        serde_json::Value::Null => Ok(0),
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .ok_or_else(|| D::Error::custom(format!("invalid number: {}", n))),
        serde_json::Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .or_else(|_| s.parse::<f64>().map(|f| f.trunc() as i64))
                .map_err(|_| D::Error::custom(format!("invalid number: {:?}", s)))
        }
        serde_json::Value::Bool(b) => Ok(i64::from(*b)),
        other => Err(D::Error::custom(format!("expected a number, got {}", other))),
    }
}

pub(crate) fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = serde_json::Value::deserialize(deserializer)?;
    match &value {
        serde_json::Value::Null => Ok(false),
        serde_json::Value::Bool(b) => Ok(*b),
        serde_json::Value::Number(n) => Ok(n.as_f64().map(|f| f != 0.0).unwrap_or(false)),
        serde_json::Value::String(s) => match s.trim().to_lowercase().as_str() {
            "1" | "true" | "t" | "yes" => Ok(true),
            "0" | "false" | "f" | "no" | "" => Ok(false),
            other => Err(D::Error::custom(format!("invalid flag: {:?}", other))),
        },
        other => Err(D::Error::custom(format!("expected a flag, got {}", other))),
    }
}

// =============================================================================
// Persisted Timestamps
// =============================================================================
//
// Documents written by earlier releases carry naive local timestamps
// (`2025-03-01T10:00:00.123456`); current ones carry RFC 3339.

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }

    let naive = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())?;

    // Skipped local times (DST gap) fall back to reading the value as UTC.
    Some(
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|at| at.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive)),
    )
}

pub(crate) fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {:?}", raw)))
}

pub(crate) fn lenient_timestamp_opt<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {:?}", raw))),
    }
}
