//! # Validation Module
//!
//! Input rules applied before anything reaches the store or the ERP.
//!
//! ## Where Validation Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  caller input (CLI, scheduler config change, manual SKU edit)          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  THIS MODULE: normalize + business rules                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  retail-store (duplicate SKU check)  /  ERP query (quoted SKU)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use retail_core::validation::{normalize_sku, validate_interval};
//!
//! assert_eq!(normalize_sku("  mug-blue ").unwrap(), "MUG-BLUE");
//! assert!(validate_interval("sync_interval_minutes", 0).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{ConfigUpdate, NewSku, SkuUpdate};
use crate::{MAX_INTERVAL_MINUTES, MIN_INTERVAL_MINUTES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_SKU_LEN: usize = 50;
const MAX_NAME_LEN: usize = 200;
const MAX_NOTES_LEN: usize = 1000;

// =============================================================================
// String Validators
// =============================================================================

/// Trims and upper-cases a SKU, then validates it.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, `-`, `_`, `.`, `/` and inner spaces only
pub fn normalize_sku(sku: &str) -> ValidationResult<String> {
    let sku = sku.trim().to_uppercase();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.chars().count() > MAX_SKU_LEN {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: MAX_SKU_LEN,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ' '))
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, spaces, and - _ . /".to_string(),
        });
    }

    Ok(sku)
}

/// Validates a product name.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "product_name".to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "product_name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

fn validate_notes(notes: &str) -> ValidationResult<()> {
    if notes.chars().count() > MAX_NOTES_LEN {
        return Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_NOTES_LEN,
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a scheduler interval in minutes (1..=180).
pub fn validate_interval(field: &str, minutes: u32) -> ValidationResult<()> {
    if !(MIN_INTERVAL_MINUTES..=MAX_INTERVAL_MINUTES).contains(&minutes) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: i64::from(MIN_INTERVAL_MINUTES),
            max: i64::from(MAX_INTERVAL_MINUTES),
        });
    }
    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates and normalizes a new tracked SKU.
///
/// Quantities are not range-checked: an oversold SKU may legitimately be
/// re-entered with a negative count.
pub fn validate_new_sku(mut input: NewSku) -> ValidationResult<NewSku> {
    input.sku = normalize_sku(&input.sku)?;
    validate_product_name(&input.product_name)?;
    validate_notes(&input.notes)?;
    input.product_name = input.product_name.trim().to_string();
    input.part_number = input.part_number.trim().to_string();
    Ok(input)
}

/// Validates a manual SKU edit.
pub fn validate_sku_update(update: &SkuUpdate) -> ValidationResult<()> {
    if let Some(name) = &update.product_name {
        validate_product_name(name)?;
    }
    if let Some(notes) = &update.notes {
        validate_notes(notes)?;
    }
    Ok(())
}

/// Validates a runtime config update.
pub fn validate_config_update(update: &ConfigUpdate) -> ValidationResult<()> {
    if let Some(minutes) = update.sync_interval_minutes {
        validate_interval("sync_interval_minutes", minutes)?;
    }
    if let Some(minutes) = update.sales_interval_minutes {
        validate_interval("sales_interval_minutes", minutes)?;
    }
    Ok(())
}
