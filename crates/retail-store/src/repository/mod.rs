//! # Repository Module
//!
//! Operations over the two JSON documents.
//!
//! ## Available Repositories
//!
//! - [`InventoryStore`](inventory::InventoryStore) - Tracked SKUs, runtime
//!   config, audit log
//! - [`ErrorLog`](errors::ErrorLog) - Error entries, dedup, resolution,
//!   notification

pub mod errors;
pub mod inventory;
