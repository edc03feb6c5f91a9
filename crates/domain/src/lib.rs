//! # Unibridge Domain
//!
//! Business domain types for the Unibridge unification layer.
//!
//! This crate contains:
//! - The provider and object type catalogue (`Provider`, `ObjectType`,
//!   `AdapterKey`)
//! - Canonical objects and their typed field sets
//! - Field mappings, connections and provider payload shapes
//! - Sync state, reports and records
//! - The `UnibridgeError` taxonomy and `Result` alias
//! - Configuration structures
//!
//! ## Architecture
//! - Depends only on `unibridge-common` (error classification, no runtime)
//! - No I/O, no async, no provider knowledge beyond the catalogue

pub mod config;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
