//! Field mapping application
//!
//! [`FieldMappingStore`] keeps an immutable snapshot of each organization's
//! active mappings; [`translate`] applies a snapshot to a canonical object or
//! a provider response without touching the store.

pub mod ports;
pub mod store;
pub mod translate;

pub use ports::MappingRepository;
pub use store::{FieldMappingStore, MappingSnapshot};
