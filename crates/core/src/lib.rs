//! # Unibridge Core
//!
//! Provider-agnostic unification logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - The provider adapter contract and call context
//! - The adapter registry
//! - Field mapping snapshots and translation
//! - The unification engine, write service and sync orchestrator
//!
//! ## Architecture Principles
//! - Only depends on `unibridge-common` and `unibridge-domain`
//! - No database, HTTP, or provider-specific code
//! - All external dependencies via traits
//! - Transforms are pure; I/O happens only in adapter `push`/`pull` and
//!   storage ports

pub mod adapter;
pub mod engine;
pub mod gateway;
pub mod mapping;
pub mod registry;
pub mod sync;
pub mod write;

// Infrastructure ports
pub mod record_ports;

// Re-export specific items to avoid ambiguity
pub use adapter::{CallContext, ProviderAdapter, SecretDecryptor, Unified};
pub use engine::UnificationEngine;
pub use gateway::ProviderGateway;
pub use mapping::{FieldMappingStore, MappingRepository, MappingSnapshot};
pub use record_ports::{ConnectionRepository, RecordStore};
pub use registry::{AdapterRegistry, AdapterRegistryBuilder};
pub use sync::SyncOrchestrator;
pub use write::WriteService;
