//! # Unibridge Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - Provider adapters (Zendesk tickets and comments, Freshsales contacts)
//! - SQLite record, mapping and connection stores
//! - Secret decryption and key management
//! - Configuration loading and tracing initialisation
//! - The periodic sync worker and application bootstrap
//!
//! ## Architecture
//! - Implements traits defined in `unibridge-core`
//! - Contains all "impure" code (HTTP, SQLite, keychain, environment)
//! - Infrastructure errors are converted to `UnibridgeError` at this boundary

pub mod bootstrap;
pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod key_manager;
pub mod observability;
pub mod scheduling;
pub mod secrets;

// Re-export commonly used items
pub use bootstrap::{build_registry, Unibridge};
pub use database::{
    DbManager, SqliteConnectionRepository, SqliteMappingRepository, SqliteRecordStore,
};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use integrations::freshsales::FreshsalesContactAdapter;
pub use integrations::zendesk::{ZendeskCommentAdapter, ZendeskTicketAdapter};
pub use key_manager::KeyManager;
pub use scheduling::{SyncWorker, WorkerError};
pub use secrets::AesSecretDecryptor;
