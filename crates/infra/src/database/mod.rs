//! SQLite persistence for connections, canonical records and field mappings

pub mod connection_repository;
pub mod manager;
pub mod mapping_repository;
pub mod record_repository;

pub use connection_repository::SqliteConnectionRepository;
pub use manager::{DbManager, SqliteConnection};
pub use mapping_repository::SqliteMappingRepository;
pub use record_repository::SqliteRecordStore;
