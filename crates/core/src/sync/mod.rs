//! Sync orchestration
//!
//! Pulls provider objects page by page for one `(connection, object type)`
//! pair, unifies them and upserts canonical records.

pub mod merge;
pub mod orchestrator;

pub use orchestrator::SyncOrchestrator;
