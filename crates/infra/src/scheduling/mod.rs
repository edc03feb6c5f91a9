//! Background scheduling
//!
//! The sync worker periodically syncs every active connection. It has an
//! explicit start/stop lifecycle, keeps the join handle of its task and stops
//! through a cancellation token that is also handed to running syncs.

pub mod error;
pub mod sync_worker;

pub use error::{WorkerError, WorkerResult};
pub use sync_worker::{SyncWorker, SyncWorkerConfig, TickSummary};
