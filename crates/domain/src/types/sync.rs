//! Sync state machine types
//!
//! Each `(connection, object type)` pair moves through
//! `Pending -> Running -> {Succeeded, Failed}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::connection::Connection;
use super::payload::PullSelector;
use super::provider::{ObjectType, Provider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl SyncState {
    /// True once the run has finished, successfully or not.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// One sync run scoped to a connection and object type
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub connection: Connection,
    pub object_type: ObjectType,
    pub selector: PullSelector,
    /// Cursor to continue a previously failed run from
    pub resume_from: Option<String>,
}

impl SyncRequest {
    /// Full sync of one object type from the start.
    pub fn new(connection: Connection, object_type: ObjectType) -> Self {
        Self { connection, object_type, selector: PullSelector::All, resume_from: None }
    }

    #[must_use]
    pub fn with_selector(mut self, selector: PullSelector) -> Self {
        self.selector = selector;
        self
    }

    #[must_use]
    pub fn resume_from(mut self, cursor: impl Into<String>) -> Self {
        self.resume_from = Some(cursor.into());
        self
    }
}

/// Outcome of a finished sync run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub connection_id: Uuid,
    pub provider: Provider,
    pub object_type: ObjectType,
    pub state: SyncState,
    pub pages_synced: u32,
    pub records_synced: u64,
    /// Cursor of the first page not yet persisted, set when the run failed
    pub resume_cursor: Option<String>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Latest known state of one pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub state: SyncState,
    pub updated_at: DateTime<Utc>,
    pub last_report: Option<SyncReport>,
}

impl SyncStatus {
    /// Status of a pair that has never run.
    pub fn pending() -> Self {
        Self { state: SyncState::Pending, updated_at: Utc::now(), last_report: None }
    }
}
