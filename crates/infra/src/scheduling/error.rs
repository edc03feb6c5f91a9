//! Worker error types

use thiserror::Error;
use unibridge_domain::UnibridgeError;

use crate::errors::InfraError;

/// Lifecycle errors of background workers
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker already running")]
    AlreadyRunning,

    #[error("worker not running")]
    NotRunning,

    /// The worker task did not finish within the stop deadline
    #[error("worker did not stop within {seconds}s")]
    Timeout { seconds: u64 },

    #[error("worker task failed: {0}")]
    TaskJoinFailed(String),
}

impl From<tokio::task::JoinError> for WorkerError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskJoinFailed(err.to_string())
    }
}

impl From<WorkerError> for InfraError {
    fn from(err: WorkerError) -> Self {
        let unified = match err {
            WorkerError::AlreadyRunning | WorkerError::NotRunning => {
                UnibridgeError::InvalidInput(err.to_string())
            }
            _ => UnibridgeError::Internal(err.to_string()),
        };
        InfraError(unified)
    }
}

impl From<WorkerError> for UnibridgeError {
    fn from(err: WorkerError) -> Self {
        InfraError::from(err).into()
    }
}

pub type WorkerResult<T> = Result<T, WorkerError>;
