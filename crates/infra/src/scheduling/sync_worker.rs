//! Periodic sync of every active connection.
//!
//! Each tick lists the active connections and runs
//! [`SyncOrchestrator::sync_connection`] for each with the configured object
//! types. The first tick fires as soon as the worker starts. A failing pair is
//! logged and retried on the next tick; a failing connection never stops the
//! others.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use unibridge_core::{ConnectionRepository, SyncOrchestrator};
use unibridge_domain::{ObjectType, Result, SyncConfig, SyncReport};
use uuid::Uuid;

use crate::scheduling::error::{WorkerError, WorkerResult};

type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct SyncWorkerConfig {
    pub interval: Duration,
    /// Object types synced for each connection
    pub object_types: Vec<ObjectType>,
}

impl From<&SyncConfig> for SyncWorkerConfig {
    fn from(config: &SyncConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_secs),
            object_types: config.object_types.clone(),
        }
    }
}

impl Default for SyncWorkerConfig {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

/// Outcome counts of one pass over the active connections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub connections: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Pairs stopped by shutdown, with or without persisted pages
    pub cancelled: usize,
}

impl TickSummary {
    fn record(
        &mut self,
        connection_id: Uuid,
        object_type: ObjectType,
        result: &Result<SyncReport>,
    ) {
        match result {
            Ok(_) => self.succeeded += 1,
            Err(e) if e.is_cancellation() => {
                self.cancelled += 1;
                debug!(%connection_id, %object_type, "sync cancelled");
            }
            Err(e) => {
                self.failed += 1;
                warn!(%connection_id, %object_type, error = %e, "scheduled sync failed");
            }
        }
    }
}

struct SyncPass {
    orchestrator: Arc<SyncOrchestrator>,
    connections: Arc<dyn ConnectionRepository>,
    object_types: Vec<ObjectType>,
}

impl SyncPass {
    async fn run(&self, cancel: &CancellationToken) -> TickSummary {
        let mut summary = TickSummary::default();

        let connections = match self.connections.list_active().await {
            Ok(connections) => connections,
            Err(e) => {
                error!(error = %e, "failed to list active connections");
                return summary;
            }
        };
        summary.connections = connections.len();

        for connection in &connections {
            if cancel.is_cancelled() {
                break;
            }
            let results =
                self.orchestrator.sync_connection(connection, &self.object_types, cancel).await;

            for (object_type, result) in &results {
                summary.record(connection.id, *object_type, result);
            }
        }

        summary
    }
}

/// Background worker driving periodic syncs
pub struct SyncWorker {
    pass: Arc<SyncPass>,
    interval: Duration,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl SyncWorker {
    /// Worker over the orchestrator and the connection repository. Not started.
    pub fn new(
        orchestrator: Arc<SyncOrchestrator>,
        connections: Arc<dyn ConnectionRepository>,
        config: SyncWorkerConfig,
    ) -> Self {
        Self {
            pass: Arc::new(SyncPass {
                orchestrator,
                connections,
                object_types: config.object_types,
            }),
            interval: config.interval,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Spawn the sync loop.
    ///
    /// # Errors
    /// Returns [`WorkerError::AlreadyRunning`] if the loop is active.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> WorkerResult<()> {
        if self.is_running() {
            return Err(WorkerError::AlreadyRunning);
        }

        // Fresh token so a stopped worker can be restarted
        self.cancellation_token = CancellationToken::new();

        let pass = Arc::clone(&self.pass);
        let interval = self.interval;
        let cancel = self.cancellation_token.clone();
        let handle = tokio::spawn(async move {
            Self::sync_loop(pass, interval, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);
        info!(interval_secs = self.interval.as_secs(), "sync worker started");
        Ok(())
    }

    /// Cancel the loop, including any sync in flight, and wait for it.
    ///
    /// # Errors
    /// Returns [`WorkerError::NotRunning`] if the loop is not active and
    /// [`WorkerError::Timeout`] if it does not finish in time.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> WorkerResult<()> {
        if !self.is_running() {
            return Err(WorkerError::NotRunning);
        }

        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            tokio::time::timeout(STOP_TIMEOUT, handle)
                .await
                .map_err(|_| WorkerError::Timeout { seconds: STOP_TIMEOUT.as_secs() })??;
        }

        info!("sync worker stopped");
        Ok(())
    }

    /// True while the background loop is alive.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Run a single pass now, outside the schedule.
    pub async fn run_once(&self) -> TickSummary {
        self.pass.run(&self.cancellation_token).await
    }

    async fn sync_loop(pass: Arc<SyncPass>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("sync loop cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    let started = Instant::now();
                    let summary = pass.run(&cancel).await;
                    info!(
                        connections = summary.connections,
                        succeeded = summary.succeeded,
                        failed = summary.failed,
                        cancelled = summary.cancelled,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "sync tick finished"
                    );
                }
            }
        }
    }
}

impl Drop for SyncWorker {
    fn drop(&mut self) {
        if !self.cancellation_token.is_cancelled() {
            self.cancellation_token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tempfile::TempDir;
    use unibridge_common::SecretCipher;
    use unibridge_core::{AdapterRegistry, FieldMappingStore, ProviderGateway, UnificationEngine};
    use unibridge_domain::{Connection, Provider, Result, SealedSecret};
    use unibridge_domain::{PartialSyncFailure, UnibridgeError};

    use super::*;
    use crate::database::{DbManager, SqliteRecordStore};
    use crate::secrets::AesSecretDecryptor;

    struct StaticConnections {
        connections: Vec<Connection>,
        listed: AtomicUsize,
    }

    #[async_trait]
    impl ConnectionRepository for StaticConnections {
        async fn save(&self, _connection: &Connection) -> Result<()> {
            Ok(())
        }

        async fn find(&self, id: Uuid) -> Result<Option<Connection>> {
            Ok(self.connections.iter().find(|c| c.id == id).cloned())
        }

        async fn list_active(&self) -> Result<Vec<Connection>> {
            self.listed.fetch_add(1, Ordering::SeqCst);
            Ok(self.connections.clone())
        }

        async fn deactivate(&self, _id: Uuid) -> Result<()> {
            Ok(())
        }
    }

    struct Harness {
        worker: SyncWorker,
        repo: Arc<StaticConnections>,
        _temp_dir: TempDir,
    }

    fn harness(connections: Vec<Connection>, interval: Duration) -> Harness {
        let temp_dir = TempDir::new().unwrap();
        let db = Arc::new(DbManager::new(temp_dir.path().join("worker.db"), 1).unwrap());
        db.run_migrations().unwrap();

        let registry = Arc::new(AdapterRegistry::builder().build());
        let engine = Arc::new(UnificationEngine::new(registry, Arc::new(FieldMappingStore::new())));
        let decryptor =
            Arc::new(AesSecretDecryptor::from_hex(&SecretCipher::generate_key_hex()).unwrap());
        let orchestrator = Arc::new(SyncOrchestrator::new(
            engine,
            Arc::new(ProviderGateway::default()),
            Arc::new(SqliteRecordStore::new(db)),
            decryptor,
        ));

        let repo = Arc::new(StaticConnections { connections, listed: AtomicUsize::new(0) });
        let config = SyncWorkerConfig { interval, object_types: ObjectType::ALL.to_vec() };
        let worker = SyncWorker::new(orchestrator, repo.clone(), config);
        Harness { worker, repo, _temp_dir: temp_dir }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn lifecycle() {
        let Harness { mut worker, repo, _temp_dir } =
            harness(Vec::new(), Duration::from_secs(3600));
        assert!(!worker.is_running());

        worker.start().await.unwrap();
        assert!(worker.is_running());
        assert!(matches!(worker.start().await, Err(WorkerError::AlreadyRunning)));

        worker.stop().await.unwrap();
        assert!(!worker.is_running());
        assert!(matches!(worker.stop().await, Err(WorkerError::NotRunning)));
        assert!(repo.listed.load(Ordering::SeqCst) <= 1);

        worker.start().await.unwrap();
        worker.stop().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn connections_without_adapters_are_skipped() {
        let connection =
            Connection::new("user-1", "org-1", Provider::Zendesk, SealedSecret::new("v1:x"));
        let Harness { worker, repo, _temp_dir } =
            harness(vec![connection], Duration::from_secs(3600));

        let summary = worker.run_once().await;
        assert_eq!(summary, TickSummary { connections: 1, ..TickSummary::default() });
        assert_eq!(repo.listed.load(Ordering::SeqCst), 1);
    }

    fn partial(cancelled: bool) -> UnibridgeError {
        PartialSyncFailure {
            connection_id: Uuid::now_v7(),
            provider: Provider::Zendesk,
            object_type: ObjectType::Ticket,
            pages_synced: 2,
            records_synced: 4,
            resume_cursor: Some("page-2".into()),
            reason: if cancelled { "Operation cancelled".into() } else { "HTTP 503".into() },
            retryable: true,
            cancelled,
        }
        .into()
    }

    #[test]
    fn cancellation_after_persisted_pages_is_not_a_failure() {
        let mut summary = TickSummary::default();
        let id = Uuid::now_v7();

        summary.record(id, ObjectType::Ticket, &Err(UnibridgeError::Cancelled));
        summary.record(id, ObjectType::Ticket, &Err(partial(true)));
        summary.record(id, ObjectType::Comment, &Err(partial(false)));

        assert_eq!(summary, TickSummary { cancelled: 2, failed: 1, ..TickSummary::default() });
    }
}
