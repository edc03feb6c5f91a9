//! Sync orchestrator - pull, unify, persist
//!
//! Runs for the same `(connection, object type)` pair are serialized by a
//! per-pair lock; runs for different pairs are independent. Within a run,
//! page N+1 is requested only after page N has been unified and persisted,
//! and cancellation is observed between pages. Persisted pages are never
//! rolled back.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::join_all;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use unibridge_common::ErrorClassification;
use unibridge_domain::{
    ActionType, AdapterKey, CanonicalRecord, Connection, ObjectType, OverlapPolicy,
    PartialSyncFailure, ProviderCallError, PullSelector, Result, SyncConfig, SyncReport,
    SyncRequest, SyncState, SyncStatus, UnibridgeError,
};
use uuid::Uuid;

use super::merge;
use crate::adapter::{CallContext, ProviderAdapter, SecretDecryptor};
use crate::engine::UnificationEngine;
use crate::gateway::ProviderGateway;
use crate::record_ports::RecordStore;

type PairKey = (Uuid, ObjectType);

/// Per-run counters
#[derive(Debug, Default)]
struct Progress {
    pages: u32,
    records: u64,
    /// Cursor of the page currently being fetched
    cursor: Option<String>,
    /// Run iterated over parent objects; a single cursor cannot resume it
    fan_out: bool,
}

impl Progress {
    fn resume_cursor(&self) -> Option<String> {
        if self.fan_out {
            None
        } else {
            self.cursor.clone()
        }
    }
}

/// Everything a page fetch needs, fixed for the duration of a run
struct RunScope<'a> {
    ctx: &'a CallContext,
    adapter: &'a dyn ProviderAdapter,
    key: AdapterKey,
    organization_id: &'a str,
    connection_id: Uuid,
}

pub struct SyncOrchestrator {
    engine: Arc<UnificationEngine>,
    gateway: Arc<ProviderGateway>,
    records: Arc<dyn RecordStore>,
    decryptor: Arc<dyn SecretDecryptor>,
    locks: DashMap<PairKey, Arc<Mutex<()>>>,
    statuses: DashMap<PairKey, SyncStatus>,
    overlap: OverlapPolicy,
    page_timeout: Duration,
}

impl SyncOrchestrator {
    /// Orchestrator with the default sync configuration.
    pub fn new(
        engine: Arc<UnificationEngine>,
        gateway: Arc<ProviderGateway>,
        records: Arc<dyn RecordStore>,
        decryptor: Arc<dyn SecretDecryptor>,
    ) -> Self {
        let defaults = SyncConfig::default();
        Self {
            engine,
            gateway,
            records,
            decryptor,
            locks: DashMap::new(),
            statuses: DashMap::new(),
            overlap: defaults.overlap,
            page_timeout: Duration::from_secs(defaults.page_timeout_secs),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: &SyncConfig) -> Self {
        self.overlap = config.overlap;
        self.page_timeout = Duration::from_secs(config.page_timeout_secs);
        self
    }

    #[must_use]
    pub fn with_overlap_policy(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }

    #[must_use]
    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = timeout;
        self
    }

    /// Latest state of a pair; `Pending` if it never ran.
    pub fn status(&self, connection_id: Uuid, object_type: ObjectType) -> SyncStatus {
        self.statuses
            .get(&(connection_id, object_type))
            .map_or_else(SyncStatus::pending, |s| s.value().clone())
    }

    /// Run one sync for a `(connection, object type)` pair.
    ///
    /// # Errors
    /// - `UnsupportedProvider` if no adapter serves the pair
    /// - `SyncInProgress` under [`OverlapPolicy::Reject`] when the pair is busy
    /// - `PartialSync` when at least one page was persisted (or the run was a
    ///   resume) before the failure, carrying the cursor to resume from
    /// - the underlying error otherwise
    #[instrument(skip(self, request, cancel), fields(
        connection_id = %request.connection.id,
        provider = %request.connection.provider,
        object_type = %request.object_type
    ))]
    pub async fn run(
        &self,
        request: SyncRequest,
        cancel: &CancellationToken,
    ) -> Result<SyncReport> {
        let key = AdapterKey::new(request.connection.provider, request.object_type);
        let adapter = self.engine.registry().resolve(key)?;
        let pair = (request.connection.id, request.object_type);

        let lock = Arc::clone(self.locks.entry(pair).or_default().value());
        self.statuses.entry(pair).or_insert_with(SyncStatus::pending);

        let _guard = match self.overlap {
            OverlapPolicy::Reject => lock.try_lock_owned().map_err(|_| {
                debug!("sync already running, rejecting trigger");
                UnibridgeError::SyncInProgress {
                    connection_id: request.connection.id,
                    object_type: request.object_type,
                }
            })?,
            OverlapPolicy::Queue => tokio::select! {
                guard = lock.lock_owned() => guard,
                () = cancel.cancelled() => return Err(UnibridgeError::Cancelled),
            },
        };

        self.set_status(pair, SyncState::Running, None);
        let started_at = Utc::now();
        info!(resume_from = ?request.resume_from, "sync.started");

        let mut progress = Progress { cursor: request.resume_from.clone(), ..Progress::default() };
        let outcome = self.execute(&request, adapter.as_ref(), key, cancel, &mut progress).await;

        match outcome {
            Ok(()) => {
                let report =
                    Self::report(&request, SyncState::Succeeded, &progress, None, started_at);
                info!(
                    pages = report.pages_synced,
                    records = report.records_synced,
                    "sync.succeeded"
                );
                self.set_status(pair, SyncState::Succeeded, Some(report.clone()));
                Ok(report)
            }
            Err(err) => {
                let report = Self::report(
                    &request,
                    SyncState::Failed,
                    &progress,
                    Some(err.to_string()),
                    started_at,
                );
                warn!(
                    pages = report.pages_synced,
                    records = report.records_synced,
                    resume_cursor = ?report.resume_cursor,
                    error = %err,
                    "sync.failed"
                );
                self.set_status(pair, SyncState::Failed, Some(report));
                Err(Self::failure(err, &request, &progress))
            }
        }
    }

    /// Sync several object types of one connection.
    ///
    /// Object types whose adapter needs a parent run after the others so they
    /// see the parents persisted by this pass. Types without an adapter for
    /// the connection's provider are skipped.
    #[instrument(skip_all, fields(connection_id = %connection.id, provider = %connection.provider))]
    pub async fn sync_connection(
        &self,
        connection: &Connection,
        object_types: &[ObjectType],
        cancel: &CancellationToken,
    ) -> Vec<(ObjectType, Result<SyncReport>)> {
        let registry = self.engine.registry();
        let mut roots = Vec::new();
        let mut children = Vec::new();

        for &object_type in object_types {
            match registry.resolve(AdapterKey::new(connection.provider, object_type)) {
                Ok(adapter) if adapter.requires_parent() => children.push(object_type),
                Ok(_) => roots.push(object_type),
                Err(_) => debug!(%object_type, "no adapter for object type, skipping"),
            }
        }

        let mut results = self.run_all(connection, &roots, cancel).await;
        results.extend(self.run_all(connection, &children, cancel).await);
        results
    }

    async fn run_all(
        &self,
        connection: &Connection,
        object_types: &[ObjectType],
        cancel: &CancellationToken,
    ) -> Vec<(ObjectType, Result<SyncReport>)> {
        let runs = object_types.iter().map(|&object_type| async move {
            let request = SyncRequest::new(connection.clone(), object_type);
            (object_type, self.run(request, cancel).await)
        });
        join_all(runs).await
    }

    async fn execute(
        &self,
        request: &SyncRequest,
        adapter: &dyn ProviderAdapter,
        key: AdapterKey,
        cancel: &CancellationToken,
        progress: &mut Progress,
    ) -> Result<()> {
        let ctx = CallContext::new(request.connection.clone(), Arc::clone(&self.decryptor));
        let scope = RunScope {
            ctx: &ctx,
            adapter,
            key,
            organization_id: &request.connection.organization_id,
            connection_id: request.connection.id,
        };
        self.engine.mappings().ensure_loaded(scope.organization_id).await?;

        match (adapter.parent_object_type(), &request.selector) {
            (Some(parent_type), PullSelector::All) => {
                let parents =
                    self.records.list_by_connection(scope.connection_id, parent_type).await?;
                debug!(parents = parents.len(), %parent_type, "syncing children per parent");
                progress.fan_out = true;

                for parent in parents {
                    let selector = PullSelector::ChildrenOf(parent.remote_id.clone());
                    self.drain(&scope, &selector, Some(parent.object.id), None, cancel, progress)
                        .await?;
                }
                Ok(())
            }
            (Some(parent_type), PullSelector::ChildrenOf(parent_remote_id)) => {
                let parent_id = self
                    .records
                    .find_by_remote_id(scope.connection_id, parent_type, parent_remote_id)
                    .await?
                    .map(|p| p.object.id);
                let start = request.resume_from.clone();
                self.drain(&scope, &request.selector, parent_id, start, cancel, progress).await
            }
            _ => {
                let start = request.resume_from.clone();
                self.drain(&scope, &request.selector, None, start, cancel, progress).await
            }
        }
    }

    async fn drain(
        &self,
        scope: &RunScope<'_>,
        selector: &PullSelector,
        parent_id: Option<Uuid>,
        start: Option<String>,
        cancel: &CancellationToken,
        progress: &mut Progress,
    ) -> Result<()> {
        let mut cursor = start;
        loop {
            progress.cursor.clone_from(&cursor);
            if cancel.is_cancelled() {
                info!(pages = progress.pages, "sync.cancelled");
                return Err(UnibridgeError::Cancelled);
            }

            let page = self.sync_page(scope, selector, parent_id, cursor.as_deref());
            let (persisted, next) = tokio::time::timeout(self.page_timeout, page)
                .await
                .map_err(|_| ProviderCallError::timeout(scope.key, ActionType::Pull))??;

            progress.pages += 1;
            progress.records += persisted as u64;
            info!(page = progress.pages, records = persisted, "sync.page_persisted");

            match next {
                None => return Ok(()),
                Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                    return Err(ProviderCallError::decode(
                        scope.key,
                        ActionType::Pull,
                        format!("pagination cursor did not advance: {next}"),
                    )
                    .into());
                }
                Some(next) => cursor = Some(next),
            }
        }
    }

    /// Pull, unify and persist one page. Returns the number of records
    /// persisted and the next cursor.
    async fn sync_page(
        &self,
        scope: &RunScope<'_>,
        selector: &PullSelector,
        parent_id: Option<Uuid>,
        cursor: Option<&str>,
    ) -> Result<(usize, Option<String>)> {
        let page = self.gateway.pull_page(scope.adapter, scope.ctx, selector, cursor).await?;

        for item in &page.items {
            let pulled = self.engine.unify_for_read(item, scope.key, scope.organization_id)?;
            let remote_id = pulled
                .remote_id
                .clone()
                .or_else(|| item.remote_id())
                .ok_or_else(|| UnibridgeError::transform(scope.key, "provider object has no id"))?;

            let existing = self
                .records
                .find_by_remote_id(scope.connection_id, scope.key.object_type, &remote_id)
                .await?;
            let mut object = merge::merge_pulled(existing.map(|r| r.object), pulled);
            object.remote_id = Some(remote_id.clone());
            if let Some(parent_id) = parent_id {
                merge::link_parent(&mut object, parent_id);
            }

            let record = CanonicalRecord {
                connection_id: scope.connection_id,
                provider: scope.key.provider,
                remote_id,
                object,
                synced_at: Utc::now(),
            };
            self.records.upsert(&record).await?;
        }

        Ok((page.items.len(), page.next_cursor))
    }

    fn set_status(&self, pair: PairKey, state: SyncState, report: Option<SyncReport>) {
        let mut status = self.statuses.entry(pair).or_insert_with(SyncStatus::pending);
        status.state = state;
        status.updated_at = Utc::now();
        if report.is_some() {
            status.last_report = report;
        }
    }

    fn report(
        request: &SyncRequest,
        state: SyncState,
        progress: &Progress,
        error: Option<String>,
        started_at: DateTime<Utc>,
    ) -> SyncReport {
        let resume_cursor = match state {
            SyncState::Failed => progress.resume_cursor(),
            _ => None,
        };
        SyncReport {
            connection_id: request.connection.id,
            provider: request.connection.provider,
            object_type: request.object_type,
            state,
            pages_synced: progress.pages,
            records_synced: progress.records,
            resume_cursor,
            error,
            started_at,
            finished_at: Utc::now(),
        }
    }

    fn failure(err: UnibridgeError, request: &SyncRequest, progress: &Progress) -> UnibridgeError {
        if progress.pages == 0 && request.resume_from.is_none() {
            return err;
        }

        let cancelled = matches!(err, UnibridgeError::Cancelled);
        let retryable = err.is_retryable() || cancelled;
        PartialSyncFailure {
            connection_id: request.connection.id,
            provider: request.connection.provider,
            object_type: request.object_type,
            pages_synced: progress.pages,
            records_synced: progress.records,
            resume_cursor: progress.resume_cursor(),
            reason: err.to_string(),
            retryable,
            cancelled,
        }
        .into()
    }
}
