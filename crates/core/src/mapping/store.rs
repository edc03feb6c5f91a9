//! Snapshot-based field mapping store
//!
//! Readers clone an `Arc<MappingSnapshot>` and never observe a half-written
//! table. Writers take an exclusive per-organization lock, build the next
//! snapshot from a copy of the current one and swap it in.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use unibridge_domain::{AdapterKey, FieldMapping, Result, UnibridgeError};
use uuid::Uuid;

use super::ports::MappingRepository;

/// Immutable view of one organization's active mappings
#[derive(Debug, Clone, Default)]
pub struct MappingSnapshot {
    organization_id: String,
    version: u64,
    by_key: HashMap<AdapterKey, Vec<FieldMapping>>,
}

impl MappingSnapshot {
    fn empty(organization_id: &str) -> Self {
        Self { organization_id: organization_id.to_string(), ..Self::default() }
    }

    fn from_mappings(organization_id: &str, mappings: Vec<FieldMapping>) -> Self {
        let mut snapshot = Self::empty(organization_id);
        for mapping in mappings.into_iter().filter(|m| m.active) {
            snapshot.insert(mapping);
        }
        snapshot
    }

    /// Organization this snapshot belongs to.
    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }

    /// Incremented on every change; 0 for a snapshot never written.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Active mappings for one `(provider, object type)`.
    pub fn for_key(&self, key: AdapterKey) -> &[FieldMapping] {
        self.by_key.get(&key).map_or(&[], Vec::as_slice)
    }

    /// Number of active mappings across all keys.
    pub fn len(&self) -> usize {
        self.by_key.values().map(Vec::len).sum()
    }

    /// True when the organization has no active mapping.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slot mapped to a provider field, if any.
    pub fn slot_for_remote(&self, key: AdapterKey, remote_field_id: &str) -> Option<&str> {
        self.for_key(key)
            .iter()
            .find(|m| m.remote_field_id == remote_field_id)
            .map(|m| m.standard_slot.as_str())
    }

    fn insert(&mut self, mapping: FieldMapping) -> Option<FieldMapping> {
        let entries = self.by_key.entry(mapping.key()).or_default();
        let superseded = entries
            .iter()
            .position(|m| m.same_slot(&mapping))
            .map(|idx| entries.remove(idx));
        entries.push(mapping);
        superseded
    }

    fn remove(&mut self, id: Uuid) -> Option<FieldMapping> {
        self.by_key.values_mut().find_map(|entries| {
            let idx = entries.iter().position(|m| m.id == id)?;
            Some(entries.remove(idx))
        })
    }
}

/// Concurrent store of per-organization mapping snapshots
#[derive(Default)]
pub struct FieldMappingStore {
    snapshots: DashMap<String, Arc<MappingSnapshot>>,
    writers: DashMap<String, Arc<Mutex<()>>>,
    repository: Option<Arc<dyn MappingRepository>>,
}

impl FieldMappingStore {
    /// In-memory store with no persistence
    pub fn new() -> Self {
        Self::default()
    }

    /// Store backed by a repository; snapshots are loaded lazily per
    /// organization.
    pub fn with_repository(repository: Arc<dyn MappingRepository>) -> Self {
        Self { repository: Some(repository), ..Self::default() }
    }

    /// Current snapshot for an organization. Never fails: an organization
    /// with no mappings, or one not loaded yet, gets an empty snapshot.
    pub fn snapshot(&self, organization_id: &str) -> Arc<MappingSnapshot> {
        self.snapshots
            .get(organization_id)
            .map(|s| Arc::clone(s.value()))
            .unwrap_or_else(|| Arc::new(MappingSnapshot::empty(organization_id)))
    }

    /// Snapshot for an organization whose mappings are in memory.
    ///
    /// # Errors
    /// `Internal` when the store is backed by a repository and the
    /// organization has not been loaded with [`Self::ensure_loaded`] or
    /// [`Self::hydrate`]. An in-memory store never fails.
    pub fn loaded_snapshot(&self, organization_id: &str) -> Result<Arc<MappingSnapshot>> {
        if let Some(existing) = self.snapshots.get(organization_id) {
            return Ok(Arc::clone(existing.value()));
        }
        if self.repository.is_some() {
            return Err(UnibridgeError::Internal(format!(
                "field mappings for organization {organization_id} are not loaded"
            )));
        }
        Ok(Arc::new(MappingSnapshot::empty(organization_id)))
    }

    /// Active mappings of one organization for one `(provider, object type)`.
    pub fn list(&self, organization_id: &str, key: AdapterKey) -> Vec<FieldMapping> {
        self.snapshot(organization_id).for_key(key).to_vec()
    }

    /// Snapshot for an organization, loading it from the repository the first
    /// time it is requested.
    pub async fn ensure_loaded(&self, organization_id: &str) -> Result<Arc<MappingSnapshot>> {
        if let Some(existing) = self.snapshots.get(organization_id) {
            return Ok(Arc::clone(existing.value()));
        }

        let lock = self.writer_lock(organization_id);
        let _guard = lock.lock().await;
        self.current_or_load(organization_id).await
    }

    /// Reload an organization's snapshot from the repository.
    #[instrument(skip(self))]
    pub async fn hydrate(&self, organization_id: &str) -> Result<usize> {
        let Some(repository) = &self.repository else {
            return Ok(self.snapshot(organization_id).len());
        };

        let lock = self.writer_lock(organization_id);
        let _guard = lock.lock().await;

        let mappings = repository.list_active(organization_id).await?;
        let previous = self.snapshot(organization_id).version;
        let mut snapshot = MappingSnapshot::from_mappings(organization_id, mappings);
        snapshot.version = previous + 1;

        let count = snapshot.len();
        self.snapshots.insert(organization_id.to_string(), Arc::new(snapshot));
        info!(count, "field mappings hydrated");
        Ok(count)
    }

    /// Add a mapping, superseding the active mapping of the same slot.
    ///
    /// Returns the superseded mapping.
    #[instrument(skip(self, mapping), fields(
        organization_id = %mapping.organization_id,
        slot = %mapping.standard_slot,
        key = %mapping.key()
    ))]
    pub async fn upsert(&self, mapping: FieldMapping) -> Result<Option<FieldMapping>> {
        mapping.validate()?;
        if !mapping.active {
            return Err(UnibridgeError::InvalidInput("cannot upsert an inactive mapping".into()));
        }

        let organization_id = mapping.organization_id.clone();
        let lock = self.writer_lock(&organization_id);
        let _guard = lock.lock().await;

        let current = self.current_or_load(&organization_id).await?;
        if let Some(repository) = &self.repository {
            repository.upsert_superseding(&mapping).await?;
        }

        let mut next = (*current).clone();
        next.version += 1;
        let superseded = next.insert(mapping);
        self.snapshots.insert(organization_id, Arc::new(next));

        if let Some(old) = &superseded {
            debug!(superseded_id = %old.id, "previous mapping superseded");
        }
        Ok(superseded.map(|mut old| {
            old.active = false;
            old
        }))
    }

    /// Deactivate a mapping by id.
    ///
    /// # Errors
    /// `NotFound` when the organization has no active mapping with this id.
    #[instrument(skip(self))]
    pub async fn deactivate(&self, organization_id: &str, id: Uuid) -> Result<FieldMapping> {
        let lock = self.writer_lock(organization_id);
        let _guard = lock.lock().await;

        let current = self.current_or_load(organization_id).await?;
        let mut next = (*current).clone();
        let mut removed = next
            .remove(id)
            .ok_or_else(|| UnibridgeError::NotFound(format!("field mapping {id}")))?;

        if let Some(repository) = &self.repository {
            repository.deactivate(organization_id, id).await?;
        }

        next.version += 1;
        self.snapshots.insert(organization_id.to_string(), Arc::new(next));
        removed.active = false;
        Ok(removed)
    }

    fn writer_lock(&self, organization_id: &str) -> Arc<Mutex<()>> {
        Arc::clone(self.writers.entry(organization_id.to_string()).or_default().value())
    }

    /// Caller must hold the organization's writer lock.
    async fn current_or_load(&self, organization_id: &str) -> Result<Arc<MappingSnapshot>> {
        if let Some(existing) = self.snapshots.get(organization_id) {
            return Ok(Arc::clone(existing.value()));
        }

        let snapshot = match &self.repository {
            Some(repository) => {
                let mappings = repository.list_active(organization_id).await?;
                MappingSnapshot::from_mappings(organization_id, mappings)
            }
            None => MappingSnapshot::empty(organization_id),
        };

        let snapshot = Arc::new(snapshot);
        self.snapshots.insert(organization_id.to_string(), Arc::clone(&snapshot));
        Ok(snapshot)
    }
}
