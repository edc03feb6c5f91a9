//! In-memory implementations of the core storage and secret ports

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use unibridge_core::{MappingRepository, RecordStore, SecretDecryptor};
use unibridge_domain::{
    AdapterKey, CanonicalRecord, FieldMapping, ObjectType, Result, SealedSecret, UnibridgeError,
};
use uuid::Uuid;
use zeroize::Zeroizing;

/// Record store keeping insertion order, last write wins per key.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: Mutex<Vec<CanonicalRecord>>,
    upserts: AtomicUsize,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, record: CanonicalRecord) -> Self {
        self.records.lock().unwrap().push(record);
        self
    }

    pub fn all(&self) -> Vec<CanonicalRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn upsert(&self, record: &CanonicalRecord) -> Result<()> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock().unwrap();
        let slot = records.iter_mut().find(|r| {
            r.connection_id == record.connection_id
                && r.object_type() == record.object_type()
                && r.remote_id == record.remote_id
        });
        match slot {
            Some(existing) => {
                let id = existing.object.id;
                *existing = record.clone();
                existing.object.id = id;
            }
            None => records.push(record.clone()),
        }
        Ok(())
    }

    async fn find_by_remote_id(
        &self,
        connection_id: Uuid,
        object_type: ObjectType,
        remote_id: &str,
    ) -> Result<Option<CanonicalRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| {
                r.connection_id == connection_id
                    && r.object_type() == object_type
                    && r.remote_id == remote_id
            })
            .cloned())
    }

    async fn find_by_id(&self, connection_id: Uuid, id: Uuid) -> Result<Option<CanonicalRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.connection_id == connection_id && r.object.id == id)
            .cloned())
    }

    async fn list_by_connection(
        &self,
        connection_id: Uuid,
        object_type: ObjectType,
    ) -> Result<Vec<CanonicalRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.connection_id == connection_id && r.object_type() == object_type)
            .cloned()
            .collect())
    }
}

/// Mapping repository with the same supersede semantics as the SQLite one.
#[derive(Default)]
pub struct InMemoryMappingRepository {
    mappings: Mutex<Vec<FieldMapping>>,
}

impl InMemoryMappingRepository {
    pub fn new(seed: Vec<FieldMapping>) -> Self {
        Self { mappings: Mutex::new(seed) }
    }

    pub fn all(&self) -> Vec<FieldMapping> {
        self.mappings.lock().unwrap().clone()
    }
}

#[async_trait]
impl MappingRepository for InMemoryMappingRepository {
    async fn list_active(&self, organization_id: &str) -> Result<Vec<FieldMapping>> {
        Ok(self
            .mappings
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.active && m.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn list_mappings(
        &self,
        organization_id: &str,
        key: AdapterKey,
    ) -> Result<Vec<FieldMapping>> {
        Ok(self
            .list_active(organization_id)
            .await?
            .into_iter()
            .filter(|m| m.key() == key)
            .collect())
    }

    async fn upsert_superseding(&self, mapping: &FieldMapping) -> Result<Option<FieldMapping>> {
        let mut mappings = self.mappings.lock().unwrap();
        let mut superseded = None;
        for existing in mappings.iter_mut().filter(|m| m.active && m.same_slot(mapping)) {
            existing.active = false;
            superseded = Some(existing.clone());
        }
        mappings.push(mapping.clone());
        Ok(superseded)
    }

    async fn deactivate(&self, organization_id: &str, id: Uuid) -> Result<bool> {
        let mut mappings = self.mappings.lock().unwrap();
        match mappings
            .iter_mut()
            .find(|m| m.active && m.id == id && m.organization_id == organization_id)
        {
            Some(mapping) => {
                mapping.active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Treats the sealed value as plaintext and counts decryptions.
#[derive(Default)]
pub struct PlainDecryptor {
    calls: AtomicUsize,
}

impl PlainDecryptor {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SecretDecryptor for PlainDecryptor {
    fn decrypt(&self, secret: &SealedSecret) -> Result<Zeroizing<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if secret.is_empty() {
            return Err(UnibridgeError::Security("empty secret".into()));
        }
        Ok(Zeroizing::new(secret.as_str().to_string()))
    }
}
