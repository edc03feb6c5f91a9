//! Port interfaces for canonical record and connection storage

use async_trait::async_trait;
use unibridge_domain::{CanonicalRecord, Connection, ObjectType, Result};
use uuid::Uuid;

/// Key-based canonical record store with last-write-wins semantics per
/// `(connection_id, object_type, remote_id)`
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert or overwrite the record stored under the record's key. An
    /// overwritten record keeps its canonical object id.
    async fn upsert(&self, record: &CanonicalRecord) -> Result<()>;

    async fn find_by_remote_id(
        &self,
        connection_id: Uuid,
        object_type: ObjectType,
        remote_id: &str,
    ) -> Result<Option<CanonicalRecord>>;

    /// The record a connection holds for a canonical object. The same object
    /// may be stored once per connection, each with its own remote id.
    async fn find_by_id(&self, connection_id: Uuid, id: Uuid) -> Result<Option<CanonicalRecord>>;

    /// All records of one type for a connection, oldest first
    async fn list_by_connection(
        &self,
        connection_id: Uuid,
        object_type: ObjectType,
    ) -> Result<Vec<CanonicalRecord>>;
}

/// Storage for linked connections
#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    async fn save(&self, connection: &Connection) -> Result<()>;

    async fn find(&self, id: Uuid) -> Result<Option<Connection>>;

    async fn list_active(&self) -> Result<Vec<Connection>>;

    /// Mark a connection unlinked. Its records are kept.
    async fn deactivate(&self, id: Uuid) -> Result<()>;
}
