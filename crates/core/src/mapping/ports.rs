//! Port interfaces for mapping persistence

use async_trait::async_trait;
use unibridge_domain::{AdapterKey, FieldMapping, Result};
use uuid::Uuid;

/// Durable storage for field mappings
#[async_trait]
pub trait MappingRepository: Send + Sync {
    /// All active mappings of an organization
    async fn list_active(&self, organization_id: &str) -> Result<Vec<FieldMapping>>;

    /// Active mappings of an organization for one `(provider, object type)`
    async fn list_mappings(&self, organization_id: &str, key: AdapterKey)
        -> Result<Vec<FieldMapping>>;

    /// Insert `mapping`, deactivating any active mapping for the same
    /// `(organization, slot, provider, object type)` in the same transaction.
    /// Returns the superseded mapping.
    async fn upsert_superseding(&self, mapping: &FieldMapping) -> Result<Option<FieldMapping>>;

    /// Deactivate a mapping. Returns `false` if no active mapping has this id.
    async fn deactivate(&self, organization_id: &str, id: Uuid) -> Result<bool>;
}
