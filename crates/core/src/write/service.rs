//! Write service - desunify, push and persist

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};
use unibridge_domain::{
    AdapterKey, CanonicalObject, CanonicalRecord, Connection, ObjectType, PushTarget, Result,
    UnibridgeError,
};

use crate::adapter::{CallContext, ProviderAdapter, SecretDecryptor};
use crate::engine::UnificationEngine;
use crate::gateway::ProviderGateway;
use crate::record_ports::RecordStore;

/// Writes canonical objects to providers
pub struct WriteService {
    engine: Arc<UnificationEngine>,
    gateway: Arc<ProviderGateway>,
    records: Arc<dyn RecordStore>,
    decryptor: Arc<dyn SecretDecryptor>,
}

impl WriteService {
    /// Build a write service over the shared engine, gateway and stores.
    pub fn new(
        engine: Arc<UnificationEngine>,
        gateway: Arc<ProviderGateway>,
        records: Arc<dyn RecordStore>,
        decryptor: Arc<dyn SecretDecryptor>,
    ) -> Self {
        Self { engine, gateway, records, decryptor }
    }

    /// Write `canonical` to the connection's provider and persist the result.
    ///
    /// An object this connection already stores is pushed as an update of
    /// that connection's remote object; `canonical.remote_id` is not consulted
    /// since it may belong to another connection. An object whose adapter
    /// requires a parent is pushed as a child of the parent's remote object.
    ///
    /// # Errors
    /// Provider failures carry the provider status verbatim and, when the
    /// provider blamed a field, the canonical field that produced it.
    #[instrument(skip(self, connection, canonical), fields(
        connection_id = %connection.id,
        provider = %connection.provider,
        object_type = %object_type
    ))]
    pub async fn create(
        &self,
        connection: &Connection,
        canonical: CanonicalObject,
        object_type: ObjectType,
    ) -> Result<CanonicalRecord> {
        if !connection.active {
            return Err(UnibridgeError::InvalidInput(format!(
                "connection {} is not active",
                connection.id
            )));
        }

        let key = AdapterKey::new(connection.provider, object_type);
        let adapter = self.engine.registry().resolve(key)?;
        let organization_id = connection.organization_id.as_str();

        self.engine.mappings().ensure_loaded(organization_id).await?;
        let payload = self.engine.desunify_for_write(organization_id, &canonical, key)?;
        let target = self.resolve_target(connection, &canonical, adapter.as_ref()).await?;
        let payload = payload.with_target(target);

        let ctx = CallContext::new(connection.clone(), Arc::clone(&self.decryptor));
        let remote_id = self
            .gateway
            .push(adapter.as_ref(), &ctx, &payload)
            .await
            .map_err(|err| self.attribute_field(err, organization_id, key))?;

        let now = Utc::now();
        let mut object = canonical;
        object.remote_id = Some(remote_id.clone());
        object.modified_at = now;

        let record = CanonicalRecord {
            connection_id: connection.id,
            provider: connection.provider,
            remote_id,
            object,
            synced_at: now,
        };
        self.records.upsert(&record).await?;

        info!(remote_id = %record.remote_id, object_id = %record.object.id, "write.persisted");
        Ok(record)
    }

    async fn resolve_target(
        &self,
        connection: &Connection,
        canonical: &CanonicalObject,
        adapter: &dyn ProviderAdapter,
    ) -> Result<PushTarget> {
        let stored = self
            .records
            .find_by_id(connection.id, canonical.id)
            .await?
            .filter(|r| r.object_type() == canonical.object_type());
        if let Some(stored) = stored {
            return Ok(PushTarget::Update { remote_id: stored.remote_id });
        }

        let Some(parent_type) = adapter.parent_object_type() else {
            return Ok(PushTarget::Create);
        };

        let parent_id = canonical.fields.as_comment().and_then(|c| c.ticket_id).ok_or_else(|| {
            UnibridgeError::InvalidInput(format!(
                "a {} requires the id of its parent {parent_type}",
                canonical.object_type()
            ))
        })?;

        let parent = self
            .records
            .find_by_id(connection.id, parent_id)
            .await?
            .filter(|r| r.object_type() == parent_type)
            .ok_or_else(|| {
                UnibridgeError::NotFound(format!(
                    "{parent_type} {parent_id} for connection {}",
                    connection.id
                ))
            })?;

        Ok(PushTarget::CreateChild { parent_remote_id: parent.remote_id })
    }

    fn attribute_field(
        &self,
        err: UnibridgeError,
        organization_id: &str,
        key: AdapterKey,
    ) -> UnibridgeError {
        let UnibridgeError::ProviderCall(call) = err else {
            return err;
        };

        let canonical_field = match (&call.remote_field, &call.canonical_field) {
            (Some(remote), None) => self.engine.canonical_field_for(organization_id, key, remote),
            _ => None,
        };

        warn!(
            status = ?call.http_status(),
            remote_field = ?call.remote_field,
            canonical_field = ?canonical_field,
            "provider rejected write"
        );

        match canonical_field {
            Some(field) => call.with_canonical_field(field).into(),
            None => call.into(),
        }
    }
}
