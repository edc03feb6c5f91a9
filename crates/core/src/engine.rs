//! Unification engine
//!
//! Resolves the adapter, applies the organization's mapping snapshot and
//! delegates to the adapter's pure transforms. Performs no I/O, so with a
//! repository-backed mapping store the organization must be loaded first
//! (`FieldMappingStore::ensure_loaded`); an unloaded organization is an error
//! rather than an empty mapping table.

use std::sync::Arc;

use tracing::trace;
use unibridge_domain::{
    AdapterKey, CanonicalObject, ProviderPayload, ProviderResponse, Result, UnibridgeError,
};

use crate::adapter::Unified;
use crate::mapping::{translate, FieldMappingStore};
use crate::registry::AdapterRegistry;

/// Provider-agnostic unify/desunify over the registry and mapping store
pub struct UnificationEngine {
    registry: Arc<AdapterRegistry>,
    mappings: Arc<FieldMappingStore>,
}

impl UnificationEngine {
    /// Build an engine over a finished registry and a mapping store.
    pub fn new(registry: Arc<AdapterRegistry>, mappings: Arc<FieldMappingStore>) -> Self {
        Self { registry, mappings }
    }

    /// Registry the engine resolves adapters from.
    pub fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.registry
    }

    /// Mapping store applied on both directions.
    pub fn mappings(&self) -> &Arc<FieldMappingStore> {
        &self.mappings
    }

    /// Canonical object -> provider payload for a write.
    ///
    /// # Errors
    /// - `UnsupportedProvider` if no adapter serves `key`
    /// - `InvalidInput` if the object is not of `key.object_type`
    /// - `Internal` if the organization's mappings are not loaded
    /// - whatever the adapter's `desunify` reports
    pub fn desunify_for_write(
        &self,
        organization_id: &str,
        canonical: &CanonicalObject,
        key: AdapterKey,
    ) -> Result<ProviderPayload> {
        let adapter = self.registry.resolve(key)?;
        if canonical.object_type() != key.object_type {
            return Err(UnibridgeError::InvalidInput(format!(
                "cannot write a {} through the {key} adapter",
                canonical.object_type()
            )));
        }

        let snapshot = self.mappings.loaded_snapshot(organization_id)?;
        let custom_fields = translate::to_remote(canonical, snapshot.for_key(key));
        trace!(%key, custom_fields = custom_fields.len(), "desunify");

        adapter.desunify(canonical, &custom_fields)
    }

    /// Provider response -> canonical object for a read.
    ///
    /// # Errors
    /// Same as [`Self::desunify_for_write`], minus the object type check.
    pub fn unify_for_read(
        &self,
        response: &ProviderResponse,
        key: AdapterKey,
        organization_id: &str,
    ) -> Result<CanonicalObject> {
        let adapter = self.registry.resolve(key)?;
        let Unified { mut object, custom_fields } = adapter.unify(response)?;

        let snapshot = self.mappings.loaded_snapshot(organization_id)?;
        object.field_mappings = translate::to_canonical(&custom_fields, snapshot.for_key(key));
        trace!(%key, slots = object.field_mappings.len(), "unify");

        Ok(object)
    }

    /// Canonical field behind a provider field: the adapter's static table
    /// first, then the organization's custom mappings.
    pub fn canonical_field_for(
        &self,
        organization_id: &str,
        key: AdapterKey,
        remote_field: &str,
    ) -> Option<String> {
        let adapter = self.registry.resolve(key).ok()?;
        adapter.canonical_attribute_for(remote_field).map(str::to_string).or_else(|| {
            self.mappings
                .loaded_snapshot(organization_id)
                .ok()?
                .slot_for_remote(key, remote_field)
                .map(str::to_string)
        })
    }
}
