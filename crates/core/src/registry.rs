//! Adapter registry
//!
//! Adapters are registered on an [`AdapterRegistryBuilder`] during startup.
//! `build()` freezes the table into an immutable [`AdapterRegistry`], so
//! every adapter is registered before the first `resolve` and resolution
//! needs no locking.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};
use unibridge_domain::{AdapterKey, Result, UnibridgeError};

use crate::adapter::ProviderAdapter;

/// Mutable registration phase
#[derive(Default)]
pub struct AdapterRegistryBuilder {
    adapters: HashMap<AdapterKey, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistryBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `adapter` under `key`.
    ///
    /// The key must match the adapter's own key, and each key can be
    /// registered once.
    pub fn register(mut self, key: AdapterKey, adapter: Arc<dyn ProviderAdapter>) -> Result<Self> {
        if adapter.key() != key {
            return Err(UnibridgeError::Config(format!(
                "adapter for {} registered under key {key}",
                adapter.key()
            )));
        }
        if self.adapters.contains_key(&key) {
            return Err(UnibridgeError::Config(format!("adapter already registered for {key}")));
        }

        debug!(%key, "adapter registered");
        self.adapters.insert(key, adapter);
        Ok(self)
    }

    /// Register an adapter under its own key.
    pub fn register_adapter(self, adapter: Arc<dyn ProviderAdapter>) -> Result<Self> {
        let key = adapter.key();
        self.register(key, adapter)
    }

    /// Freeze the registrations into a read-only registry.
    pub fn build(self) -> AdapterRegistry {
        info!(adapters = self.adapters.len(), "adapter registry initialised");
        AdapterRegistry { adapters: self.adapters }
    }
}

/// Read-only `(provider, object type) -> adapter` table
pub struct AdapterRegistry {
    adapters: HashMap<AdapterKey, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    /// Start a registration phase.
    pub fn builder() -> AdapterRegistryBuilder {
        AdapterRegistryBuilder::new()
    }

    /// Look up the adapter for `key`.
    ///
    /// # Errors
    /// `UnsupportedProvider` when nothing is registered for the key.
    pub fn resolve(&self, key: AdapterKey) -> Result<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&key).cloned().ok_or_else(|| UnibridgeError::unsupported_key(key))
    }

    /// True when an adapter serves `key`.
    pub fn contains(&self, key: AdapterKey) -> bool {
        self.adapters.contains_key(&key)
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<AdapterKey> {
        let mut keys: Vec<_> = self.adapters.keys().copied().collect();
        keys.sort();
        keys
    }

    /// Number of registered adapters.
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry").field("keys", &self.keys()).finish()
    }
}
