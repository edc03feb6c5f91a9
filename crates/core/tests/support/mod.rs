//! Shared test helpers for `unibridge-core` integration tests.
//!
//! Provides scripted adapters, in-memory stores and small fixtures so tests
//! can focus on behaviour instead of boilerplate.

#![allow(dead_code)]

pub mod adapters;
pub mod repositories;

use std::sync::Arc;
use std::time::Duration;

use unibridge_common::RetryConfig;
use unibridge_core::{
    AdapterRegistry, FieldMappingStore, ProviderAdapter, ProviderGateway, UnificationEngine,
};
use unibridge_domain::{Connection, Provider, SealedSecret};

pub use adapters::{MockCommentAdapter, MockTicketAdapter};
pub use repositories::{InMemoryMappingRepository, InMemoryRecordStore, PlainDecryptor};

pub const ORG: &str = "org1";

pub fn connection() -> Connection {
    Connection::new("user-1", ORG, Provider::Zendesk, SealedSecret::new("token-abc"))
}

pub fn registry(adapters: Vec<Arc<dyn ProviderAdapter>>) -> Arc<AdapterRegistry> {
    let mut builder = AdapterRegistry::builder();
    for adapter in adapters {
        builder = builder.register_adapter(adapter).expect("unique adapter keys");
    }
    Arc::new(builder.build())
}

pub fn engine(
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    mappings: Arc<FieldMappingStore>,
) -> Arc<UnificationEngine> {
    Arc::new(UnificationEngine::new(registry(adapters), mappings))
}

/// Gateway with millisecond backoff so retry tests stay fast
pub fn fast_gateway(max_attempts: u32) -> Arc<ProviderGateway> {
    let retry = RetryConfig::builder()
        .max_attempts(max_attempts)
        .fixed_backoff(Duration::from_millis(1))
        .no_jitter()
        .build()
        .expect("valid retry config");
    Arc::new(ProviderGateway::with_retry_config(retry))
}
