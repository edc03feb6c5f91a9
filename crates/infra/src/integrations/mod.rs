//! Provider integrations
//!
//! Each provider module owns its wire types and one adapter per object type.
//! Adapters hold an [`ApiEndpoint`] and resolve the API root per call, so one
//! adapter instance serves every connection of its provider.

pub mod freshsales;
pub mod zendesk;

use std::time::Duration;

use unibridge_core::CallContext;
use unibridge_domain::{AdapterKey, ProviderEndpoint, Result, UnibridgeError};
use url::Url;

use crate::http::HttpClient;

/// Connection metadata key overriding the configured API root
pub const BASE_URL_METADATA_KEY: &str = "base_url";

/// HTTP client plus the configured default API root of one provider
#[derive(Clone)]
pub struct ApiEndpoint {
    http: HttpClient,
    default_base_url: Option<String>,
}

impl ApiEndpoint {
    /// Endpoint with a fallback base URL for connections that set none.
    pub fn new(http: HttpClient, default_base_url: Option<String>) -> Self {
        Self { http, default_base_url }
    }

    /// Build from the provider section of the configuration.
    pub fn from_config(endpoint: &ProviderEndpoint) -> Result<Self> {
        let http =
            HttpClient::builder().timeout(Duration::from_secs(endpoint.timeout_secs)).build()?;
        Ok(Self::new(http, endpoint.base_url.clone()))
    }

    /// Shared HTTP client.
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Absolute URL of `path` for the connection in `ctx`.
    ///
    /// The connection's `base_url` metadata wins over the configured default.
    pub fn url(&self, key: AdapterKey, ctx: &CallContext, path: &str) -> Result<Url> {
        let connection = ctx.connection();
        let base = connection
            .metadata_value(BASE_URL_METADATA_KEY)
            .or(self.default_base_url.as_deref())
            .ok_or_else(|| {
                UnibridgeError::Config(format!(
                    "no {} base_url configured for connection {}",
                    key.provider, connection.id
                ))
            })?;

        let joined = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
        Url::parse(&joined)
            .map_err(|e| {
                UnibridgeError::Config(format!("invalid {} base_url '{base}': {e}", key.provider))
            })
    }
}
