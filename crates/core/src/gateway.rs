//! Retrying wrapper around adapter I/O
//!
//! Transient provider failures (5xx, 429, timeouts, network) are retried with
//! exponential backoff up to the configured attempt budget. Everything else,
//! 4xx included, is returned on the first failure.

use std::time::Duration;

use tracing::instrument;
use unibridge_common::policies::RetryClassified;
use unibridge_common::{Jitter, RetryConfig, RetryError, RetryExecutor};
use unibridge_domain::{
    Page, ProviderPayload, PullSelector, Result, RetrySettings, UnibridgeError,
};

use crate::adapter::{CallContext, ProviderAdapter};

#[derive(Debug, Clone)]
pub struct ProviderGateway {
    retry: RetryConfig,
}

impl Default for ProviderGateway {
    fn default() -> Self {
        Self { retry: RetryConfig::default() }
    }
}

impl ProviderGateway {
    /// Build the retry policy from configuration.
    pub fn new(settings: &RetrySettings) -> Result<Self> {
        settings.validate()?;
        let retry = RetryConfig::builder()
            .max_attempts(settings.max_attempts)
            .exponential_backoff(
                Duration::from_millis(settings.initial_delay_ms),
                settings.multiplier,
                Duration::from_millis(settings.max_delay_ms),
            )
            .jitter(Jitter::Equal)
            .build()
            .map_err(|e| UnibridgeError::Config(e.to_string()))?;
        Ok(Self { retry })
    }

    /// Gateway with an explicit retry configuration.
    pub fn with_retry_config(retry: RetryConfig) -> Self {
        Self { retry }
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Push a payload with retries. Returns the remote id.
    #[instrument(skip_all, fields(key = %adapter.key(), connection_id = %ctx.connection().id))]
    pub async fn push(
        &self,
        adapter: &dyn ProviderAdapter,
        ctx: &CallContext,
        payload: &ProviderPayload,
    ) -> Result<String> {
        let executor = RetryExecutor::new(self.retry.clone(), RetryClassified);
        executor.execute(|| adapter.push(ctx, payload)).await.map_err(into_domain)
    }

    /// Pull one page with retries.
    #[instrument(
        skip_all,
        fields(key = %adapter.key(), connection_id = %ctx.connection().id, cursor)
    )]
    pub async fn pull_page(
        &self,
        adapter: &dyn ProviderAdapter,
        ctx: &CallContext,
        selector: &PullSelector,
        cursor: Option<&str>,
    ) -> Result<Page> {
        if let Some(cursor) = cursor {
            tracing::Span::current().record("cursor", cursor);
        }
        let executor = RetryExecutor::new(self.retry.clone(), RetryClassified);
        executor.execute(|| adapter.pull(ctx, selector, cursor)).await.map_err(into_domain)
    }
}

fn into_domain(err: RetryError<UnibridgeError>) -> UnibridgeError {
    match err {
        RetryError::InvalidConfiguration { message } => UnibridgeError::Config(message),
        other => other
            .into_inner()
            .unwrap_or_else(|| UnibridgeError::Internal("retry ended without an error".into())),
    }
}
