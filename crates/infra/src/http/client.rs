use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use unibridge_domain::{ActionType, AdapterKey, ProviderCallError, Result, UnibridgeError};

use crate::errors::provider_call_error;

/// What a provider said about a rejected request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDetails {
    /// Provider field the error points at
    pub field: Option<String>,
    pub message: Option<String>,
}

/// Extracts [`ErrorDetails`] from a provider's JSON error body
pub type ErrorBodyParser = fn(&Value) -> ErrorDetails;

/// HTTP client for provider calls.
///
/// Performs exactly one attempt per call; retries belong to the provider
/// gateway so every adapter shares one policy. Non-2xx responses become
/// [`ProviderCallError`]s carrying the status verbatim.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute a provider request.
    ///
    /// # Errors
    /// Transport failures map to `Timeout`/`Network`; non-2xx responses map to
    /// `Http { status }` with the message and blamed field taken from the body
    /// via `parse_error`.
    pub async fn send(
        &self,
        key: AdapterKey,
        action: ActionType,
        builder: RequestBuilder,
        parse_error: ErrorBodyParser,
    ) -> Result<Response> {
        let request = builder.build().map_err(|err| provider_call_error(key, action, &err))?;
        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%key, %action, %method, path = url.path(), "sending provider request");

        let response = self.client.execute(request).await.map_err(|err| {
            debug!(
                %key,
                %action,
                %method,
                path = url.path(),
                error = %err,
                "provider request failed"
            );
            provider_call_error(key, action, &err)
        })?;

        let status = response.status();
        debug!(%key, %action, %method, path = url.path(), %status, "received provider response");

        if status.is_success() {
            return Ok(response);
        }
        Err(error_from_response(key, action, response, parse_error).await.into())
    }

    /// Decode a successful response body.
    pub async fn read_json<T: DeserializeOwned>(
        key: AdapterKey,
        action: ActionType,
        response: Response,
    ) -> Result<T> {
        response.json::<T>().await.map_err(|err| provider_call_error(key, action, &err).into())
    }
}

async fn error_from_response(
    key: AdapterKey,
    action: ActionType,
    response: Response,
    parse_error: ErrorBodyParser,
) -> ProviderCallError {
    let status = response.status();
    let retry_after = retry_after_secs(response.headers());
    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::Null);

    let details = parse_error(&body);
    let message = details
        .message
        .or_else(|| generic_message(&body))
        .or_else(|| (!text.trim().is_empty()).then(|| text.trim().to_string()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown status").to_string());

    let mut error = ProviderCallError::http(key, action, status.as_u16(), message);
    if let Some(field) = details.field {
        error = error.with_remote_field(field);
    }
    if let Some(secs) = retry_after {
        error = error.with_retry_after(secs);
    }
    error
}

fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()
}

fn generic_message(body: &Value) -> Option<String> {
    ["description", "message", "error"]
        .iter()
        .find_map(|field| body.get(*field).and_then(Value::as_str))
        .map(str::to_string)
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    default_headers: Option<HeaderMap>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: Some(concat!("unibridge/", env!("CARGO_PKG_VERSION")).to_string()),
            default_headers: None,
        }
    }
}

impl HttpClientBuilder {
    /// Per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// User agent sent on every request.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Headers sent on every request.
    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<HttpClient> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        let client = builder
            .build()
            .map_err(|err| UnibridgeError::Config(format!("failed to build http client: {err}")))?;

        Ok(HttpClient { client })
    }
}
