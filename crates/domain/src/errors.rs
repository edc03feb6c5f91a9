//! Error types used throughout Unibridge
//!
//! Transform errors propagate synchronously to the caller of the engine.
//! I/O failures are normalised into [`ProviderCallError`] at the adapter
//! boundary before they reach the engine. A missing field mapping is never an
//! error: it simply means "no mapping".

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use unibridge_common::{ErrorClassification, ErrorSeverity};
use uuid::Uuid;

use crate::types::{ActionType, AdapterKey, ObjectType, Provider};

/// How a provider call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderFailure {
    /// Provider answered with a non-success status
    Http { status: u16 },
    /// No answer within the deadline
    Timeout,
    /// Connection-level failure (DNS, TLS, reset)
    Network,
    /// Provider answered but the body could not be understood
    Decode,
    /// Adapter cannot serve the requested pull selector
    UnsupportedSelector,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { status } => write!(f, "HTTP {status}"),
            Self::Timeout => f.write_str("timeout"),
            Self::Network => f.write_str("network"),
            Self::Decode => f.write_str("decode"),
            Self::UnsupportedSelector => f.write_str("unsupported selector"),
        }
    }
}

/// Uniform wrapper for failures of `push` and `pull`
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{provider} {object_type} {action} failed ({failure}): {message}")]
pub struct ProviderCallError {
    pub provider: Provider,
    pub object_type: ObjectType,
    pub action: ActionType,
    pub failure: ProviderFailure,
    /// Provider-reported message, verbatim where available
    pub message: String,
    /// Provider field the provider blamed, if it named one
    pub remote_field: Option<String>,
    /// Canonical slot that produced `remote_field`, filled by the write path
    pub canonical_field: Option<String>,
    /// Server-suggested delay (e.g. `Retry-After` on 429)
    pub retry_after_secs: Option<u64>,
}

impl ProviderCallError {
    /// Failure of `action` against the provider behind `key`.
    pub fn new(
        key: AdapterKey,
        action: ActionType,
        failure: ProviderFailure,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider: key.provider,
            object_type: key.object_type,
            action,
            failure,
            message: message.into(),
            remote_field: None,
            canonical_field: None,
            retry_after_secs: None,
        }
    }

    /// Provider answered with a non-success `status`.
    pub fn http(
        key: AdapterKey,
        action: ActionType,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::new(key, action, ProviderFailure::Http { status }, message)
    }

    /// The call timed out.
    pub fn timeout(key: AdapterKey, action: ActionType) -> Self {
        Self::new(key, action, ProviderFailure::Timeout, "request timed out")
    }

    /// The call never got an answer.
    pub fn network(key: AdapterKey, action: ActionType, message: impl Into<String>) -> Self {
        Self::new(key, action, ProviderFailure::Network, message)
    }

    /// The answer could not be read.
    pub fn decode(key: AdapterKey, action: ActionType, message: impl Into<String>) -> Self {
        Self::new(key, action, ProviderFailure::Decode, message)
    }

    /// The adapter cannot pull with this selector.
    pub fn unsupported_selector(key: AdapterKey, message: impl Into<String>) -> Self {
        Self::new(key, ActionType::Pull, ProviderFailure::UnsupportedSelector, message)
    }

    #[must_use]
    pub fn with_remote_field(mut self, field: impl Into<String>) -> Self {
        self.remote_field = Some(field.into());
        self
    }

    #[must_use]
    pub fn with_canonical_field(mut self, field: impl Into<String>) -> Self {
        self.canonical_field = Some(field.into());
        self
    }

    #[must_use]
    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after_secs = Some(secs);
        self
    }

    pub fn key(&self) -> AdapterKey {
        AdapterKey::new(self.provider, self.object_type)
    }

    /// HTTP status of the provider answer, if there was one.
    pub fn http_status(&self) -> Option<u16> {
        match self.failure {
            ProviderFailure::Http { status } => Some(status),
            _ => None,
        }
    }

    /// 5xx, 429, timeouts and network failures may succeed on another attempt.
    /// Other 4xx are caller errors and are never retried.
    pub fn is_transient(&self) -> bool {
        match self.failure {
            ProviderFailure::Http { status } => status >= 500 || status == 429,
            ProviderFailure::Timeout | ProviderFailure::Network => true,
            ProviderFailure::Decode | ProviderFailure::UnsupportedSelector => false,
        }
    }
}

impl ErrorClassification for ProviderCallError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }

    fn severity(&self) -> ErrorSeverity {
        if self.is_transient() {
            ErrorSeverity::Warning
        } else {
            ErrorSeverity::Error
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        self.retry_after_secs.map(Duration::from_secs)
    }
}

/// A sync run that persisted some pages and failed on the rest
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error(
    "sync of {provider} {object_type} for connection {connection_id} failed after {pages_synced} \
     page(s): {reason}"
)]
pub struct PartialSyncFailure {
    pub connection_id: Uuid,
    pub provider: Provider,
    pub object_type: ObjectType,
    pub pages_synced: u32,
    pub records_synced: u64,
    /// Cursor of the first page that was not persisted; `None` means start over
    pub resume_cursor: Option<String>,
    pub reason: String,
    /// Whether resuming may succeed without operator action
    pub retryable: bool,
    /// The run stopped because it was cancelled, not because a call failed
    #[serde(default)]
    pub cancelled: bool,
}

/// Main error type for Unibridge
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum UnibridgeError {
    #[error("Unsupported provider/object type: {provider}/{object_type}")]
    UnsupportedProvider { provider: String, object_type: String },

    #[error("Provider call error: {0}")]
    ProviderCall(ProviderCallError),

    #[error("Transform error ({provider} {object_type}): {message}")]
    Transform {
        provider: Provider,
        object_type: ObjectType,
        message: String,
        field: Option<String>,
    },

    #[error("Partial sync failure: {0}")]
    PartialSync(PartialSyncFailure),

    #[error("Sync already running for connection {connection_id} ({object_type})")]
    SyncInProgress { connection_id: Uuid, object_type: ObjectType },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl UnibridgeError {
    /// No adapter serves this pair.
    pub fn unsupported(provider: impl Into<String>, object_type: impl Into<String>) -> Self {
        Self::UnsupportedProvider { provider: provider.into(), object_type: object_type.into() }
    }

    pub fn unsupported_key(key: AdapterKey) -> Self {
        Self::unsupported(key.provider.slug(), key.object_type.slug())
    }

    /// The adapter could not convert an object.
    pub fn transform(key: AdapterKey, message: impl Into<String>) -> Self {
        Self::Transform {
            provider: key.provider,
            object_type: key.object_type,
            message: message.into(),
            field: None,
        }
    }

    /// The adapter could not convert `field`.
    pub fn transform_field(
        key: AdapterKey,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Transform {
            provider: key.provider,
            object_type: key.object_type,
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Client-visible HTTP-equivalent status.
    ///
    /// Provider 4xx statuses are reported verbatim so callers see what the
    /// provider said.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UnsupportedProvider { .. } | Self::InvalidInput(_) => 400,
            Self::NotFound(_) => 404,
            Self::SyncInProgress { .. } => 409,
            Self::Transform { .. } => 422,
            Self::ProviderCall(err) => match err.failure {
                ProviderFailure::Http { status } if (400..500).contains(&status) => status,
                ProviderFailure::Timeout => 504,
                _ => 502,
            },
            Self::PartialSync(_) => 502,
            Self::Cancelled => 503,
            Self::Storage(_) | Self::Config(_) | Self::Security(_) | Self::Internal(_) => 500,
        }
    }

    /// True for a cancelled run, including one cancelled after some pages
    /// were persisted.
    pub fn is_cancellation(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::PartialSync(failure) => failure.cancelled,
            _ => false,
        }
    }

    /// Details of a failed provider call.
    pub fn as_provider_call(&self) -> Option<&ProviderCallError> {
        match self {
            Self::ProviderCall(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProviderCallError> for UnibridgeError {
    fn from(err: ProviderCallError) -> Self {
        Self::ProviderCall(err)
    }
}

impl From<PartialSyncFailure> for UnibridgeError {
    fn from(err: PartialSyncFailure) -> Self {
        Self::PartialSync(err)
    }
}

impl ErrorClassification for UnibridgeError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::ProviderCall(err) => err.is_retryable(),
            Self::PartialSync(failure) => failure.retryable,
            Self::SyncInProgress { .. } => true,
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ProviderCall(err) => err.severity(),
            Self::NotFound(_) | Self::SyncInProgress { .. } | Self::Cancelled => {
                ErrorSeverity::Info
            }
            Self::PartialSync(_) => ErrorSeverity::Warning,
            Self::UnsupportedProvider { .. }
            | Self::Transform { .. }
            | Self::Storage(_)
            | Self::Config(_)
            | Self::InvalidInput(_) => ErrorSeverity::Error,
            Self::Security(_) | Self::Internal(_) => ErrorSeverity::Critical,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        self.as_provider_call().and_then(ErrorClassification::retry_after)
    }
}

/// Result type alias for Unibridge operations
pub type Result<T> = std::result::Result<T, UnibridgeError>;
