//! Common error types and classification shared across Unibridge crates.
//!
//! Every error taxonomy in the workspace implements [`ErrorClassification`]
//! so retry loops, logging and client-facing status mapping can reason about
//! failures without knowing the concrete error type:
//!
//! - **`is_retryable()`**: can the same operation be attempted again?
//! - **`severity()`**: how loudly should the failure be reported?
//! - **`is_critical()`**: does the failure indicate broken invariants?
//! - **`retry_after()`**: a server-suggested delay, if one was provided
//!
//! Module-specific errors compose with [`CommonError`] rather than duplicating
//! its variants:
//!
//! ```rust,ignore
//! #[derive(Debug, Error)]
//! pub enum StoreError {
//!     #[error("record missing: {0}")]
//!     Missing(String),
//!
//!     #[error(transparent)]
//!     Common(#[from] CommonError),
//! }
//! ```

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Standard result type using [`CommonError`].
pub type CommonResult<T> = Result<T, CommonError>;

/// Unified severity level for logging and alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Expected condition (missing resource, empty result)
    Info,
    /// Degraded but operational (rate limiting, transient failures)
    Warning,
    /// Failure requiring attention (bad input, provider rejection)
    Error,
    /// Integrity at risk (decryption failures, invariant violations)
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        };
        f.write_str(label)
    }
}

/// Standard interface for classifying errors by their characteristics.
pub trait ErrorClassification {
    /// Whether retrying the failed operation may succeed.
    fn is_retryable(&self) -> bool;

    /// Severity used for logging and alerting.
    fn severity(&self) -> ErrorSeverity;

    /// Whether the error signals a broken invariant.
    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }

    /// Suggested delay before the next attempt, when the source provided one.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Common error variants that appear across multiple modules.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CommonError {
    /// Invalid or missing configuration
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Encoding or decoding failure
    #[error("Serialization error ({format}): {message}")]
    Serialization { format: String, message: String },

    /// Cryptographic failure (bad key, tampered ciphertext)
    #[error("Crypto error: {message}")]
    Crypto { message: String },

    /// Operation exceeded its deadline
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout { operation: String, duration: Duration },

    /// Input failed validation
    #[error("Validation error for field '{field}': {message}")]
    Validation { field: String, message: String },

    /// Internal errors that shouldn't normally occur
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CommonError {
    /// Configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// Encoding or decoding failure in `format`.
    pub fn serialization(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Serialization { format: format.into(), message: message.into() }
    }

    /// Encryption or key failure.
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto { message: message.into() }
    }

    /// `operation` did not finish within `duration`.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout { operation: operation.into(), duration }
    }

    /// Invalid value for `field`.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    /// Bug or broken invariant.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }
}

impl ErrorClassification for CommonError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Timeout { .. } => ErrorSeverity::Warning,
            Self::Config { .. } | Self::Serialization { .. } | Self::Validation { .. } => {
                ErrorSeverity::Error
            }
            Self::Crypto { .. } | Self::Internal { .. } => ErrorSeverity::Critical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_the_only_retryable_common_error() {
        assert!(CommonError::timeout("pull", Duration::from_secs(1)).is_retryable());
        assert!(!CommonError::config("missing key").is_retryable());
        assert!(!CommonError::crypto("tag mismatch").is_retryable());
    }

    #[test]
    fn crypto_failures_are_critical() {
        let err = CommonError::crypto("tag mismatch");
        assert!(err.is_critical());
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn display_includes_context() {
        let err = CommonError::validation("key_hex", "expected 64 characters");
        assert_eq!(err.to_string(), "Validation error for field 'key_hex': expected 64 characters");
        assert_eq!(ErrorSeverity::Warning.to_string(), "WARNING");
    }
}
