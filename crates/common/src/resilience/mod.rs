//! Resilience primitives for calls that cross a network boundary.
//!
//! [`RetryExecutor`] runs an async operation under a [`RetryConfig`]
//! (attempt budget, backoff, jitter, total deadline) and asks a
//! [`RetryPolicy`] whether each failure is worth another attempt.

pub mod policies;
pub mod retry;

pub use retry::{
    retry_with_policy, BackoffStrategy, Jitter, RetryConfig, RetryConfigBuilder, RetryDecision,
    RetryError, RetryExecutor, RetryOutcome, RetryPolicy, RetryResult,
};
