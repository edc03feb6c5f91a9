//! Integration tests for the retry executor
//!
//! Exercises the executor with policies driven by error classification, the
//! way provider calls are retried.

#![cfg(feature = "runtime")]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use unibridge_common::policies::{AlwaysRetry, RetryClassified};
use unibridge_common::{
    retry_with_policy, ErrorClassification, ErrorSeverity, RetryConfig, RetryError,
    RetryExecutor,
};

#[derive(Debug, Clone, PartialEq)]
struct UpstreamError {
    status: u16,
}

impl ErrorClassification for UpstreamError {
    fn is_retryable(&self) -> bool {
        self.status >= 500
    }

    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Warning
    }
}

fn fast_config(max_attempts: u32) -> RetryConfig {
    RetryConfig::builder()
        .max_attempts(max_attempts)
        .fixed_backoff(Duration::from_millis(1))
        .no_jitter()
        .build()
        .expect("valid retry config")
}

#[tokio::test]
async fn transient_failures_recover_within_budget() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);

    let result = retry_with_policy(fast_config(3), RetryClassified, || {
        let counter = Arc::clone(&counter);
        async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(UpstreamError { status: 503 })
            } else {
                Ok("remote-42")
            }
        }
    })
    .await;

    assert_eq!(result.expect("third attempt succeeds"), "remote-42");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn client_errors_are_never_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);

    let result: Result<(), _> = retry_with_policy(fast_config(5), RetryClassified, || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(UpstreamError { status: 401 })
        }
    })
    .await;

    match result {
        Err(RetryError::NonRetryable { attempts, error }) => {
            assert_eq!(attempts, 1);
            assert_eq!(error.status, 401);
        }
        other => panic!("expected NonRetryable, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn exhaustion_keeps_the_last_error() {
    let executor = RetryExecutor::new(fast_config(3), AlwaysRetry);
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);

    let outcome = executor
        .execute_with_outcome(|| {
            let counter = Arc::clone(&counter);
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(UpstreamError { status: 500 + u16::try_from(n).unwrap_or(0) })
            }
        })
        .await;

    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.total_delay, Duration::from_millis(2));
    match outcome.result {
        Err(RetryError::AttemptsExhausted { attempts, last }) => {
            assert_eq!(attempts, 3);
            assert_eq!(last.status, 502);
        }
        other => panic!("expected AttemptsExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn time_budget_stops_long_backoff() {
    let config = RetryConfig::builder()
        .max_attempts(10)
        .fixed_backoff(Duration::from_secs(5))
        .no_jitter()
        .max_total_time(Duration::from_millis(50))
        .build()
        .expect("valid retry config");

    let result: Result<(), _> =
        retry_with_policy(config, AlwaysRetry, || async { Err(UpstreamError { status: 504 }) })
            .await;

    assert!(matches!(result, Err(RetryError::TimeoutExceeded { .. })));
}
