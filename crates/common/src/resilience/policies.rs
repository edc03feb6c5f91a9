//! Ready-made retry policies.

use crate::error::ErrorClassification;
use crate::resilience::retry::{RetryDecision, RetryPolicy};

/// Retry every failure until the attempt budget runs out.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRetry;

impl<E> RetryPolicy<E> for AlwaysRetry {
    fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
        RetryDecision::Retry
    }
}

/// Retry only errors that classify themselves as retryable, honouring any
/// server-suggested delay.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryClassified;

impl<E: ErrorClassification> RetryPolicy<E> for RetryClassified {
    fn should_retry(&self, error: &E, _attempt: u32) -> RetryDecision {
        if !error.is_retryable() {
            return RetryDecision::Stop;
        }
        error.retry_after().map_or(RetryDecision::Retry, RetryDecision::RetryAfter)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::ErrorSeverity;

    struct Flaky {
        retryable: bool,
        after: Option<Duration>,
    }

    impl ErrorClassification for Flaky {
        fn is_retryable(&self) -> bool {
            self.retryable
        }

        fn severity(&self) -> ErrorSeverity {
            ErrorSeverity::Warning
        }

        fn retry_after(&self) -> Option<Duration> {
            self.after
        }
    }

    #[test]
    fn classified_policy_follows_the_error() {
        let policy = RetryClassified;
        assert_eq!(
            policy.should_retry(&Flaky { retryable: false, after: None }, 1),
            RetryDecision::Stop
        );
        assert_eq!(
            policy.should_retry(&Flaky { retryable: true, after: None }, 1),
            RetryDecision::Retry
        );
        assert_eq!(
            policy.should_retry(&Flaky { retryable: true, after: Some(Duration::from_secs(2)) }, 1),
            RetryDecision::RetryAfter(Duration::from_secs(2))
        );
    }
}
