//! Generic retry execution with bounded attempts, backoff and jitter.
//!
//! The executor never decides on its own whether a failure is transient: it
//! asks the configured [`RetryPolicy`]. Attempt budgets and delays come from
//! [`RetryConfig`], so call sites carry no retry constants of their own.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, warn};

/// Errors that can occur during retry operations.
///
/// Every terminal variant keeps the last error produced by the operation so
/// the caller can surface the provider's own failure, not a generic one.
#[derive(Debug)]
pub enum RetryError<E> {
    /// All retry attempts have been exhausted
    AttemptsExhausted { attempts: u32, last: E },

    /// The operation failed with an error the policy refused to retry
    NonRetryable { attempts: u32, error: E },

    /// The next backoff delay would exceed the total time budget
    TimeoutExceeded { elapsed: Duration, last: E },

    /// The retry configuration is invalid
    InvalidConfiguration { message: String },
}

impl<E> RetryError<E> {
    /// Consume the error and return the operation's last failure, if any.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::AttemptsExhausted { last, .. } | Self::TimeoutExceeded { last, .. } => Some(last),
            Self::NonRetryable { error, .. } => Some(error),
            Self::InvalidConfiguration { .. } => None,
        }
    }

    /// Borrow the operation's last failure, if any.
    pub fn inner(&self) -> Option<&E> {
        match self {
            Self::AttemptsExhausted { last, .. } | Self::TimeoutExceeded { last, .. } => Some(last),
            Self::NonRetryable { error, .. } => Some(error),
            Self::InvalidConfiguration { .. } => None,
        }
    }
}

impl<E: fmt::Debug> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AttemptsExhausted { attempts, last } => {
                write!(f, "All retry attempts exhausted after {attempts} tries: {last:?}")
            }
            Self::NonRetryable { attempts, error } => {
                write!(
                    f,
                    "Operation failed with non-retryable error on attempt {attempts}: {error:?}"
                )
            }
            Self::TimeoutExceeded { elapsed, last } => {
                write!(f, "Retry timeout exceeded after {elapsed:?}: {last:?}")
            }
            Self::InvalidConfiguration { message } => {
                write!(f, "Invalid retry configuration: {message}")
            }
        }
    }
}

impl<E: fmt::Debug> std::error::Error for RetryError<E> {}

/// Result type for retry operations
pub type RetryResult<T, E> = Result<T, RetryError<E>>;

/// Outcome of a retry execution including result and summary statistics.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: RetryResult<T, E>,
    pub attempts: u32,
    pub total_delay: Duration,
}

impl<T, E> RetryOutcome<T, E> {
    /// Consume the outcome and return only the result.
    pub fn into_result(self) -> RetryResult<T, E> {
        self.result
    }
}

/// Trait for determining whether an error should be retried
pub trait RetryPolicy<E> {
    /// Decide what to do after `attempt` (1-based) failed with `error`.
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Decision for whether to retry an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the operation with the configured backoff delay
    Retry,
    /// Retry the operation after a caller-supplied delay
    RetryAfter(Duration),
    /// Don't retry the operation
    Stop,
}

/// Backoff strategy for calculating retry delays
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed(Duration),
    /// Exponential backoff: `initial_delay * multiplier^retry`, capped at `max_delay`
    Exponential { initial_delay: Duration, multiplier: f64, max_delay: Duration },
}

impl BackoffStrategy {
    /// Delay before retry number `retry` (0-based).
    pub fn calculate_delay(&self, retry: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Exponential { initial_delay, multiplier, max_delay } => {
                let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
                let delay_ms = initial_delay.as_millis() as f64 * multiplier.powi(exponent);
                let capped_ms = delay_ms.min(max_delay.as_millis() as f64);
                Duration::from_millis(capped_ms as u64)
            }
        }
    }
}

/// Jitter type for adding randomness to retry delays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jitter {
    /// No jitter
    None,
    /// Full jitter: 0 to calculated delay
    Full,
    /// Equal jitter: half the calculated delay plus up to another half
    Equal,
}

impl Jitter {
    /// Apply jitter to the calculated delay
    pub fn apply(self, delay: Duration) -> Duration {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        match self {
            Self::None => delay,
            Self::Full => Duration::from_millis(random_up_to(millis)),
            Self::Equal => {
                let half = millis / 2;
                Duration::from_millis(half + random_up_to(millis - half))
            }
        }
    }
}

fn random_up_to(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    rand::thread_rng().gen_range(0..=max)
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first call included
    pub max_attempts: u32,
    /// Backoff strategy for calculating delays
    pub backoff: BackoffStrategy,
    /// Jitter type for randomizing delays
    pub jitter: Jitter,
    /// Maximum total time to spend retrying
    pub max_total_time: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffStrategy::Exponential {
                initial_delay: Duration::from_millis(200),
                multiplier: 2.0,
                max_delay: Duration::from_secs(10),
            },
            jitter: Jitter::Equal,
            max_total_time: Some(Duration::from_secs(120)),
        }
    }
}

impl RetryConfig {
    /// Create a configuration builder seeded with the defaults
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), RetryError<()>> {
        if self.max_attempts == 0 {
            return Err(RetryError::InvalidConfiguration {
                message: "max_attempts must be greater than 0".to_string(),
            });
        }

        if let BackoffStrategy::Exponential { multiplier, .. } = &self.backoff {
            if *multiplier < 1.0 {
                return Err(RetryError::InvalidConfiguration {
                    message: "exponential multiplier must be at least 1.0".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Builder for [`RetryConfig`] with fluent API
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    /// Total attempts, the first call included.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// Wait the same `delay` between attempts.
    pub fn fixed_backoff(mut self, delay: Duration) -> Self {
        self.config.backoff = BackoffStrategy::Fixed(delay);
        self
    }

    /// Grow the delay by `multiplier` per attempt, capped at `max`.
    pub fn exponential_backoff(
        mut self,
        initial_delay: Duration,
        multiplier: f64,
        max_delay: Duration,
    ) -> Self {
        self.config.backoff = BackoffStrategy::Exponential { initial_delay, multiplier, max_delay };
        self
    }

    /// Randomise delays with `jitter`.
    pub fn jitter(mut self, jitter: Jitter) -> Self {
        self.config.jitter = jitter;
        self
    }

    pub fn no_jitter(self) -> Self {
        self.jitter(Jitter::None)
    }

    /// Give up once retrying has taken `duration`.
    pub fn max_total_time(mut self, duration: Duration) -> Self {
        self.config.max_total_time = Some(duration);
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<RetryConfig, RetryError<()>> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// The main retry executor
#[derive(Debug, Clone)]
pub struct RetryExecutor<P> {
    config: RetryConfig,
    policy: P,
}

impl<P> RetryExecutor<P> {
    /// Create a new retry executor with the given configuration and policy
    pub fn new(config: RetryConfig, policy: P) -> Self {
        Self { config, policy }
    }

    /// Borrow the active configuration
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute an operation with retry logic
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> RetryResult<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with_outcome(operation).await.into_result()
    }

    /// Execute an operation with retry logic and return outcome statistics.
    pub async fn execute_with_outcome<F, Fut, T, E>(&self, mut operation: F) -> RetryOutcome<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();
        let mut attempt: u32 = 0;
        let mut total_delay = Duration::ZERO;

        loop {
            attempt += 1;
            debug!(attempt, max_attempts = self.config.max_attempts, "executing operation");

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "operation succeeded after retry");
                    }
                    return RetryOutcome { result: Ok(value), attempts: attempt, total_delay };
                }
                Err(error) => error,
            };

            let delay = match self.policy.should_retry(&error, attempt) {
                RetryDecision::Stop => {
                    debug!(attempt, ?error, "retry policy refused to retry");
                    return RetryOutcome {
                        result: Err(RetryError::NonRetryable { attempts: attempt, error }),
                        attempts: attempt,
                        total_delay,
                    };
                }
                _ if attempt >= self.config.max_attempts => {
                    warn!(attempt, ?error, "all retry attempts exhausted");
                    return RetryOutcome {
                        result: Err(RetryError::AttemptsExhausted {
                            attempts: attempt,
                            last: error,
                        }),
                        attempts: attempt,
                        total_delay,
                    };
                }
                RetryDecision::Retry => {
                    self.config.jitter.apply(self.config.backoff.calculate_delay(attempt - 1))
                }
                RetryDecision::RetryAfter(delay) => delay,
            };

            if let Some(max_total) = self.config.max_total_time {
                let elapsed = started.elapsed();
                if elapsed + delay > max_total {
                    warn!(attempt, ?elapsed, "retry time budget exceeded");
                    return RetryOutcome {
                        result: Err(RetryError::TimeoutExceeded { elapsed, last: error }),
                        attempts: attempt,
                        total_delay,
                    };
                }
            }

            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                ?error,
                "operation failed, retrying"
            );
            tokio::time::sleep(delay).await;
            total_delay += delay;
        }
    }
}

/// Convenience function to create a retry executor and execute an operation
pub async fn retry_with_policy<F, Fut, T, E, P>(
    config: RetryConfig,
    policy: P,
    operation: F,
) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: RetryPolicy<E>,
    E: fmt::Debug,
{
    RetryExecutor::new(config, policy).execute(operation).await
}
