//! Retry policy for upstream attempts
//!
//! Attempts are strictly sequential with exponential backoff between
//! failures. Only transport-level failures are retried; an HTTP error
//! response from upstream never is.

use crate::forward::error::ForwardError;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the initial one
    pub max_attempts: u32,

    /// Delay before the first retry (milliseconds)
    pub initial_delay_ms: u64,

    /// Ceiling on the backoff delay (milliseconds)
    pub max_delay_ms: u64,

    /// Base for exponential backoff
    pub exponential_base: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_delay_ms: 1000,
            max_delay_ms: 5000,
            exponential_base: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with no retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Backoff after the given 1-based failed attempt:
    /// `min(initial * base^(attempt-1), max)`. No jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let delay = self.initial_delay_ms as f64 * self.exponential_base.powi(exponent as i32);
        Duration::from_millis(delay.min(self.max_delay_ms as f64) as u64)
    }

    /// Whether another attempt should follow the given failed one
    pub fn should_retry(&self, error: &ForwardError, attempt: u32) -> bool {
        attempt < self.max_attempts && error.is_retryable()
    }

    /// Run `operation` until it succeeds, a non-retryable error occurs, or
    /// attempts are exhausted. The operation receives the 1-based attempt
    /// number; the last error propagates.
    pub async fn run<F, Fut, T>(&self, mut operation: F) -> Result<T, ForwardError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ForwardError>>,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(result) => {
                    if attempt > 1 {
                        info!(attempt, "upstream request succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(error) => {
                    if !self.should_retry(&error, attempt) {
                        return Err(error);
                    }
                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        %error,
                        "upstream attempt failed, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.initial_delay_ms, 1000);
        assert_eq!(policy.max_delay_ms, 5000);
        assert_eq!(policy.exponential_base, 2.0);
    }

    #[test]
    fn test_backoff_growth_and_cap() {
        let policy = RetryPolicy {
            max_attempts: 5,
            ..Default::default()
        };
        assert_eq!(policy.backoff(1).as_millis(), 1000); // 1000 * 2^0
        assert_eq!(policy.backoff(2).as_millis(), 2000); // 1000 * 2^1
        assert_eq!(policy.backoff(3).as_millis(), 4000); // 1000 * 2^2
        assert_eq!(policy.backoff(4).as_millis(), 5000); // capped
        assert_eq!(policy.backoff(5).as_millis(), 5000); // capped
    }

    #[test]
    fn test_should_retry_transport_failures_only() {
        let policy = RetryPolicy::default();

        assert!(policy.should_retry(&ForwardError::Timeout, 1));
        assert!(policy.should_retry(&ForwardError::Unreachable, 1));
        // Attempt budget exhausted
        assert!(!policy.should_retry(&ForwardError::Timeout, 2));

        // Upstream HTTP errors never retry
        let rejected = ForwardError::UpstreamRejected {
            status: 500,
            details: String::new(),
        };
        assert!(!policy.should_retry(&rejected, 1));
        assert!(!policy.should_retry(&ForwardError::InvalidRequest, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_retries_then_succeeds() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result = policy
            .run(|_attempt| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(ForwardError::Timeout)
                    } else {
                        Ok(42u32)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_propagates_last_error_after_exhaustion() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .run(|_attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ForwardError::Unreachable) }
            })
            .await;

        assert!(matches!(result.unwrap_err(), ForwardError::Unreachable));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_run_does_not_retry_upstream_rejection() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .run(|_attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(ForwardError::UpstreamRejected {
                        status: 429,
                        details: "rate limited".to_string(),
                    })
                }
            })
            .await;

        assert!(matches!(
            result.unwrap_err(),
            ForwardError::UpstreamRejected { status: 429, .. }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
