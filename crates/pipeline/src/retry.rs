//! Retry policy for store writes
//!
//! Bounded attempts with a constant delay between them. There is no
//! exponential backoff and no circuit breaker: a record that keeps failing
//! is dropped after its last attempt. Errors classified as permanent end
//! the loop after the attempt that produced them.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

/// Default write attempts per record
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Default delay between attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Attempt count and inter-attempt delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub attempts: u32,

    /// Sleep between two consecutive attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Create a policy
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// Attempts actually made, at least one
    #[inline]
    pub fn effective_attempts(&self) -> u32 {
        self.attempts.max(1)
    }
}

/// Attempts stopped without success; carries the outcome of the last one
#[derive(Debug, Error)]
#[error("failed after {attempts} attempts: {last_error}")]
pub struct RetryExhausted<E> {
    /// Attempts made
    pub attempts: u32,

    /// Error from the final attempt
    pub last_error: E,
}

/// Run `operation` until it succeeds or the policy's attempts run out
///
/// The closure receives the 1-based attempt number. Between two attempts
/// the task sleeps for `policy.delay`, so a record that fails every time
/// costs exactly `attempts - 1` delays.
pub async fn execute_with_retry<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation_name: &str,
    operation: F,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    execute_with_retry_if(policy, operation_name, |_| true, operation).await
}

/// Like `execute_with_retry`, but gives up at once on an error for which
/// `is_retryable` returns false
///
/// A permanent failure costs one attempt and no delay.
pub async fn execute_with_retry_if<R, F, Fut, T, E>(
    policy: &RetryPolicy,
    operation_name: &str,
    is_retryable: R,
    mut operation: F,
) -> Result<T, RetryExhausted<E>>
where
    R: Fn(&E) -> bool,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = policy.effective_attempts();
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts || !is_retryable(&e) => {
                return Err(RetryExhausted {
                    attempts: attempt,
                    last_error: e,
                });
            }
            Err(e) => {
                debug!(
                    operation = operation_name,
                    attempt,
                    max_attempts = attempts,
                    delay_ms = policy.delay.as_millis() as u64,
                    error = %e,
                    "attempt failed, will retry"
                );
            }
        }

        tokio::time::sleep(policy.delay).await;
        attempt += 1;
    }
}
