//! Fixed-interval retry.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::config::{DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_INTERVAL};

/// How many times to try an operation and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Wait after each failed attempt except the last.
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRY_ATTEMPTS,
            interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

impl RetryPolicy {
    /// Create a policy.
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }
}

/// The retry budget ran out.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    /// Attempts made.
    pub attempts: u32,
    /// Error of the final attempt.
    pub last_error: E,
}

/// Attempt counter for loops that cannot be written as a closure.
///
/// ```ignore
/// let mut attempts = Attempts::new(policy, "open stream");
/// loop {
///     attempts.begin();
///     match try_once().await {
///         Ok(value) => break value,
///         Err(e) => attempts.failed(e).await?,
///     }
/// }
/// ```
#[derive(Debug)]
pub struct Attempts {
    policy: RetryPolicy,
    operation: &'static str,
    made: u32,
}

impl Attempts {
    /// Start counting against `policy`.
    pub fn new(policy: RetryPolicy, operation: &'static str) -> Self {
        Self {
            policy,
            operation,
            made: 0,
        }
    }

    /// Record the start of an attempt and return its 1-based number.
    pub fn begin(&mut self) -> u32 {
        self.made += 1;
        self.made
    }

    /// Record a failure.
    ///
    /// Sleeps the interval and returns `Ok` if another attempt is allowed;
    /// otherwise returns the error without sleeping.
    pub async fn failed<E: fmt::Display>(&mut self, error: E) -> Result<(), RetryExhausted<E>> {
        let max = self.policy.attempts.max(1);
        if self.made >= max {
            return Err(RetryExhausted {
                attempts: self.made,
                last_error: error,
            });
        }

        tracing::warn!(
            operation = self.operation,
            attempt = self.made,
            max,
            error = %error,
            retry_in = ?self.policy.interval,
            "Attempt failed, retrying"
        );
        tokio::time::sleep(self.policy.interval).await;
        Ok(())
    }
}

/// Run `attempt` until it succeeds or the policy is used up.
pub async fn retry<T, E, F, Fut>(
    policy: RetryPolicy,
    operation: &'static str,
    mut attempt: F,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut attempts = Attempts::new(policy, operation);
    loop {
        let n = attempts.begin();
        match attempt().await {
            Ok(value) => {
                if n > 1 {
                    tracing::debug!(operation, attempt = n, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => attempts.failed(e).await?,
        }
    }
}
