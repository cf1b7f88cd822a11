//! Retry-with-backoff combinator for flaky network calls.

use std::{future::Future, time::Duration};

use tracing::debug;

/// Errors that know whether another attempt could succeed.
pub trait Retryable: Sized {
    fn is_retryable(&self) -> bool;
    /// The error recorded when an attempt exceeds the per-attempt timeout.
    fn timed_out(after: Duration) -> Self;
}

/// Attempts, exponential backoff between them, and a timeout per attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(4),
            attempt_timeout: Duration::from_secs(15),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &claimguard_config::MediaConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_backoff: Duration::from_millis(config.base_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            attempt_timeout: Duration::from_secs(config.attempt_timeout_seconds),
        }
    }

    /// Delay after the `failed`-th failed attempt (1-based): `base * 2^(failed-1)`,
    /// capped at `max_backoff`.
    #[must_use]
    pub fn backoff_after(&self, failed: u32) -> Duration {
        let factor = 2u32.saturating_pow(failed.saturating_sub(1));
        self.base_backoff
            .checked_mul(factor)
            .map_or(self.max_backoff, |d| d.min(self.max_backoff))
    }
}

/// The last error once every attempt has been used (or a non-retryable error
/// stopped the loop early).
#[derive(Debug)]
pub struct RetryFailure<E> {
    pub attempts: u32,
    pub last: E,
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are exhausted. `op` receives the 1-based attempt number.
pub async fn with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, RetryFailure<E>>
where
    E: Retryable + std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let result = match tokio::time::timeout(policy.attempt_timeout, op(attempt)).await {
            Ok(result) => result,
            Err(_) => Err(E::timed_out(policy.attempt_timeout)),
        };
        match result {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts && e.is_retryable() => {
                let delay = policy.backoff_after(attempt);
                debug!(attempt, error = %e, delay_ms = delay.as_millis() as u64, "attempt failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            },
            Err(last) => {
                return Err(RetryFailure {
                    attempts: attempt,
                    last,
                });
            },
        }
    }
}
