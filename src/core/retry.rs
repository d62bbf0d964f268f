//! Bounded retry with exponential backoff for external calls.
//!
//! Every network call the pipeline makes (chat completion, file upload,
//! job creation, reference lookup) goes through [`retry`] so the
//! orchestration code stays declarative about failure policy.

use std::future::Future;
use std::time::Duration;

/// Retry policy for a single external operation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles on each retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// The last error is returned unchanged, so callers keep their own
/// error types.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempt += 1;
                if attempt >= policy.max_attempts {
                    log::warn!("{what}: giving up after {attempt} attempts: {e}");
                    return Err(e);
                }
                let delay = policy.delay_for(attempt);
                log::warn!(
                    "{what}: attempt {attempt}/{} failed: {e}; retrying in {}ms",
                    policy.max_attempts,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
