//! Bounded retry with linear backoff.

use modus_core::{config::RetryConfig, error::ModusError};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How many times to try and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Never less than 1.
    pub max_attempts: u32,
    /// After failed attempt `n`, wait `n * unit`.
    pub unit: Duration,
}

impl RetryPolicy {
    pub fn linear(max_attempts: u32, unit: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            unit,
        }
    }

    /// Delay before the attempt that follows failed attempt `attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.unit * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::linear(3, Duration::from_secs(1))
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self::linear(cfg.max_attempts, Duration::from_secs(cfg.backoff_secs))
    }
}

/// Run `attempt` until it succeeds, fails with an error `is_retryable`
/// rejects, or the policy runs out. The last error is returned as-is.
///
/// `attempt` receives the 1-based attempt number.
pub async fn with_retry<T, F, Fut, P>(
    policy: &RetryPolicy,
    label: &str,
    is_retryable: P,
    mut attempt: F,
) -> Result<T, ModusError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ModusError>>,
    P: Fn(&ModusError) -> bool,
{
    let mut n = 1;
    loop {
        match attempt(n).await {
            Ok(v) => return Ok(v),
            Err(e) if n < policy.max_attempts && is_retryable(&e) => {
                let delay = policy.delay_after(n);
                warn!(
                    "{label}: attempt {n}/{} failed: {e}; retrying in {delay:?}",
                    policy.max_attempts
                );
                tokio::time::sleep(delay).await;
                n += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
