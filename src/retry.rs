use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::transport::TransportError;

/// Exponential backoff policy shared by chunk uploads and finalize calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Number of retries after the initial attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each retry
    pub backoff_factor: f64,
    /// Upper bound on the delay between retries
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            initial_delay: Duration::from_millis(500),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Replace non-positive or non-finite fields with their defaults.
    ///
    /// Mirrors the lenient handling of user-supplied configuration values:
    /// an invalid knob falls back to the documented default instead of
    /// failing construction.
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();
        if self.initial_delay.is_zero() {
            self.initial_delay = defaults.initial_delay;
        }
        if self.max_delay.is_zero() {
            self.max_delay = defaults.max_delay;
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor <= 0.0 {
            self.backoff_factor = defaults.backoff_factor;
        }
        self
    }

    fn next_delay(&self, current: Duration) -> Duration {
        current.mul_f64(self.backoff_factor).min(self.max_delay)
    }
}

/// Run `op` under the retry policy.
///
/// The operation is retried only while the returned error reports itself as
/// retryable and the retry budget is not exhausted; otherwise the error is
/// propagated unchanged. Delays follow exponential backoff capped at
/// `max_delay`.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, TransportError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let mut attempt: u32 = 0;
    let mut delay = policy.initial_delay;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= policy.max_retries || !err.retryable() {
                    return Err(err);
                }

                warn!(
                    "Retryable failure (attempt {}/{}): {}, retrying in {:?}",
                    attempt + 1,
                    policy.max_retries,
                    err,
                    delay
                );

                tokio::time::sleep(delay).await;
                attempt += 1;
                delay = policy.next_delay(delay);
            }
        }
    }
}
