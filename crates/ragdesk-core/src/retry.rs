//! Bounded retry with exponential backoff for capability adapters.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub multiplier_secs: f64,
    pub min_delay_secs: f64,
    pub max_delay_secs: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, multiplier_secs: 1.0, min_delay_secs: 4.0, max_delay_secs: 10.0 }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self { max_attempts: 1, multiplier_secs: 0.0, min_delay_secs: 0.0, max_delay_secs: 0.0 }
    }

    /// Delay before retry number `retry` (0-indexed): `multiplier * 2^retry`
    /// clamped to `[min_delay, max_delay]`.
    pub fn delay(&self, retry: u32) -> Duration {
        let exp = self.multiplier_secs * 2f64.powi(i32::try_from(retry).unwrap_or(i32::MAX));
        let secs = exp.max(self.min_delay_secs).min(self.max_delay_secs);
        Duration::from_secs_f64(secs.max(0.0))
    }

    /// Run `op` until it succeeds, `should_retry` rejects the error, or the
    /// attempts are exhausted. The last error is returned unchanged.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, should_retry: impl Fn(&E) -> bool, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "retry_succeeded");
                    }
                    return Ok(value);
                }
                Err(err) if attempt < max_attempts && should_retry(&err) => {
                    let delay = self.delay(attempt - 1);
                    warn!(operation, attempt, max_attempts, delay_ms = delay.as_millis() as u64, error = %err, "retrying_after_failure");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if attempt > 1 {
                        warn!(operation, attempt, error = %err, "retries_exhausted");
                    }
                    return Err(err);
                }
            }
        }
    }
}
