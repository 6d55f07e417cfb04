//! Exponential backoff for transient data-source failures.

use std::future::Future;
use std::time::Duration;

use rivalry_models::RetryConfig;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::ToolError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            backoff_multiplier: config.multiplier,
        }
    }

    /// A single attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Three attempts with millisecond backoff, for tests.
    pub fn fast() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(20),
            backoff_multiplier: 2.0,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff_duration(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let millis = self.initial_backoff.as_millis() as f64
            * self.backoff_multiplier.powi(retry as i32 - 1);
        Duration::from_millis(millis as u64).min(self.max_backoff)
    }

    /// Runs `operation` until it succeeds, fails permanently, or attempts run out.
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Result<T, ToolError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ToolError>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation = operation_name, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let backoff = self.backoff_duration(attempt);
                    warn!(
                        operation = operation_name,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        backoff_ms = backoff.as_millis() as u64,
                        "Retrying after transient error"
                    );
                    sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
