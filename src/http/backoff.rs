//! Caller-side retry with backoff
//!
//! The client itself never retries transport failures or 5xx responses.
//! Callers that want to can wrap a request in [`Backoff::retry`].

use crate::error::Result;
use crate::types::BackoffType;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Delay schedule for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Type of backoff strategy
    pub backoff_type: BackoffType,
    /// Initial delay
    pub initial: Duration,
    /// Maximum delay
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial: Duration::from_millis(100),
            max: Duration::from_secs(60),
        }
    }
}

impl Backoff {
    pub fn new(backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        Self {
            backoff_type,
            initial,
            max,
        }
    }

    /// Calculate backoff delay for a given attempt (0-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let delay = match self.backoff_type {
            BackoffType::Constant => self.initial,
            BackoffType::Linear => self.initial.saturating_mul(attempt.saturating_add(1)),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(attempt);
                self.initial.saturating_mul(factor)
            }
        };

        std::cmp::min(delay, self.max)
    }

    /// Run `op`, retrying up to `max_retries` times while the error is
    /// retryable. Non-retryable errors are returned immediately.
    pub async fn retry<T, F, Fut>(&self, max_retries: u32, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < max_retries => {
                    // A server-provided delay wins over the schedule.
                    let delay = e.retry_after().unwrap_or_else(|| self.delay(attempt));
                    warn!(
                        "Request failed ({}), attempt {}/{}, retrying in {:?}",
                        e,
                        attempt + 1,
                        max_retries + 1,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
