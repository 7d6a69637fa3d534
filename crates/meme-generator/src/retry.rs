//! Retry with a flat backoff.
//!
//! Each attempt either succeeds or waits a fixed delay before the next one;
//! there is no growth between waits.

use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

use crate::config::{DEFAULT_FETCH_MAX_ATTEMPTS, DEFAULT_FETCH_RETRY_BACKOFF};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Wait between a failed attempt and the next one.
    pub backoff: Duration,
    /// Operation name for logging.
    pub operation_name: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_FETCH_MAX_ATTEMPTS,
            backoff: DEFAULT_FETCH_RETRY_BACKOFF,
            operation_name: "operation".to_string(),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with the given operation name.
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            ..Default::default()
        }
    }

    /// Set the total number of attempts (at least one).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the flat backoff.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Result of a retry operation.
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// Operation succeeded on attempt `attempts`.
    Success { value: T, attempts: u32 },
    /// Operation failed on every attempt; `error` is the last one.
    Failed { error: E, attempts: u32 },
}

/// Execute an async operation, retrying failures with a flat backoff.
///
/// The operation receives the 1-based attempt number.
///
/// # Example
/// ```ignore
/// let config = RetryConfig::new("fetch_clip").with_max_attempts(3);
/// let result = retry_async(&config, |_attempt| async {
///     fetcher.fetch(&request).await
/// }).await;
/// ```
pub async fn retry_async<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1u32;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                return RetryResult::Success {
                    value,
                    attempts: attempt,
                }
            }
            Err(e) if attempt < max_attempts => {
                warn!(
                    operation = %config.operation_name,
                    attempt,
                    max_attempts,
                    "Attempt failed, retrying in {:?}: {}",
                    config.backoff,
                    e
                );
                tokio::time::sleep(config.backoff).await;
                attempt += 1;
            }
            Err(e) => {
                error!(
                    operation = %config.operation_name,
                    attempt,
                    max_attempts,
                    "Attempt failed, retries exhausted: {}",
                    e
                );
                return RetryResult::Failed {
                    error: e,
                    attempts: attempt,
                };
            }
        }
    }
}
