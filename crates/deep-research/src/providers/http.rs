//! Shared HTTP plumbing for the JSON API providers

use std::future::Future;
use std::time::Duration;

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::ProviderError;

/// Default timeout for provider API requests
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum retry attempts for transient failures
pub const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds)
pub const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Upper bound on a single backoff sleep
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Retry policy shared by the HTTP providers.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Sleep before retry number `attempt` (1-based), doubling each time up
    /// to [`MAX_RETRY_DELAY`].
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32
            .checked_pow(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(MAX_RETRY_DELAY)
            .min(MAX_RETRY_DELAY)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// retry budget is spent.
    pub async fn run<T, F, Fut>(&self, provider: &str, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.backoff(attempt);
                    warn!(provider, attempt, error = %e, "Request failed, will retry");
                    debug!(provider, delay_ms = delay.as_millis() as u64, "Backing off");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Send a prepared request and decode a JSON body, mapping failures onto
/// [`ProviderError`].
pub async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(ProviderError::from_transport)?;

    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()));
    }

    let error_text = response.text().await.unwrap_or_default();
    Err(ProviderError::from_status(status.as_u16(), error_text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
        assert_eq!(policy.backoff(6), MAX_RETRY_DELAY);
        // Exponents past u32 range saturate instead of overflowing
        assert_eq!(policy.backoff(33), MAX_RETRY_DELAY);
        assert_eq!(policy.backoff(u32::MAX), MAX_RETRY_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_with_large_budget() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_retries: 40,
            base_delay: Duration::from_millis(1),
        };

        let result = policy
            .run("test", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 35 {
                    Err(ProviderError::Timeout)
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 35);
        assert_eq!(calls.load(Ordering::SeqCst), 36);
    }

    #[tokio::test]
    async fn test_retry_stops_on_non_retryable() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
        };

        let result: Result<(), _> = policy
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::Unauthorized)
            })
            .await;

        assert!(matches!(result, Err(ProviderError::Unauthorized)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_until_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
        };

        let result = policy
            .run("test", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(ProviderError::RateLimited)
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_budget_exhausted() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
        };

        let result: Result<(), _> = policy
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::Timeout)
            })
            .await;

        assert!(matches!(result, Err(ProviderError::Timeout)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
