//! Retry configuration, delay calculation, and the search provider decorator.
//!
//! Provides [`RetryConfig`] for controlling retry behaviour and
//! [`RetryingSearchProvider`], which wraps a [`SearchProvider`] with
//! automatic retry on transient network errors.
//!
//! [`BulkResolver`](crate::BulkResolver) does not use the decorator: it
//! applies the same [`RetryConfig`] inside its own fetch loop so that every
//! attempt is admitted by the rate limiter. The decorator is for callers
//! driving a provider directly.
//!
//! Rate-limit signals are *not* retried here. They pass straight through so
//! the engine can put the shared [`RateLimiter`](crate::RateLimiter) into
//! cool-down before anyone calls the remote again.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::traits::SearchProvider;
use crate::telemetry;
use crate::types::{Candidate, ContentKind, ExternalId};
use crate::{MuninnError, Result};

/// Configuration for retry behaviour on transient errors.
///
/// Uses exponential backoff:
///
/// ```rust
/// # use muninn::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(5)
///     .initial_delay(Duration::from_millis(200));
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 3.
    pub max_attempts: u32,
    /// Base delay before the first retry. Default: 500ms.
    pub initial_delay: Duration,
    /// Maximum delay between retries (caps exponential growth). Default: 30s.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set maximum attempts (including the initial request).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the base delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Delay before retry number `attempt` (0-indexed):
    /// `initial_delay * 2^attempt`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.initial_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay)
    }
}

/// Decide whether a failed attempt should be retried.
///
/// `attempt` is zero-based. Returns the backoff delay when `err` is
/// transient and attempts remain, recording the retry; `None` otherwise.
pub(crate) fn retry_delay(
    config: &RetryConfig,
    provider_name: &str,
    operation: &str,
    attempt: u32,
    err: &MuninnError,
) -> Option<Duration> {
    let attempts = config.max_attempts.max(1);
    if !err.is_transient() || attempt + 1 >= attempts {
        return None;
    }
    metrics::counter!(telemetry::RETRIES_TOTAL,
        "provider" => provider_name.to_owned(),
        "operation" => operation.to_owned(),
    )
    .increment(1);
    let delay = config.delay_for_attempt(attempt);
    warn!(
        provider = provider_name,
        operation,
        attempt = attempt + 1,
        max_attempts = attempts,
        delay_ms = delay.as_millis() as u64,
        error = %err,
        "retrying after transient error"
    );
    Some(delay)
}

/// Execute an async operation, retrying transient errors.
///
/// Non-transient errors (including rate-limit signals) are returned
/// immediately.
pub(crate) async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    provider_name: &str,
    operation: &str,
    f: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) => match retry_delay(config, provider_name, operation, attempt, &e) {
                Some(delay) => {
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => return Err(e),
            },
        }
    }
}

/// Decorator that wraps a [`SearchProvider`] with retry logic.
pub struct RetryingSearchProvider {
    inner: Arc<dyn SearchProvider>,
    config: RetryConfig,
}

impl RetryingSearchProvider {
    pub fn new(inner: Arc<dyn SearchProvider>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl SearchProvider for RetryingSearchProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn search(
        &self,
        text: &str,
        kind: Option<ContentKind>,
        year: Option<u16>,
    ) -> Result<Vec<Candidate>> {
        with_retry(&self.config, self.inner.name(), "search", || {
            self.inner.search(text, kind, year)
        })
        .await
    }

    async fn lookup(&self, id: &ExternalId, kind: Option<ContentKind>) -> Result<Vec<Candidate>> {
        with_retry(&self.config, self.inner.name(), "lookup", || {
            self.inner.lookup(id, kind)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_and_caps() {
        let config = RetryConfig::new()
            .initial_delay(Duration::from_millis(100))
            .max_delay(Duration::from_millis(350));
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(350));
        assert_eq!(config.delay_for_attempt(40), Duration::from_millis(350));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_signal_is_not_retried() {
        let calls = std::sync::atomic::AtomicU32::new(0);
        let result: Result<()> = with_retry(&RetryConfig::new(), "test", "search", || {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async { Err(MuninnError::RateLimited { retry_after: None }) }
        })
        .await;
        assert!(result.unwrap_err().is_rate_limited());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_error_retried_until_attempts_exhausted() {
        let calls = std::sync::atomic::AtomicU32::new(0);
        let result: Result<()> =
            with_retry(&RetryConfig::new().max_attempts(3), "test", "search", || {
                calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                async { Err(MuninnError::Http("connection reset".into())) }
            })
            .await;
        assert!(matches!(result, Err(MuninnError::Http(_))));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    }
}
