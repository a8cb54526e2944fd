use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use muninn::providers::{RetryConfig, RetryingSearchProvider, SearchProvider};
use muninn::{Candidate, ContentKind, ExternalId, MuninnError, Result};

/// Mock provider that fails N times then succeeds.
struct FailThenSucceed {
    fail_count: AtomicU32,
    fail_with: fn() -> MuninnError,
    total_calls: AtomicU32,
}

impl FailThenSucceed {
    fn new(failures: u32, fail_with: fn() -> MuninnError) -> Self {
        Self {
            fail_count: AtomicU32::new(failures),
            fail_with,
            total_calls: AtomicU32::new(0),
        }
    }

    fn call_count(&self) -> u32 {
        self.total_calls.load(Ordering::Relaxed)
    }

    fn attempt(&self) -> Result<Vec<Candidate>> {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        let remaining = self.fail_count.load(Ordering::Relaxed);
        if remaining > 0 {
            self.fail_count.fetch_sub(1, Ordering::Relaxed);
            return Err((self.fail_with)());
        }
        Ok(vec![Candidate::new(ContentKind::Movie, "Dune", Some(2021), 2)])
    }
}

#[async_trait]
impl SearchProvider for FailThenSucceed {
    fn name(&self) -> &str {
        "mock-retry"
    }

    async fn search(
        &self,
        _text: &str,
        _kind: Option<ContentKind>,
        _year: Option<u16>,
    ) -> Result<Vec<Candidate>> {
        self.attempt()
    }

    async fn lookup(&self, _id: &ExternalId, _kind: Option<ContentKind>) -> Result<Vec<Candidate>> {
        self.attempt()
    }
}

fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig::new()
        .max_attempts(max_attempts)
        .initial_delay(Duration::from_millis(1))
}

#[tokio::test]
async fn retries_on_transient_error_then_succeeds() {
    let inner = Arc::new(FailThenSucceed::new(2, || {
        MuninnError::Http("connection reset".into())
    }));
    let provider = RetryingSearchProvider::new(inner.clone(), fast_retry(3));

    let candidates = provider.search("dune", None, None).await.unwrap();
    assert_eq!(candidates[0].catalog_id(), 2);
    assert_eq!(inner.call_count(), 3);
}

#[tokio::test]
async fn lookup_is_retried_too() {
    let inner = Arc::new(FailThenSucceed::new(1, || MuninnError::Api {
        status: 503,
        message: "unavailable".into(),
    }));
    let provider = RetryingSearchProvider::new(inner.clone(), fast_retry(3));

    let candidates = provider
        .lookup(&ExternalId::Catalog(2), Some(ContentKind::Movie))
        .await
        .unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(inner.call_count(), 2);
}

#[tokio::test]
async fn gives_up_after_max_attempts() {
    let inner = Arc::new(FailThenSucceed::new(10, || {
        MuninnError::Timeout(Duration::from_secs(1))
    }));
    let provider = RetryingSearchProvider::new(inner.clone(), fast_retry(3));

    let err = provider.search("dune", None, None).await.unwrap_err();
    assert!(matches!(err, MuninnError::Timeout(_)));
    assert_eq!(inner.call_count(), 3);
}

#[tokio::test]
async fn permanent_error_is_not_retried() {
    let inner = Arc::new(FailThenSucceed::new(1, || MuninnError::AuthenticationFailed));
    let provider = RetryingSearchProvider::new(inner.clone(), fast_retry(3));

    let err = provider.search("dune", None, None).await.unwrap_err();
    assert!(matches!(err, MuninnError::AuthenticationFailed));
    assert_eq!(inner.call_count(), 1);
}

#[tokio::test]
async fn rate_limit_is_passed_through_untouched() {
    let inner = Arc::new(FailThenSucceed::new(1, || MuninnError::RateLimited {
        retry_after: Some(Duration::from_secs(9)),
    }));
    let provider = RetryingSearchProvider::new(inner.clone(), fast_retry(3));

    let err = provider.search("dune", None, None).await.unwrap_err();
    assert_eq!(err.retry_after(), Some(Duration::from_secs(9)));
    assert_eq!(inner.call_count(), 1);
}

#[tokio::test]
async fn disabled_config_makes_single_attempt() {
    let inner = Arc::new(FailThenSucceed::new(1, || {
        MuninnError::Http("connection reset".into())
    }));
    let provider = RetryingSearchProvider::new(inner.clone(), RetryConfig::disabled());

    assert!(provider.search("dune", None, None).await.is_err());
    assert_eq!(inner.call_count(), 1);
}

#[test]
fn decorator_keeps_inner_name() {
    let inner = Arc::new(FailThenSucceed::new(0, || MuninnError::Cancelled));
    let provider = RetryingSearchProvider::new(inner, RetryConfig::default());
    assert_eq!(provider.name(), "mock-retry");
}
