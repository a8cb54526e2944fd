//! Builder for configuring resolver instances

use std::sync::Arc;
use std::time::Duration;

use super::BulkResolver;
use crate::cache::{CacheConfig, ResultCache};
use crate::config::{Config, Secrets};
use crate::events::{EventSink, TracingEventSink};
use crate::limiter::{RateLimitConfig, RateLimiter};
use crate::parallel::{ParallelConfig, ParallelResolver};
use crate::providers::{
    CatalogClient, CredentialProvider, RetryConfig, SearchProvider, StaticToken,
};
use crate::{MuninnError, Result};

/// Default per-call timeout for remote requests.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of re-admissions after a remote rate-limit signal.
const DEFAULT_MAX_RATE_LIMIT_RETRIES: u32 = 5;

/// Main entry point for creating resolver instances.
pub struct Muninn;

impl Muninn {
    /// Create a new builder for configuring the resolver.
    pub fn builder() -> MuninnBuilder {
        MuninnBuilder::new()
    }
}

/// Builder for configuring resolver instances.
///
/// ```rust,no_run
/// # use muninn::{Muninn, RateLimitConfig, ParallelConfig};
/// # use std::time::Duration;
/// let resolver = Muninn::builder()
///     .catalog("client-id")
///     .access_token("token")
///     .rate_limit(RateLimitConfig::new().quota(1000).window(Duration::from_secs(300)))
///     .parallel(ParallelConfig::new().concurrency(8))
///     .build()?;
/// # Ok::<(), muninn::MuninnError>(())
/// ```
pub struct MuninnBuilder {
    catalog_client_id: Option<String>,
    catalog_url: Option<String>,
    credentials: Option<Arc<dyn CredentialProvider>>,
    search_provider: Option<Arc<dyn SearchProvider>>,
    rate_limit: RateLimitConfig,
    cache: CacheConfig,
    parallel: ParallelConfig,
    retry: Option<RetryConfig>,
    event_sink: Option<Arc<dyn EventSink>>,
    request_timeout: Duration,
    max_rate_limit_retries: u32,
}

impl MuninnBuilder {
    pub fn new() -> Self {
        Self {
            catalog_client_id: None,
            catalog_url: None,
            credentials: None,
            search_provider: None,
            rate_limit: RateLimitConfig::default(),
            cache: CacheConfig::default(),
            parallel: ParallelConfig::default(),
            retry: None,
            event_sink: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_rate_limit_retries: DEFAULT_MAX_RATE_LIMIT_RETRIES,
        }
    }

    /// Start from file configuration and secrets.
    pub fn from_config(config: &Config, secrets: &Secrets) -> Self {
        let mut builder = Self::new()
            .rate_limit(config.rate_limit.to_rate_limit_config())
            .cache(config.cache.to_cache_config())
            .parallel(config.parallel.to_parallel_config())
            .request_timeout(Duration::from_secs(config.request.timeout_secs))
            .max_rate_limit_retries(config.request.max_rate_limit_retries);

        if config.retry.enabled {
            builder = builder.retry(config.retry.to_retry_config());
        }
        if let Some(url) = &config.catalog.base_url {
            builder = builder.catalog_url(url.clone());
        }
        if let Some(client_id) = secrets.client_id() {
            builder = builder.catalog(client_id);
        }
        if let Some(token) = secrets.access_token() {
            builder = builder.access_token(token);
        }
        builder
    }

    /// Use the HTTP catalog with the given API client id.
    pub fn catalog(mut self, client_id: impl Into<String>) -> Self {
        self.catalog_client_id = Some(client_id.into());
        self
    }

    /// Override the catalog base URL.
    pub fn catalog_url(mut self, url: impl Into<String>) -> Self {
        self.catalog_url = Some(url.into());
        self
    }

    /// Set the credential provider used by the HTTP catalog.
    pub fn credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Use a fixed bearer token for the HTTP catalog.
    pub fn access_token(self, token: impl Into<String>) -> Self {
        self.credentials(Arc::new(StaticToken::new(token)))
    }

    /// Use a custom search provider instead of the HTTP catalog.
    pub fn search_provider(mut self, provider: Arc<dyn SearchProvider>) -> Self {
        self.search_provider = Some(provider);
        self
    }

    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = config;
        self
    }

    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    pub fn parallel(mut self, config: ParallelConfig) -> Self {
        self.parallel = config;
        self
    }

    /// Retry transient network errors with exponential backoff.
    ///
    /// Off by default. Every retry is admitted by the rate limiter like a
    /// first attempt and gets its own request timeout. Rate-limit signals
    /// are always handled by the rate limiter, whether or not this is set.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    /// Send engine events to `sink` (default: [`TracingEventSink`]).
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Per-call timeout for remote requests (default: 30s).
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// How often one item is re-admitted after a remote rate-limit signal
    /// (default: 5).
    pub fn max_rate_limit_retries(mut self, n: u32) -> Self {
        self.max_rate_limit_retries = n;
        self
    }

    /// Build the resolver.
    pub fn build(self) -> Result<BulkResolver> {
        let provider: Arc<dyn SearchProvider> = match (self.search_provider, self.catalog_client_id)
        {
            (Some(provider), _) => provider,
            (None, Some(client_id)) => {
                let credentials = self.credentials.ok_or_else(|| {
                    MuninnError::Configuration(
                        "catalog client id configured without credentials".into(),
                    )
                })?;
                let client = match self.catalog_url {
                    Some(url) => {
                        CatalogClient::with_base_url(client_id, credentials, url, self.request_timeout)?
                    }
                    None => CatalogClient::new(client_id, credentials, self.request_timeout)?,
                };
                Arc::new(client)
            }
            (None, None) => return Err(MuninnError::NoProvider),
        };

        let events = self
            .event_sink
            .unwrap_or_else(|| Arc::new(TracingEventSink));

        Ok(BulkResolver {
            search: provider,
            limiter: Arc::new(RateLimiter::with_events(self.rate_limit, events.clone())),
            cache: Arc::new(ResultCache::new(&self.cache)),
            parallel: ParallelResolver::new(self.parallel),
            events,
            request_timeout: self.request_timeout,
            max_rate_limit_retries: self.max_rate_limit_retries,
            retry: self.retry.unwrap_or_else(RetryConfig::disabled),
        })
    }
}

impl Default for MuninnBuilder {
    fn default() -> Self {
        Self::new()
    }
}
