//! The bulk resolution orchestrator.
//!
//! [`BulkResolver::resolve_batch`] runs one batch through the pipeline:
//!
//! ```text
//!  queries ─► dedupe by QueryKey ─► ResultCache.get ─┬─ hit ───────────────┐
//!                                                    └─ miss ─► Parallel   │
//!                        RateLimiter.admit ─► remote search/lookup ─► set  │
//!                                                                    ▼     ▼
//!                                       disambiguate ─► fan out to every query
//! ```
//!
//! Every input query ends up with exactly one outcome. Per-item failures
//! (network, auth, timeout, cancellation) are recorded as
//! `Failed` outcomes and never abort sibling items.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::cache::{CacheMetrics, ResultCache};
use crate::cancel::{CancelSignal, cancellation};
use crate::disambiguate::disambiguate;
use crate::events::{EventSink, ResolutionEvent};
use crate::limiter::RateLimiter;
use crate::parallel::ParallelResolver;
use crate::providers::retry::retry_delay;
use crate::providers::{RetryConfig, SearchProvider};
use crate::telemetry;
use crate::types::{BatchResult, Candidate, FailureReason, Query, QueryKey, ResolutionOutcome};
use crate::{MuninnError, Result};

/// Resolves batches of free-text queries to catalog items.
///
/// Owns its [`RateLimiter`] and [`ResultCache`]; construct one per remote
/// account with [`Muninn::builder`](crate::Muninn::builder) and share it by
/// reference. All methods take `&self` and are safe to call concurrently.
pub struct BulkResolver {
    pub(crate) search: Arc<dyn SearchProvider>,
    pub(crate) limiter: Arc<RateLimiter>,
    pub(crate) cache: Arc<ResultCache>,
    pub(crate) parallel: ParallelResolver,
    pub(crate) events: Arc<dyn EventSink>,
    pub(crate) request_timeout: Duration,
    pub(crate) max_rate_limit_retries: u32,
    pub(crate) retry: RetryConfig,
}

impl BulkResolver {
    /// Resolve every query in `queries`.
    pub async fn resolve_batch(&self, queries: &[Query]) -> Result<BatchResult> {
        self.resolve_batch_with_cancel(queries, &CancelSignal::never())
            .await
    }

    /// Resolve `queries`, cancelling whatever is still pending after
    /// `deadline`.
    ///
    /// Items finished before the deadline keep their outcome; the rest are
    /// `Failed(Cancelled)`.
    pub async fn resolve_batch_with_deadline(
        &self,
        queries: &[Query],
        deadline: Duration,
    ) -> Result<BatchResult> {
        let (handle, signal) = cancellation();
        let work = self.resolve_batch_with_cancel(queries, &signal);
        tokio::pin!(work);

        tokio::select! {
            biased;
            result = &mut work => return result,
            _ = tokio::time::sleep(deadline) => {}
        }

        warn!(
            deadline_ms = deadline.as_millis() as u64,
            "batch deadline exceeded, cancelling pending items"
        );
        handle.cancel();
        work.await
    }

    /// Resolve `queries`, stopping early when `cancel` fires.
    #[instrument(skip_all, fields(queries = queries.len()))]
    pub async fn resolve_batch_with_cancel(
        &self,
        queries: &[Query],
        cancel: &CancelSignal,
    ) -> Result<BatchResult> {
        // Dedupe, remembering every original query behind each key and the
        // order keys were first seen.
        let mut order: Vec<QueryKey> = Vec::new();
        let mut groups: HashMap<QueryKey, Vec<&Query>> = HashMap::new();
        for query in queries {
            match groups.entry(query.key()) {
                Entry::Occupied(mut e) => e.get_mut().push(query),
                Entry::Vacant(e) => {
                    order.push(e.key().clone());
                    e.insert(vec![query]);
                }
            }
        }

        let mut outcomes: HashMap<QueryKey, ResolutionOutcome> =
            HashMap::with_capacity(order.len());
        let mut misses = Vec::new();
        for key in &order {
            match self.cache.get(key) {
                Some(candidates) => {
                    self.events.emit(&ResolutionEvent::CacheHit {
                        key: key.to_string(),
                    });
                    outcomes.insert(key.clone(), disambiguate(&candidates, &key.hints()));
                }
                None => {
                    self.events.emit(&ResolutionEvent::CacheMiss {
                        key: key.to_string(),
                    });
                    misses.push(key.clone());
                }
            }
        }

        debug!(
            unique = order.len(),
            cache_hits = order.len() - misses.len(),
            misses = misses.len(),
            "batch deduplicated"
        );

        let report = self
            .parallel
            .run_cancellable(misses, |key| self.fetch(key), cancel)
            .await;

        for (key, candidates) in report.succeeded {
            self.cache.set(key.clone(), candidates.clone());
            let outcome = disambiguate(&candidates, &key.hints());
            outcomes.insert(key, outcome);
        }
        for (key, err) in report.failed {
            outcomes.insert(key, ResolutionOutcome::Failed(FailureReason::from(&err)));
        }

        let mut result = BatchResult::default();
        for key in order {
            let outcome = outcomes.remove(&key).ok_or_else(|| {
                MuninnError::Internal(format!("no outcome recorded for {key}"))
            })?;
            let members = groups.remove(&key).unwrap_or_default();
            self.report_outcome(&key, &outcome, members.len());
            for query in members {
                result.insert(query.clone(), outcome.clone());
            }
        }

        debug!(
            resolved = result.resolved.len(),
            ambiguous = result.ambiguous.len(),
            failed = result.failed.len(),
            "batch finished"
        );
        Ok(result)
    }

    /// Snapshot of the result cache counters.
    pub fn cache_metrics(&self) -> CacheMetrics {
        self.cache.metrics()
    }

    /// Drop every cached entry. Affects only future lookups.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Remove expired cache entries, returning how many were removed.
    pub fn prune_cache(&self) -> usize {
        self.cache.prune()
    }

    /// The shared admission gate, for diagnostics.
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Fetch raw candidates for one key.
    ///
    /// Every attempt is admitted by the rate limiter and bounded by the
    /// request timeout. Remote rate-limit signals re-admit until
    /// `max_rate_limit_retries` is spent; transient errors are retried with
    /// backoff per the [`RetryConfig`].
    async fn fetch(&self, key: QueryKey) -> Result<Vec<Candidate>> {
        let provider = self.search.name().to_owned();
        let operation = key.operation();
        let mut rate_limit_retries = 0u32;
        let mut transient_attempt = 0u32;

        loop {
            self.limiter.admit().await;

            let started = Instant::now();
            let result = match tokio::time::timeout(self.request_timeout, self.call(&key)).await {
                Ok(result) => result,
                Err(_) => Err(MuninnError::Timeout(self.request_timeout)),
            };

            let status = if result.is_ok() { "ok" } else { "error" };
            metrics::counter!(telemetry::REMOTE_REQUESTS_TOTAL,
                "provider" => provider.clone(),
                "operation" => operation,
                "status" => status,
            )
            .increment(1);
            metrics::histogram!(telemetry::REMOTE_REQUEST_DURATION_SECONDS,
                "provider" => provider.clone(),
                "operation" => operation,
            )
            .record(started.elapsed().as_secs_f64());

            match result {
                Ok(candidates) => {
                    self.limiter.on_success();
                    return Ok(candidates);
                }
                Err(err) if err.is_rate_limited() => {
                    let cooldown = self.limiter.on_rate_limited(err.retry_after());
                    if rate_limit_retries >= self.max_rate_limit_retries {
                        return Err(err);
                    }
                    rate_limit_retries += 1;
                    debug!(
                        %key,
                        attempt = rate_limit_retries,
                        cooldown_ms = cooldown.as_millis() as u64,
                        "retrying after remote rate limit"
                    );
                }
                Err(err) => {
                    match retry_delay(&self.retry, &provider, operation, transient_attempt, &err) {
                        Some(delay) => {
                            transient_attempt += 1;
                            tokio::time::sleep(delay).await;
                        }
                        None => return Err(err),
                    }
                }
            }
        }
    }

    async fn call(&self, key: &QueryKey) -> Result<Vec<Candidate>> {
        match key {
            QueryKey::Search { text, kind, year } => self.search.search(text, *kind, *year).await,
            QueryKey::Lookup { id, kind } => self.search.lookup(id, *kind).await,
        }
    }

    fn report_outcome(&self, key: &QueryKey, outcome: &ResolutionOutcome, queries: usize) {
        metrics::counter!(telemetry::OUTCOMES_TOTAL, "outcome" => outcome.label()).increment(1);

        let event = match outcome {
            ResolutionOutcome::Resolved(candidate) => ResolutionEvent::Resolved {
                key: key.to_string(),
                catalog_id: candidate.catalog_id(),
                queries,
            },
            ResolutionOutcome::Ambiguous(candidates) => ResolutionEvent::Ambiguous {
                key: key.to_string(),
                candidates: candidates.len(),
                queries,
            },
            ResolutionOutcome::Failed(reason) => ResolutionEvent::Failed {
                key: key.to_string(),
                reason: reason.to_string(),
                queries,
            },
        };
        self.events.emit(&event);
    }
}

impl std::fmt::Debug for BulkResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkResolver")
            .field("provider", &self.search.name())
            .field("parallel", self.parallel.config())
            .field("request_timeout", &self.request_timeout)
            .field("max_rate_limit_retries", &self.max_rate_limit_retries)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
