//! Bounded-concurrency execution of independent operations.
//!
//! [`ParallelResolver::run`] splits its items into batches of `batch_size`,
//! and each batch into chunks of `concurrency`. All operations of a chunk
//! run concurrently and the chunk completes only when every one of them has
//! settled. Between batches the resolver sleeps for `inter_batch_delay`.
//!
//! ```text
//!  items:  [a b c d e f g h i j]        batch_size = 6, concurrency = 3
//!  batch 1: [a b c][d e f]  ── inter_batch_delay ──  batch 2: [g h i][j]
//!            chunk  chunk                                      chunk chunk
//! ```
//!
//! At most `concurrency` operations are outstanding at any moment; the
//! [`RateLimiter`](crate::RateLimiter) called inside each operation may
//! throttle further. Every item's result is recorded independently, so a
//! failing item never cancels or skips a sibling.
//!
//! Result order follows completion bookkeeping, not a documented contract;
//! treat `succeeded`/`failed` as sets.

use std::future::Future;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::debug;

use crate::cancel::CancelSignal;
use crate::{MuninnError, Result};

/// Configuration for the [`ParallelResolver`].
///
/// ```rust
/// # use muninn::ParallelConfig;
/// # use std::time::Duration;
/// let config = ParallelConfig::new()
///     .concurrency(8)
///     .batch_size(40)
///     .inter_batch_delay(Duration::from_millis(250));
/// ```
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Maximum operations in flight. Default: 10. Zero is treated as one.
    pub concurrency: usize,
    /// Items per batch. Default: 50. Zero is treated as one.
    pub batch_size: usize,
    /// Pause between batches. Default: none.
    pub inter_batch_delay: Duration,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            batch_size: 50,
            inter_batch_delay: Duration::ZERO,
        }
    }
}

impl ParallelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of operations in flight.
    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n;
        self
    }

    /// Set the number of items per batch.
    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }

    /// Set the pause between consecutive batches.
    pub fn inter_batch_delay(mut self, delay: Duration) -> Self {
        self.inter_batch_delay = delay;
        self
    }
}

/// Per-item results of a [`ParallelResolver::run`].
#[derive(Debug)]
pub struct ParallelReport<I, T> {
    pub succeeded: Vec<(I, T)>,
    pub failed: Vec<(I, MuninnError)>,
}

impl<I, T> ParallelReport<I, T> {
    fn with_capacity(n: usize) -> Self {
        Self {
            succeeded: Vec::with_capacity(n),
            failed: Vec::new(),
        }
    }

    /// Total items recorded.
    pub fn len(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Runs independent async operations in batches with bounded concurrency.
#[derive(Debug, Clone, Default)]
pub struct ParallelResolver {
    config: ParallelConfig,
}

impl ParallelResolver {
    pub fn new(config: ParallelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }

    /// Run `op` over every item.
    pub async fn run<I, T, F, Fut>(&self, items: Vec<I>, op: F) -> ParallelReport<I, T>
    where
        I: Clone,
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run_cancellable(items, op, &CancelSignal::never()).await
    }

    /// Run `op` over every item, stopping early when `cancel` fires.
    ///
    /// Operations in flight when cancellation arrives are dropped and, like
    /// every item not yet started, recorded as [`MuninnError::Cancelled`].
    /// Items that already settled keep their result.
    pub async fn run_cancellable<I, T, F, Fut>(
        &self,
        items: Vec<I>,
        op: F,
        cancel: &CancelSignal,
    ) -> ParallelReport<I, T>
    where
        I: Clone,
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let concurrency = self.config.concurrency.max(1);
        let batch_size = self.config.batch_size.max(1);
        let mut report = ParallelReport::with_capacity(items.len());
        let mut remaining = items.into_iter().peekable();
        let mut batch_index = 0usize;

        while remaining.peek().is_some() {
            if batch_index > 0 && !self.config.inter_batch_delay.is_zero() {
                debug!(
                    batch = batch_index,
                    delay_ms = self.config.inter_batch_delay.as_millis() as u64,
                    "pausing between batches"
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.config.inter_batch_delay) => {}
                }
            }

            let mut batch = remaining.by_ref().take(batch_size).peekable();
            while batch.peek().is_some() {
                let chunk: Vec<I> = batch.by_ref().take(concurrency).collect();
                let settled = join_all(chunk.into_iter().map(|item| {
                    let fut = op(item.clone());
                    async move {
                        let result = tokio::select! {
                            biased;
                            _ = cancel.cancelled() => Err(MuninnError::Cancelled),
                            result = fut => result,
                        };
                        (item, result)
                    }
                }))
                .await;

                for (item, result) in settled {
                    match result {
                        Ok(value) => report.succeeded.push((item, value)),
                        Err(err) => report.failed.push((item, err)),
                    }
                }
            }
            batch_index += 1;
        }

        debug!(
            batches = batch_index,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "parallel run finished"
        );
        report
    }
}
