//! Telemetry metric name constants.
//!
//! Centralised metric names for muninn operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `muninn_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `provider`: search provider name (e.g. "catalog")
//! - `operation`: remote call kind: "search" or "lookup"
//! - `status`: outcome: "ok" or "error"
//! - `reason`: why admission waited: "quota" or "cooldown"
//! - `outcome`: resolution outcome: "resolved", "ambiguous" or "failed"

/// Total result-cache hits.
pub const CACHE_HITS_TOTAL: &str = "muninn_cache_hits_total";

/// Total result-cache misses (including expired entries).
pub const CACHE_MISSES_TOTAL: &str = "muninn_cache_misses_total";

/// Total entries evicted under capacity pressure.
pub const CACHE_EVICTIONS_TOTAL: &str = "muninn_cache_evictions_total";

/// Total remote search/lookup calls issued.
///
/// Labels: `provider`, `operation`, `status` ("ok" | "error").
pub const REMOTE_REQUESTS_TOTAL: &str = "muninn_remote_requests_total";

/// Remote call duration in seconds.
///
/// Labels: `provider`, `operation`.
pub const REMOTE_REQUEST_DURATION_SECONDS: &str = "muninn_remote_request_duration_seconds";

/// Total times admission had to wait.
///
/// Labels: `reason` ("quota" | "cooldown").
pub const RATE_WAITS_TOTAL: &str = "muninn_rate_waits_total";

/// Total rate-violation signals received from the remote service.
pub const RATE_LIMIT_SIGNALS_TOTAL: &str = "muninn_rate_limit_signals_total";

/// Total retry attempts for transient errors (not counting the initial call).
///
/// Labels: `provider`, `operation`.
pub const RETRIES_TOTAL: &str = "muninn_retries_total";

/// Total per-key resolution outcomes.
///
/// Labels: `outcome` ("resolved" | "ambiguous" | "failed").
pub const OUTCOMES_TOTAL: &str = "muninn_outcomes_total";
