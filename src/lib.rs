//! Muninn - Rate-limited bulk resolution of titles to catalog identifiers
//!
//! This crate takes a batch of free-text queries ("Dune", "Dune (2021)",
//! "The Office") and maps each one to exactly one outcome: a resolved
//! catalog item, an ambiguous candidate set, or a failure with a reason.
//! Remote calls are deduplicated, cached, bounded in concurrency and gated
//! by a sliding-window rate limiter.
//!
//! # Example
//!
//! ```rust,no_run
//! use muninn::{ContentKind, Muninn, Query, ResolutionOutcome};
//!
//! #[tokio::main]
//! async fn main() -> muninn::Result<()> {
//!     let resolver = Muninn::builder()
//!         .catalog("your-client-id")
//!         .access_token("your-access-token")
//!         .build()?;
//!
//!     let queries = vec![
//!         Query::new("Dune").year(2021),
//!         Query::new("The Office").kind(ContentKind::Show),
//!     ];
//!     let result = resolver.resolve_batch(&queries).await?;
//!
//!     for query in &queries {
//!         match result.outcome(query) {
//!             Some(ResolutionOutcome::Resolved(c)) => println!("{} -> {}", query.text, c.catalog_id()),
//!             Some(ResolutionOutcome::Ambiguous(cs)) => println!("{}: {} candidates", query.text, cs.len()),
//!             Some(ResolutionOutcome::Failed(reason)) => println!("{}: {reason}", query.text),
//!             None => unreachable!("every query has an outcome"),
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Custom search providers
//!
//! Anything implementing [`SearchProvider`] can stand in for the HTTP
//! catalog, which is how the test suite drives the engine:
//!
//! ```rust,ignore
//! let resolver = Muninn::builder()
//!     .search_provider(Arc::new(MyProvider::new()))
//!     .build()?;
//! ```

pub mod cache;
pub mod cancel;
pub mod config;
pub mod disambiguate;
pub mod engine;
pub mod error;
pub mod events;
pub mod limiter;
pub mod parallel;
pub mod providers;
pub mod telemetry;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use cache::{CacheConfig, CacheMetrics, ResultCache};
pub use cancel::{CancelHandle, CancelSignal, cancellation};
pub use disambiguate::{DisambiguationHints, disambiguate};
pub use engine::{BulkResolver, Muninn, MuninnBuilder};
pub use error::{MuninnError, Result};
pub use events::{EventSink, NoopEventSink, ResolutionEvent, TracingEventSink, WaitReason};
pub use limiter::{MAX_RETRY_AFTER, RateLimitConfig, RateLimiter};
pub use parallel::{ParallelConfig, ParallelReport, ParallelResolver};
pub use providers::{
    CatalogClient, CredentialProvider, RetryConfig, RetryingSearchProvider, SearchProvider,
    StaticToken,
};
pub use version::{PKG_VERSION, version_string};

// Re-export all types
pub use types::{
    BatchResult, Candidate, CandidateIds, ContentKind, ExternalId, FailureReason, Query, QueryKey,
    ResolutionOutcome,
};
