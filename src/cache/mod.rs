//! Caching subsystem.
//!
//! - [`ResultCache`]: bounded LRU + TTL store of raw candidate sets, keyed
//!   on the normalized [`QueryKey`](crate::QueryKey). Owned by one
//!   [`BulkResolver`](crate::BulkResolver) instance; there is no process-wide
//!   cache.

pub mod result;

pub use result::{CacheConfig, CacheMetrics, ResultCache};
