//! Remote catalog providers.
//!
//! The engine talks to the catalog only through [`SearchProvider`]; the
//! bundled implementation is [`CatalogClient`]. [`RetryingSearchProvider`]
//! adds retry with backoff for transient network errors.

pub mod catalog;
pub mod retry;
pub mod traits;

pub use catalog::CatalogClient;
pub use retry::{RetryConfig, RetryingSearchProvider};
pub use traits::{CredentialProvider, SearchProvider, StaticToken};
