//! Traits for the engine's external collaborators.
//!
//! - [`SearchProvider`]: the remote catalog. Text search and direct id
//!   lookup. An unknown title is an empty `Vec`, not an error.
//! - [`CredentialProvider`]: supplies a bearer credential on demand. The
//!   engine asks once per remote attempt and never caches the result.
//!
//! # Error contract for search providers
//!
//! - `RateLimited { retry_after }`: the remote reported a rate violation.
//!   The engine cools the [`RateLimiter`](crate::RateLimiter) down and
//!   retries the item.
//! - `Http` / `Api` / `Timeout`: network failure, surfaced as a per-item
//!   failure (optionally retried first by
//!   [`RetryingSearchProvider`](super::RetryingSearchProvider)).
//! - `Auth` / `AuthenticationFailed`: credential problem, never retried.

use async_trait::async_trait;

use crate::Result;
use crate::types::{Candidate, ContentKind, ExternalId};

/// Remote catalog search.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Provider name for logging/metrics.
    fn name(&self) -> &str;

    /// Search by free text, optionally filtered by kind and year.
    ///
    /// Candidates are returned in the remote's ranking order.
    async fn search(
        &self,
        text: &str,
        kind: Option<ContentKind>,
        year: Option<u16>,
    ) -> Result<Vec<Candidate>>;

    /// Look up items by explicit identifier.
    ///
    /// Default implementation reports the operation as unsupported.
    async fn lookup(&self, id: &ExternalId, kind: Option<ContentKind>) -> Result<Vec<Candidate>> {
        let _ = (id, kind);
        Err(crate::MuninnError::Unsupported)
    }
}

/// Source of bearer credentials.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Return a currently valid bearer token.
    ///
    /// Fails with [`MuninnError::Auth`](crate::MuninnError::Auth) when no
    /// token can be obtained (e.g. refresh is impossible).
    async fn token(&self) -> Result<String>;
}

/// Credential provider returning a fixed token.
#[derive(Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticToken")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn token(&self) -> Result<String> {
        if self.token.is_empty() {
            return Err(crate::MuninnError::Auth("empty access token".into()));
        }
        Ok(self.token.clone())
    }
}
