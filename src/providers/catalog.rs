//! HTTP client for a Trakt-style media catalog.
//!
//! Endpoints used:
//! - `GET {base}/search/{types}?query=..&years=..`: text search
//! - `GET {base}/search/{id_type}/{id}?type=..`: explicit id lookup
//!
//! Every request carries `trakt-api-version: 2`, the client id as
//! `trakt-api-key`, and a bearer token fetched from the
//! [`CredentialProvider`] right before the call.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::traits::{CredentialProvider, SearchProvider};
use crate::types::{Candidate, CandidateIds, ContentKind, ExternalId};
use crate::{MuninnError, Result};

/// Default base URL for the catalog API.
pub const DEFAULT_BASE_URL: &str = "https://api.trakt.tv";

/// Kinds searched when a query carries no kind filter.
const DEFAULT_SEARCH_TYPES: &str = "movie,show";

const API_VERSION: &str = "2";

/// Client for the catalog search API.
#[derive(Clone)]
pub struct CatalogClient {
    client_id: String,
    credentials: Arc<dyn CredentialProvider>,
    http: Client,
    base_url: String,
}

impl CatalogClient {
    /// Create a client against the public catalog.
    pub fn new(
        client_id: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
        timeout: Duration,
    ) -> Result<Self> {
        Self::with_base_url(client_id, credentials, DEFAULT_BASE_URL, timeout)
    }

    /// Create a client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(
        client_id: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(crate::version::user_agent())
            .build()
            .map_err(|e| MuninnError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client_id: client_id.into(),
            credentials,
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, url: &str, params: &[(&str, String)]) -> Result<Vec<Candidate>> {
        let token = self.credentials.token().await?;

        let response = self
            .http
            .get(url)
            .query(params)
            .header("Authorization", format!("Bearer {token}"))
            .header("trakt-api-version", API_VERSION)
            .header("trakt-api-key", &self.client_id)
            .send()
            .await
            .map_err(|e| MuninnError::Http(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(url, "catalog returned 404, treating as empty result");
            return Ok(Vec::new());
        }
        handle_response_errors(&response)?;

        let hits: Vec<SearchHit> = response.json().await?;
        Ok(hits.into_iter().filter_map(SearchHit::into_candidate).collect())
    }
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Check response status and map to appropriate error.
fn handle_response_errors(response: &reqwest::Response) -> Result<()> {
    let status = response.status();

    if status.is_success() {
        return Ok(());
    }

    match status.as_u16() {
        401 | 403 => Err(MuninnError::AuthenticationFailed),
        429 => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            Err(MuninnError::RateLimited { retry_after })
        }
        code => Err(MuninnError::Api {
            status: code,
            message: format!("catalog API error: {status}"),
        }),
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Deserialize)]
struct SearchHit {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    movie: Option<WireItem>,
    #[serde(default)]
    show: Option<WireItem>,
    #[serde(default)]
    episode: Option<WireItem>,
}

#[derive(Deserialize)]
struct WireItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    year: Option<u16>,
    ids: WireIds,
}

#[derive(Deserialize)]
struct WireIds {
    trakt: u64,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    imdb: Option<String>,
    #[serde(default)]
    tmdb: Option<u64>,
    #[serde(default)]
    tvdb: Option<u64>,
}

impl SearchHit {
    /// Convert a hit into a candidate. Hits of unknown kinds (people,
    /// lists) are skipped.
    fn into_candidate(self) -> Option<Candidate> {
        let (kind, item) = match self.kind.as_str() {
            "movie" => (ContentKind::Movie, self.movie?),
            "show" => (ContentKind::Show, self.show?),
            "episode" => (ContentKind::Episode, self.episode?),
            _ => return None,
        };
        let ids = CandidateIds {
            catalog: item.ids.trakt,
            slug: item.ids.slug,
            imdb: item.ids.imdb,
            tmdb: item.ids.tmdb,
            tvdb: item.ids.tvdb,
        };
        Some(
            Candidate::new(kind, item.title.unwrap_or_default(), item.year, ids.catalog)
                .with_ids(ids),
        )
    }
}

// ============================================================================
// Provider Trait Implementation
// ============================================================================

#[async_trait]
impl SearchProvider for CatalogClient {
    fn name(&self) -> &str {
        "catalog"
    }

    async fn search(
        &self,
        text: &str,
        kind: Option<ContentKind>,
        year: Option<u16>,
    ) -> Result<Vec<Candidate>> {
        let types = kind.map_or(DEFAULT_SEARCH_TYPES, |k| k.as_str());
        let url = format!("{}/search/{}", self.base_url, types);

        let mut params = vec![("query", text.trim().to_string())];
        if let Some(year) = year {
            params.push(("years", year.to_string()));
        }

        self.get(&url, &params).await
    }

    async fn lookup(&self, id: &ExternalId, kind: Option<ContentKind>) -> Result<Vec<Candidate>> {
        let url = format!("{}/search/{}/{}", self.base_url, id.id_type(), id.value());

        let mut params = Vec::new();
        if let Some(kind) = kind {
            params.push(("type", kind.as_str().to_string()));
        }

        self.get(&url, &params).await
    }
}
