//! Caller-supplied queries and their deduplication keys.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::candidate::{ContentKind, ExternalId};
use crate::disambiguate::DisambiguationHints;

/// One caller-supplied request unit.
///
/// ```rust
/// # use muninn::{ContentKind, Query};
/// let q = Query::new("Dune").kind(ContentKind::Movie).year(2021);
/// assert_eq!(q.key(), Query::new("  DUNE ").kind(ContentKind::Movie).year(2021).key());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Query {
    /// Free-text title.
    pub text: String,
    /// Optional content-kind filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ContentKind>,
    /// Optional release-year hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    /// Optional explicit identifier; bypasses text search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_id: Option<ExternalId>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: None,
            year: None,
            explicit_id: None,
        }
    }

    /// Restrict the search to one content kind.
    pub fn kind(mut self, kind: ContentKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Set the release-year hint.
    pub fn year(mut self, year: u16) -> Self {
        self.year = Some(year);
        self
    }

    /// Set an explicit identifier.
    pub fn explicit_id(mut self, id: ExternalId) -> Self {
        self.explicit_id = Some(id);
        self
    }

    /// Deduplication key for this query.
    pub fn key(&self) -> QueryKey {
        match &self.explicit_id {
            Some(id) => QueryKey::Lookup {
                id: id.clone(),
                kind: self.kind,
            },
            None => QueryKey::search(&self.text, self.kind, self.year),
        }
    }
}

/// Normalized identity of a query.
///
/// Two queries with equal keys are resolved once and share the outcome.
/// The same key addresses the [`ResultCache`](crate::cache::ResultCache).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryKey {
    /// Text search: case-folded, trimmed text plus kind and year.
    Search {
        text: String,
        kind: Option<ContentKind>,
        year: Option<u16>,
    },
    /// Direct lookup by explicit identifier.
    Lookup {
        id: ExternalId,
        kind: Option<ContentKind>,
    },
}

impl QueryKey {
    /// Build a search key, normalizing `text`.
    pub fn search(text: &str, kind: Option<ContentKind>, year: Option<u16>) -> Self {
        QueryKey::Search {
            text: normalize_text(text),
            kind,
            year,
        }
    }

    /// Hints the disambiguator applies to this key's candidates.
    pub fn hints(&self) -> DisambiguationHints {
        match self {
            QueryKey::Search { text, year, .. } => DisambiguationHints {
                text: text.clone(),
                year: *year,
                explicit_id: None,
            },
            QueryKey::Lookup { id, .. } => DisambiguationHints {
                text: String::new(),
                year: None,
                explicit_id: Some(id.clone()),
            },
        }
    }

    /// Remote operation this key resolves through: "search" or "lookup".
    pub fn operation(&self) -> &'static str {
        match self {
            QueryKey::Search { .. } => "search",
            QueryKey::Lookup { .. } => "lookup",
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::Search { text, kind, year } => {
                write!(f, "\"{text}\"")?;
                if let Some(kind) = kind {
                    write!(f, " [{kind}]")?;
                }
                if let Some(year) = year {
                    write!(f, " ({year})")?;
                }
                Ok(())
            }
            QueryKey::Lookup { id, kind } => {
                write!(f, "{id}")?;
                if let Some(kind) = kind {
                    write!(f, " [{kind}]")?;
                }
                Ok(())
            }
        }
    }
}

/// Case-fold and trim query text.
pub fn normalize_text(text: &str) -> String {
    text.trim().to_lowercase()
}
