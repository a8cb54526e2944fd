//! Catalog candidates and their identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::MuninnError;

/// Kind of catalog item a query or candidate refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Movie,
    Show,
    Episode,
}

impl ContentKind {
    /// Wire name used by the catalog API.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Movie => "movie",
            ContentKind::Show => "show",
            ContentKind::Episode => "episode",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = MuninnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" | "movies" | "film" => Ok(ContentKind::Movie),
            "show" | "shows" | "tv" | "series" => Ok(ContentKind::Show),
            "episode" | "episodes" => Ok(ContentKind::Episode),
            other => Err(MuninnError::InvalidInput(format!(
                "unknown content kind: {other}"
            ))),
        }
    }
}

/// An explicit identifier supplied by the caller.
///
/// `Catalog` is the canonical catalog id; the others are cross-references
/// the catalog also indexes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum ExternalId {
    Catalog(u64),
    Slug(String),
    Imdb(String),
    Tmdb(u64),
    Tvdb(u64),
}

impl ExternalId {
    /// Id-type path segment used by the catalog lookup endpoint.
    pub fn id_type(&self) -> &'static str {
        match self {
            ExternalId::Catalog(_) => "trakt",
            ExternalId::Slug(_) => "slug",
            ExternalId::Imdb(_) => "imdb",
            ExternalId::Tmdb(_) => "tmdb",
            ExternalId::Tvdb(_) => "tvdb",
        }
    }

    /// The id value as it appears in a lookup URL.
    pub fn value(&self) -> String {
        match self {
            ExternalId::Catalog(id) | ExternalId::Tmdb(id) | ExternalId::Tvdb(id) => id.to_string(),
            ExternalId::Slug(s) | ExternalId::Imdb(s) => s.clone(),
        }
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id_type(), self.value())
    }
}

/// Cross-reference identifiers of a candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateIds {
    /// Canonical catalog id.
    pub catalog: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvdb: Option<u64>,
}

impl CandidateIds {
    /// Ids with only the canonical catalog id set.
    pub fn catalog(id: u64) -> Self {
        Self {
            catalog: id,
            ..Self::default()
        }
    }

    /// Whether these ids contain `id` under the matching id type.
    pub fn matches(&self, id: &ExternalId) -> bool {
        match id {
            ExternalId::Catalog(v) => self.catalog == *v,
            ExternalId::Slug(v) => self.slug.as_deref() == Some(v.as_str()),
            ExternalId::Imdb(v) => self
                .imdb
                .as_deref()
                .is_some_and(|imdb| imdb.eq_ignore_ascii_case(v)),
            ExternalId::Tmdb(v) => self.tmdb == Some(*v),
            ExternalId::Tvdb(v) => self.tvdb == Some(*v),
        }
    }
}

/// One raw match returned by the remote search.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    pub kind: ContentKind,
    pub title: String,
    pub year: Option<u16>,
    pub ids: CandidateIds,
}

impl Candidate {
    /// Create a candidate with only the canonical id set.
    pub fn new(kind: ContentKind, title: impl Into<String>, year: Option<u16>, id: u64) -> Self {
        Self {
            kind,
            title: title.into(),
            year,
            ids: CandidateIds::catalog(id),
        }
    }

    /// Replace the cross-reference ids.
    pub fn with_ids(mut self, ids: CandidateIds) -> Self {
        self.ids = ids;
        self
    }

    /// Canonical catalog id.
    pub fn catalog_id(&self) -> u64 {
        self.ids.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_kind_parses_aliases() {
        assert_eq!("Movie".parse::<ContentKind>().unwrap(), ContentKind::Movie);
        assert_eq!(" tv ".parse::<ContentKind>().unwrap(), ContentKind::Show);
        assert!("podcast".parse::<ContentKind>().is_err());
    }

    #[test]
    fn ids_match_by_type() {
        let ids = CandidateIds {
            catalog: 7,
            slug: Some("dune-2021".into()),
            imdb: Some("tt1160419".into()),
            tmdb: Some(438631),
            tvdb: None,
        };
        assert!(ids.matches(&ExternalId::Catalog(7)));
        assert!(ids.matches(&ExternalId::Imdb("TT1160419".into())));
        assert!(ids.matches(&ExternalId::Tmdb(438631)));
        assert!(!ids.matches(&ExternalId::Tmdb(7)));
        assert!(!ids.matches(&ExternalId::Tvdb(438631)));
    }

    #[test]
    fn external_id_display() {
        assert_eq!(ExternalId::Imdb("tt0087182".into()).to_string(), "imdb:tt0087182");
        assert_eq!(ExternalId::Catalog(12).to_string(), "trakt:12");
    }
}
