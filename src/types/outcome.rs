//! Resolution outcomes and the aggregated batch result.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use super::candidate::Candidate;
use super::query::Query;
use crate::MuninnError;

/// Why a query could not be resolved.
///
/// `NoMatch` and `ExplicitIdNotFound` mean "nothing found"; `Cancelled` and
/// `Error` mean "lookup failed". Callers must not conflate the two.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "message", rename_all = "snake_case")]
pub enum FailureReason {
    /// The remote search returned no candidates.
    NoMatch,
    /// An explicit id was given but no candidate carries it.
    ExplicitIdNotFound,
    /// The batch was cancelled before this item completed.
    Cancelled,
    /// The remote call failed; carries the underlying error message.
    Error(String),
}

impl FailureReason {
    /// Whether the lookup succeeded but found nothing.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FailureReason::NoMatch | FailureReason::ExplicitIdNotFound
        )
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NoMatch => f.write_str("no match"),
            FailureReason::ExplicitIdNotFound => f.write_str("explicit id not found"),
            FailureReason::Cancelled => f.write_str("cancelled"),
            FailureReason::Error(message) => f.write_str(message),
        }
    }
}

impl From<&MuninnError> for FailureReason {
    fn from(err: &MuninnError) -> Self {
        match err {
            MuninnError::Cancelled => FailureReason::Cancelled,
            other => FailureReason::Error(other.to_string()),
        }
    }
}

/// Definitive outcome for one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    Resolved(Candidate),
    Ambiguous(Vec<Candidate>),
    Failed(FailureReason),
}

impl ResolutionOutcome {
    /// Label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ResolutionOutcome::Resolved(_) => "resolved",
            ResolutionOutcome::Ambiguous(_) => "ambiguous",
            ResolutionOutcome::Failed(_) => "failed",
        }
    }
}

/// Three-way partition of a batch's outcomes.
///
/// Every input query appears in exactly one of the maps. Queries that are
/// identical in every field share a single entry.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub resolved: HashMap<Query, Candidate>,
    pub ambiguous: HashMap<Query, Vec<Candidate>>,
    pub failed: HashMap<Query, FailureReason>,
}

impl BatchResult {
    /// Record the outcome for `query`.
    pub(crate) fn insert(&mut self, query: Query, outcome: ResolutionOutcome) {
        match outcome {
            ResolutionOutcome::Resolved(c) => {
                self.resolved.insert(query, c);
            }
            ResolutionOutcome::Ambiguous(cs) => {
                self.ambiguous.insert(query, cs);
            }
            ResolutionOutcome::Failed(reason) => {
                self.failed.insert(query, reason);
            }
        }
    }

    /// Look up the outcome recorded for `query`.
    pub fn outcome(&self, query: &Query) -> Option<ResolutionOutcome> {
        if let Some(c) = self.resolved.get(query) {
            return Some(ResolutionOutcome::Resolved(c.clone()));
        }
        if let Some(cs) = self.ambiguous.get(query) {
            return Some(ResolutionOutcome::Ambiguous(cs.clone()));
        }
        self.failed
            .get(query)
            .map(|r| ResolutionOutcome::Failed(r.clone()))
    }

    /// Total number of distinct queries with an outcome.
    pub fn len(&self) -> usize {
        self.resolved.len() + self.ambiguous.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
