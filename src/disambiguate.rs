//! Deterministic candidate selection.
//!
//! [`disambiguate`] turns one query's raw candidate set into exactly one
//! [`ResolutionOutcome`]. Rules, first match wins:
//!
//! 1. Explicit id given: the candidate carrying that id, else
//!    `Failed(ExplicitIdNotFound)`.
//! 2. No candidates: `Failed(NoMatch)`.
//! 3. Year given: filter to that year. One left → `Resolved`; several →
//!    `Ambiguous(filtered)`; none → continue with the unfiltered set.
//! 4. Exactly one candidate whose title equals the query text
//!    (case-insensitive) → `Resolved`.
//! 5. Otherwise `Ambiguous(all candidates)`.
//!
//! There is no "take the first result" fallback. Search ranking is not an
//! identity guarantee, and a wrong resolution silently corrupts whatever
//! consumes it; an ambiguous outcome is always preferable.

use crate::types::{Candidate, ExternalId, FailureReason, ResolutionOutcome, normalize_text};

/// Per-query inputs to [`disambiguate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisambiguationHints {
    /// Query text; compared case-insensitively after trimming.
    pub text: String,
    pub year: Option<u16>,
    pub explicit_id: Option<ExternalId>,
}

impl DisambiguationHints {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn year(mut self, year: u16) -> Self {
        self.year = Some(year);
        self
    }

    pub fn explicit_id(mut self, id: ExternalId) -> Self {
        self.explicit_id = Some(id);
        self
    }
}

/// Decide the outcome for one query. Pure; never guesses.
pub fn disambiguate(candidates: &[Candidate], hints: &DisambiguationHints) -> ResolutionOutcome {
    if let Some(id) = &hints.explicit_id {
        return candidates
            .iter()
            .find(|c| c.ids.matches(id))
            .cloned()
            .map(ResolutionOutcome::Resolved)
            .unwrap_or(ResolutionOutcome::Failed(FailureReason::ExplicitIdNotFound));
    }

    if candidates.is_empty() {
        return ResolutionOutcome::Failed(FailureReason::NoMatch);
    }

    if let Some(year) = hints.year {
        let same_year: Vec<&Candidate> =
            candidates.iter().filter(|c| c.year == Some(year)).collect();
        match same_year.as_slice() {
            [] => {}
            [only] => return ResolutionOutcome::Resolved((*only).clone()),
            several => {
                return ResolutionOutcome::Ambiguous(several.iter().map(|c| (*c).clone()).collect());
            }
        }
    }

    let wanted = normalize_text(&hints.text);
    let mut exact = candidates
        .iter()
        .filter(|c| normalize_text(&c.title) == wanted);
    if let (Some(only), None) = (exact.next(), exact.next()) {
        return ResolutionOutcome::Resolved(only.clone());
    }

    ResolutionOutcome::Ambiguous(candidates.to_vec())
}
