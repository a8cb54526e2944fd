//! Public types for the Muninn API.

mod candidate;
mod outcome;
mod query;

pub use candidate::{Candidate, CandidateIds, ContentKind, ExternalId};
pub use outcome::{BatchResult, FailureReason, ResolutionOutcome};
pub use query::{Query, QueryKey, normalize_text};
