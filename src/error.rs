//! Muninn error types

use std::time::Duration;

/// Muninn error types
#[derive(Debug, thiserror::Error)]
pub enum MuninnError {
    // Remote/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited{}", retry_hint(.retry_after))]
    RateLimited { retry_after: Option<Duration> },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    // Credential errors
    /// The credential provider could not supply a token (refresh impossible).
    #[error("credential unavailable: {0}")]
    Auth(String),

    /// The catalog rejected the supplied credential.
    #[error("authentication failed")]
    AuthenticationFailed,

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Configuration errors
    #[error("no search provider configured")]
    NoProvider,

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("provider does not support this operation")]
    Unsupported,

    // Control flow
    #[error("cancelled")]
    Cancelled,

    /// An engine invariant was violated. Never produced for per-item failures.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MuninnError {
    /// Whether the error is worth retrying with back-off.
    ///
    /// Covers connection failures, timeouts and 5xx/408 responses. Rate-limit
    /// signals are deliberately excluded: they are handled by the
    /// [`RateLimiter`](crate::RateLimiter) cool-down, not by blind retry.
    pub fn is_transient(&self) -> bool {
        match self {
            MuninnError::Http(_) | MuninnError::Timeout(_) => true,
            MuninnError::Api { status, .. } => *status >= 500 || *status == 408,
            _ => false,
        }
    }

    /// Whether the remote service signalled a rate violation.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, MuninnError::RateLimited { .. })
    }

    /// Server-provided retry hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            MuninnError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for MuninnError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            MuninnError::InvalidInput(format!("malformed catalog response: {err}"))
        } else {
            MuninnError::Http(err.to_string())
        }
    }
}

fn retry_hint(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(delay) => format!(", retry after {delay:?}"),
        None => String::new(),
    }
}

/// Result type alias for Muninn operations
pub type Result<T> = std::result::Result<T, MuninnError>;
