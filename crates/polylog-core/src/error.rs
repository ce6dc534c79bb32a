//! Engine error types.
//!
//! Every fallible engine operation returns one of four kinds so callers can
//! decide between isolating a failure (a single batch item) and propagating
//! it (content lookup, progress upsert) without string matching.

use thiserror::Error;

/// Errors surfaced by the evaluation and analytics engine.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// A payload did not match any known schema.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A store read or write failed.
    #[error("persistence failed: {0}")]
    Persistence(String),

    /// The request to an external evaluator failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// No content exists for the requested id tuple.
    #[error("not found: {0}")]
    NotFound(String),
}

impl EngineError {
    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation",
            EngineError::Persistence(_) => "persistence",
            EngineError::Transport(_) => "transport",
            EngineError::NotFound(_) => "not_found",
        }
    }
}

/// Errors that can occur while talking to an external evaluator.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),

    /// The evaluator returned an error response.
    #[error("evaluator error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The evaluator returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// The evaluator rejected our credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),
}

impl TransportError {
    /// Returns `true` if the transport gave up waiting for a response.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }

    /// Returns the retry-after delay in milliseconds, if the evaluator sent one.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            TransportError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}
