//! Error types for the outreach domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

/// Failures of the knowledge index, the embedder, or the retriever.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RetrievalError {
    #[error("Knowledge index is empty")]
    EmptyIndex,

    #[error("Knowledge index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Embedding dimension mismatch: index has {expected}, query has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid knowledge entry: {0}")]
    InvalidEntry(String),
}

/// Failures of a single generation tier.
///
/// Every variant is recoverable by the orchestrator: it advances to the
/// next tier instead of propagating.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error("Backend not configured: {0}")]
    NotConfigured(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limited by backend, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid backend output: {0}")]
    InvalidOutput(String),

    #[error("Backend returned empty output")]
    EmptyOutput,

    #[error("Context retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),
}

/// Failures talking to the messaging account.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AccountError {
    #[error("Account not configured: {0}")]
    NotConfigured(String),

    #[error("Access forbidden: {0}")]
    Forbidden(String),

    #[error("Chat not found: {0}")]
    NotFound(i64),

    #[error("Account unavailable: {0}")]
    Unavailable(String),

    #[error("Message delivery to {user_id} failed: {reason}")]
    DeliveryFailed { user_id: i64, reason: String },
}
