//! Error types for the MoMo domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.
//!
//! Shell command failures have no variant here. The executor reports them
//! as text that goes back to the model.

use thiserror::Error;

/// The top-level error type for all MoMo operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Model reply errors ---
    #[error("Reply error: {0}")]
    Reply(#[from] ReplyError),

    // --- Agent loop errors ---
    #[error("Tool-loop budget exceeded: more than {limit} commands requested in one turn")]
    ToolLoopBudgetExceeded { limit: u32 },

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Failed to encode memory file: {0}")]
    Encode(String),
}

/// The model answered with something that is not a valid reply payload.
#[derive(Debug, Clone, Error)]
pub enum ReplyError {
    #[error("Malformed reply payload: {reason}")]
    Malformed { reason: String, raw: String },

    #[error("Model returned an empty reply")]
    Empty,
}
