//! Bragi error types

use std::time::Duration;

/// Bragi error types
#[derive(Debug, thiserror::Error)]
pub enum BragiError {
    // Request errors
    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Backend/network errors
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("translation service unavailable: {0}")]
    Unavailable(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("empty response from model")]
    EmptyResponse,

    // Cache store errors (only surfaced by the admin surface)
    #[error("cache store error: {0}")]
    Store(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl BragiError {
    /// Whether this error came from the translation backend.
    ///
    /// Backend failures abort a translation request; store failures never do.
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            BragiError::AuthenticationFailed(_)
                | BragiError::RateLimited { .. }
                | BragiError::Unavailable(_)
                | BragiError::Api { .. }
                | BragiError::EmptyResponse
        )
    }

    /// Whether retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            BragiError::RateLimited { .. } | BragiError::Unavailable(_) => true,
            BragiError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result type alias for Bragi operations
pub type Result<T> = std::result::Result<T, BragiError>;
