//! Error Types

use thiserror::Error;

/// Result type alias for reconciliation operations
pub type Result<T> = std::result::Result<T, ReconError>;

/// Reconciliation error types
#[derive(Error, Debug)]
pub enum ReconError {
    /// Status lookup failed (network, timeout, transport)
    #[error("Status lookup error: {0}")]
    Lookup(String),

    /// The status API returned an error envelope
    #[error("Status API error: {0}")]
    Api(String),

    /// Manual recheck attempted without a transaction reference
    #[error("Transaction reference not found")]
    MissingTransactionRef,

    /// User session missing or expired
    #[error("Session error: {0}")]
    Session(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl ReconError {
    /// Check if error is retryable under the polling policy
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReconError::Lookup(_) | ReconError::Api(_))
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> &str {
        match self {
            ReconError::Lookup(_) | ReconError::Api(_) => {
                "Failed to check payment status. Please try again later."
            }
            ReconError::MissingTransactionRef => "Transaction reference not found",
            ReconError::Session(_) => "User session not found. Please login again.",
            ReconError::Config(_) => "Service configuration error.",
            _ => "An error occurred processing your request.",
        }
    }
}
