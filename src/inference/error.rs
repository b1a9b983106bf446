//! Model client error types

use thiserror::Error;

/// Errors raised while talking to the model API.
#[derive(Error, Debug)]
pub enum ModelError {
    /// No API key configured
    #[error("API key is required for the model API")]
    MissingApiKey,

    /// Network/HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the API
    #[error("model API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Rate limited
    #[error("model API rate limited: {0}")]
    RateLimited(String),

    /// Response body did not have the expected shape
    #[error("failed to decode model response: {0}")]
    Decode(String),

    /// Error event inside an already-open stream
    #[error("model stream failed: {0}")]
    Stream(String),
}

impl ModelError {
    /// Create an API error
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }
}

pub type ModelResult<T> = Result<T, ModelError>;
