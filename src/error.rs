//! Error types for Lexa.

use std::fmt;
use thiserror::Error;

/// The external vendor a call was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Palm,
}

impl Provider {
    /// Build the typed error this provider surfaces once retries are exhausted.
    pub fn error(self, message: impl Into<String>) -> ApiError {
        match self {
            Provider::OpenAI => ApiError::OpenAI(message.into()),
            Provider::Palm => ApiError::Palm(message.into()),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenAI => write!(f, "OpenAI"),
            Provider::Palm => write!(f, "PaLM"),
        }
    }
}

/// Library-level error type for Lexa operations.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("PaLM API error: {0}")]
    Palm(String),

    #[error("OpenAI client error: {0}")]
    Client(#[from] async_openai::error::OpenAIError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Empty response: {0}")]
    EmptyResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ApiError {
    /// Whether a provider call failing with this error is worth another attempt.
    ///
    /// Anything that came back from the network is retried; only local
    /// misconfiguration and bad caller input are not.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ApiError::Config(_) | ApiError::InvalidInput(_))
    }

    /// Re-raise a final call failure as the provider's typed error.
    ///
    /// Typed errors and local errors pass through unchanged.
    pub fn into_provider(self, provider: Provider) -> ApiError {
        match self {
            ApiError::OpenAI(_)
            | ApiError::Palm(_)
            | ApiError::Config(_)
            | ApiError::InvalidInput(_) => self,
            ApiError::Client(e) => provider.error(e.to_string()),
            other => provider.error(other.to_string()),
        }
    }
}

/// Result type alias for Lexa operations.
pub type Result<T> = std::result::Result<T, ApiError>;
