//! Custom error types for translation operations

use thiserror::Error;

/// Translation-related errors
#[derive(Error, Debug)]
pub enum TranslationError {
    /// API request failed with a non-retryable status
    #[error("API error: {status} - {message}")]
    ApiError {
        status: u16,
        message: String,
    },

    /// Rate limit exceeded
    #[error("Rate limit exceeded. Retry after {retry_after:?} seconds")]
    RateLimitError {
        retry_after: Option<u64>,
    },

    /// Request rejected by the provider's content filter
    #[error("Content policy violation: {message}")]
    ContentPolicyError {
        message: String,
    },

    /// Network error
    #[error("Network error: {message}")]
    NetworkError {
        message: String,
    },

    /// Invalid response from API
    #[error("Invalid response: {message}")]
    InvalidResponseError {
        message: String,
    },

    /// Request timeout
    #[error("Request timeout")]
    TimeoutError,

    /// File operation error
    #[error("File error: {path} - {message}")]
    FileError {
        path: String,
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
    },

    /// Invalid file format
    #[error("Invalid file format: {format}")]
    InvalidFormat {
        format: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Reqwest error
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Layered configuration error
    #[error("Config source error: {0}")]
    ConfigSourceError(#[from] config::ConfigError),
}

impl TranslationError {
    /// Whether the provider asked us to slow down
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, TranslationError::RateLimitError { .. })
    }

    /// Whether the provider refused the content itself
    pub fn is_content_policy(&self) -> bool {
        matches!(self, TranslationError::ContentPolicyError { .. })
    }

    pub(crate) fn file(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        TranslationError::FileError {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, TranslationError>;
