//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
///
/// Provider and cache failures never escape as `Err` from the public fetch
/// path; they are rendered into `DataResponse::error`. The variants still
/// matter internally because each layer decides how to recover by kind.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Invalid request: {0}")]
    RequestInvalid(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Cache IO error: {0}")]
    CacheIo(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a source unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }

    /// Create an invalid request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::RequestInvalid(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a transport failure error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::TransportFailure(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a cache IO error
    pub fn cache_io(msg: impl Into<String>) -> Self {
        Self::CacheIo(msg.into())
    }

    /// Whether a retry loop should try again after this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransportFailure(_) | Self::RateLimited(_))
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;
