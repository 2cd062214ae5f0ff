//! Error types for the Embedbatch server

use embedbatch_core::CoreError;
use embedbatch_jobs::JobsError;
use thiserror::Error;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Error raised while assembling or driving the job pipeline
    #[error("Job pipeline error: {0}")]
    Jobs(#[from] JobsError),

    /// Embedding pipeline error
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// Socket or filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Rate limit exceeded
    #[error("Rate limit exceeded for {identifier}: {per_second} requests per second, burst {burst}")]
    RateLimitExceeded {
        /// Client the bucket belongs to
        identifier: String,
        /// Refill rate of the bucket
        per_second: u32,
        /// Bucket capacity
        burst: u32,
    },

    /// Internal server error
    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::InternalError(format!("Error: {}", err))
    }
}

impl ServerError {
    /// Check if the error is a rate limit error
    pub fn is_rate_limit_error(&self) -> bool {
        matches!(self, ServerError::RateLimitExceeded { .. })
    }
}
