//! Error types for the job pipeline.

use embedbatch_core::CoreError;
use thiserror::Error;

/// Failure to obtain the bytes of a job file.
#[derive(Error, Debug)]
pub enum AcquireError {
    #[error("File not found and not a downloadable URL: {0}")]
    NotFound(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to download {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to download {url}: status {status}")]
    HttpStatus { url: String, status: u16 },
}

/// Failure of a single callback delivery attempt.
#[derive(Error, Debug)]
pub enum CallbackError {
    #[error("Job has no callback URL")]
    NoCallbackUrl,

    #[error("Callback request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Callback endpoint returned status {0}")]
    HttpStatus(u16),
}

/// Errors surfaced by the job pool and its collaborators.
#[derive(Error, Debug)]
pub enum JobsError {
    #[error("Worker pool is shut down")]
    PoolClosed,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}
