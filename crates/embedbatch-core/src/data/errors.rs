//! Error types for Embedbatch core operations

use thiserror::Error;

use crate::data::job::JobStatus;

/// Base Error type for core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Embedding generation error: {0}")]
    EmbeddingError(String),

    #[error("Embedding error with context: {message}")]
    EmbeddingErrorWithContext {
        message: String,
        provider: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Invalid job transition for {job_id}: {from} -> {to} ({reason})")]
    InvalidTransition {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
        reason: String,
    },

    #[error("Serialization/Deserialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Internal system error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Helper to create an embedding error that keeps the backend error as its source
    pub fn embedding_error_with_context<E>(
        message: impl Into<String>,
        provider: impl Into<String>,
        source: Option<E>,
    ) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CoreError::EmbeddingErrorWithContext {
            message: message.into(),
            provider: provider.into(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Helper to create an invalid transition error
    pub fn invalid_transition(
        job_id: impl ToString,
        from: JobStatus,
        to: JobStatus,
        reason: impl Into<String>,
    ) -> Self {
        CoreError::InvalidTransition {
            job_id: job_id.to_string(),
            from,
            to,
            reason: reason.into(),
        }
    }

    /// Whether the error originates from an embedding backend
    pub fn is_embedding_error(&self) -> bool {
        matches!(
            self,
            CoreError::EmbeddingError(_) | CoreError::EmbeddingErrorWithContext { .. }
        )
    }
}
