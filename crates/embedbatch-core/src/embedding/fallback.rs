use async_trait::async_trait;
use embedbatch_monitoring::JobMetrics;
use std::sync::Arc;
use tracing::warn;

use super::{EmbeddingGenerator, MockEmbeddingGenerator};
use crate::data::CoreError;

/// Wraps a remote generator and degrades to the local mock whenever the remote
/// side fails or returns a vector of the wrong dimension.
pub struct FallbackEmbeddingGenerator {
    remote: Arc<dyn EmbeddingGenerator>,
    fallback: MockEmbeddingGenerator,
    provider: String,
}

impl FallbackEmbeddingGenerator {
    pub fn new(
        remote: Arc<dyn EmbeddingGenerator>,
        fallback: MockEmbeddingGenerator,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            remote,
            fallback,
            provider: provider.into(),
        }
    }

    fn degrade(&self, text: &str, reason: &str) -> Vec<f32> {
        warn!(provider = %self.provider, reason, "Remote embedding unavailable, using mock embedding");
        JobMetrics::record_embedding_fallback(&self.provider);
        self.fallback.embed(text)
    }
}

#[async_trait]
impl EmbeddingGenerator for FallbackEmbeddingGenerator {
    fn dimension(&self) -> usize {
        self.fallback.dimension()
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, CoreError> {
        match self.remote.generate_embedding(text).await {
            Ok(embedding) if embedding.len() == self.dimension() => Ok(embedding),
            Ok(embedding) => {
                let reason = format!(
                    "dimension mismatch: expected {}, got {}",
                    self.dimension(),
                    embedding.len()
                );
                Ok(self.degrade(text, &reason))
            }
            Err(err) => Ok(self.degrade(text, &err.to_string())),
        }
    }
}
