//! Vector generation backends.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{EmbeddingConfig, EmbeddingProvider};
use crate::data::CoreError;

mod fallback;
mod mock;
mod ollama;
#[cfg(feature = "openai")]
mod openai;

pub use fallback::FallbackEmbeddingGenerator;
pub use mock::MockEmbeddingGenerator;
pub use ollama::OllamaEmbeddingGenerator;
#[cfg(feature = "openai")]
pub use openai::OpenAiEmbeddingGenerator;

/// Turns a piece of text into a fixed-dimension vector.
///
/// Implementations must be deterministic for identical text.
#[async_trait]
pub trait EmbeddingGenerator: Send + Sync {
    /// Length of every vector this generator returns
    fn dimension(&self) -> usize;

    /// Returns the raw, unnormalized vector for `text`
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, CoreError>;
}

/// Scales `vector` to unit Euclidean length. A zero vector is left unchanged.
pub fn normalize_l2(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// Creates the generator selected by configuration.
///
/// Remote providers are wrapped so that any remote failure degrades to the local mock.
pub fn create_embedding_generator(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingGenerator>, CoreError> {
    let mock = MockEmbeddingGenerator::new(config.dimension)?;

    match config.provider {
        EmbeddingProvider::Mock => {
            info!(dimension = config.dimension, "Using mock embedding generator");
            Ok(Arc::new(mock))
        }
        EmbeddingProvider::Ollama => {
            info!(url = %config.ollama_url, model = %config.ollama_model, "Using Ollama embedding generator");
            let remote = OllamaEmbeddingGenerator::new(
                &config.ollama_url,
                &config.ollama_model,
                config.dimension,
                config.remote_timeout_secs,
            )?;
            Ok(Arc::new(FallbackEmbeddingGenerator::new(Arc::new(remote), mock, "ollama")))
        }
        EmbeddingProvider::OpenAi => create_openai(config, mock),
    }
}

#[cfg(feature = "openai")]
fn create_openai(
    config: &EmbeddingConfig,
    mock: MockEmbeddingGenerator,
) -> Result<Arc<dyn EmbeddingGenerator>, CoreError> {
    match &config.openai_api_key {
        Some(api_key) => {
            info!(model = %config.openai_model, "Using OpenAI embedding generator");
            let remote = OpenAiEmbeddingGenerator::new(
                api_key.clone(),
                config.openai_model.clone(),
                config.dimension,
            );
            Ok(Arc::new(FallbackEmbeddingGenerator::new(Arc::new(remote), mock, "openai")))
        }
        None => {
            warn!("OPENAI_API_KEY is not set, falling back to mock embeddings");
            Ok(Arc::new(mock))
        }
    }
}

#[cfg(not(feature = "openai"))]
fn create_openai(
    _config: &EmbeddingConfig,
    mock: MockEmbeddingGenerator,
) -> Result<Arc<dyn EmbeddingGenerator>, CoreError> {
    warn!("Built without the openai feature, falling back to mock embeddings");
    Ok(Arc::new(mock))
}
