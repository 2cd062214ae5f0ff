use async_openai::{
    config::OpenAIConfig,
    types::{CreateEmbeddingRequestArgs, EmbeddingInput},
    Client,
};
use async_trait::async_trait;

use super::EmbeddingGenerator;
use crate::data::CoreError;

const PROVIDER: &str = "openai";

/// Embeddings from the OpenAI embeddings API.
pub struct OpenAiEmbeddingGenerator {
    client: Client<OpenAIConfig>,
    model: String,
    dimension: usize,
}

impl OpenAiEmbeddingGenerator {
    pub fn new(api_key: String, model: String, dimension: usize) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        let client = Client::with_config(config);
        Self {
            client,
            model,
            dimension,
        }
    }
}

#[async_trait]
impl EmbeddingGenerator for OpenAiEmbeddingGenerator {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, CoreError> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::String(text.to_string()))
            .build()
            .map_err(|e| CoreError::embedding_error_with_context("Invalid request", PROVIDER, Some(e)))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| CoreError::embedding_error_with_context("Remote call failed", PROVIDER, Some(e)))?;

        response
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| CoreError::EmbeddingError("openai returned no embedding".to_string()))
    }
}
