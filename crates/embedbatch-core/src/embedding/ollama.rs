use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use super::EmbeddingGenerator;
use crate::data::CoreError;

const PROVIDER: &str = "ollama";

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

/// Embeddings from a local Ollama server (`POST /api/embeddings`).
#[derive(Debug, Clone)]
pub struct OllamaEmbeddingGenerator {
    client: Client,
    endpoint: String,
    model: String,
    dimension: usize,
}

impl OllamaEmbeddingGenerator {
    pub fn new(
        base_url: &str,
        model: &str,
        dimension: usize,
        timeout_secs: u64,
    ) -> Result<Self, CoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CoreError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
            dimension,
        })
    }

    fn map_http_error(error: reqwest::Error) -> CoreError {
        let message = if error.is_timeout() {
            "Request timeout"
        } else if error.is_connect() {
            "Connection error"
        } else if error.is_decode() {
            "Malformed response"
        } else {
            "HTTP error"
        };
        CoreError::embedding_error_with_context(message, PROVIDER, Some(error))
    }
}

#[async_trait]
impl EmbeddingGenerator for OllamaEmbeddingGenerator {
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[instrument(skip(self, text), fields(model = %self.model, chars = text.len()))]
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, CoreError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&OllamaEmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(Self::map_http_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::EmbeddingError(format!(
                "{} returned status {}",
                PROVIDER, status
            )));
        }

        let body: OllamaEmbeddingResponse = response.json().await.map_err(Self::map_http_error)?;
        debug!(dimension = body.embedding.len(), "Received remote embedding");
        Ok(body.embedding)
    }
}
