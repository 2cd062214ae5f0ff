//! Chunk-then-embed over a batch of inputs.

use std::sync::Arc;
use tracing::{debug, instrument};

use crate::chunking::{chunk_text, truncate_snippet};
use crate::config::EmbeddingConfig;
use crate::data::{Chunk, CoreError, EmbedOutput, EmbedRequest, EmbedResponse, EmbedResult, TruncateStrategy};
use crate::embedding::{normalize_l2, EmbeddingGenerator};

/// Chunk size limits applied to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSettings {
    pub default_chunk_size: usize,
    pub max_chunk_size: usize,
}

impl Default for ChunkSettings {
    fn default() -> Self {
        Self {
            default_chunk_size: 1000,
            max_chunk_size: 8000,
        }
    }
}

impl From<&EmbeddingConfig> for ChunkSettings {
    fn from(config: &EmbeddingConfig) -> Self {
        Self {
            default_chunk_size: config.default_chunk_size,
            max_chunk_size: config.max_chunk_size,
        }
    }
}

/// Turns an `EmbedRequest` into an `EmbedResponse`, one result per input, in order.
#[derive(Clone)]
pub struct EmbeddingPipeline {
    generator: Arc<dyn EmbeddingGenerator>,
    settings: ChunkSettings,
}

impl EmbeddingPipeline {
    pub fn new(generator: Arc<dyn EmbeddingGenerator>, settings: ChunkSettings) -> Self {
        Self { generator, settings }
    }

    pub fn settings(&self) -> ChunkSettings {
        self.settings
    }

    pub fn dimension(&self) -> usize {
        self.generator.dimension()
    }

    /// Missing or zero sizes use the default. Larger sizes are clamped to the maximum.
    pub fn effective_chunk_size(&self, requested: Option<usize>) -> usize {
        match requested {
            None | Some(0) => self.settings.default_chunk_size,
            Some(size) => size.min(self.settings.max_chunk_size),
        }
        .max(1)
    }

    #[instrument(skip(self, request), fields(model = %request.model, inputs = request.inputs.len()))]
    pub async fn embed(&self, request: &EmbedRequest) -> Result<EmbedResponse, CoreError> {
        let chunk_size = self.effective_chunk_size(request.chunk_size);
        let strategy = TruncateStrategy::resolve(request.truncate_strategy.as_deref());

        let mut results = Vec::with_capacity(request.inputs.len());
        for input in &request.inputs {
            let length = input.text.chars().count();

            let output = if length <= chunk_size {
                let embedding = self.generate(&input.text, request.normalize).await?;
                EmbedOutput::Embeddings(embedding)
            } else {
                let pieces = chunk_text(&input.id, &input.text, chunk_size, strategy);
                debug!(input_id = %input.id, length, chunks = pieces.len(), %strategy, "Chunking input");

                let mut chunks = Vec::with_capacity(pieces.len());
                for piece in pieces {
                    let embedding = self.generate(&piece.text, request.normalize).await?;
                    chunks.push(Chunk {
                        chunk_id: piece.chunk_id,
                        start: piece.start,
                        end: piece.end,
                        text_snippet: truncate_snippet(&piece.text),
                        embedding,
                    });
                }
                EmbedOutput::Chunks(chunks)
            };

            results.push(EmbedResult {
                id: input.id.clone(),
                output,
            });
        }

        Ok(EmbedResponse { results })
    }

    async fn generate(&self, text: &str, normalize: bool) -> Result<Vec<f32>, CoreError> {
        let mut embedding = self.generator.generate_embedding(text).await?;
        if normalize {
            normalize_l2(&mut embedding);
        }
        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbeddingGenerator;

    fn pipeline() -> EmbeddingPipeline {
        let generator = Arc::new(MockEmbeddingGenerator::new(8).unwrap());
        EmbeddingPipeline::new(
            generator,
            ChunkSettings {
                default_chunk_size: 1000,
                max_chunk_size: 8000,
            },
        )
    }

    #[test]
    fn test_effective_chunk_size() {
        let pipeline = pipeline();
        assert_eq!(pipeline.effective_chunk_size(None), 1000);
        assert_eq!(pipeline.effective_chunk_size(Some(0)), 1000);
        assert_eq!(pipeline.effective_chunk_size(Some(50)), 50);
        assert_eq!(pipeline.effective_chunk_size(Some(100_000)), 8000);
    }

    #[tokio::test]
    async fn test_text_at_chunk_size_is_not_chunked() {
        let request = EmbedRequest {
            model: "m".to_string(),
            inputs: vec![crate::data::InputItem::new("a", "x".repeat(10))],
            truncate_strategy: Some("split".to_string()),
            chunk_size: Some(10),
            normalize: false,
        };
        let response = pipeline().embed(&request).await.unwrap();
        assert!(response.results[0].embedding().is_some());
    }
}
