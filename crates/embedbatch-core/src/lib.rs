//! Embedbatch core: job data model, chunking, vector generation and the embedding pipeline.

// Core modules
pub mod data;
pub mod config;
pub mod chunking;
pub mod embedding;
pub mod pipeline;
pub mod extraction;

// Re-export key types for convenient usage
pub use data::{
    Chunk, CoreError, EmbedOutput, EmbedRequest, EmbedResponse, EmbedResult, ErrorCode, InputItem,
    Job, JobError, JobId, JobStatus, TruncateStrategy,
};
pub use config::{EmbeddingConfig, EmbeddingProvider};
pub use chunking::{chunk_text, truncate_snippet, TextChunk};
pub use embedding::{
    create_embedding_generator, normalize_l2, EmbeddingGenerator, FallbackEmbeddingGenerator,
    MockEmbeddingGenerator, OllamaEmbeddingGenerator,
};
#[cfg(feature = "openai")]
pub use embedding::OpenAiEmbeddingGenerator;
pub use pipeline::{ChunkSettings, EmbeddingPipeline};
pub use extraction::{DefaultTextExtractor, ExtractionError, TextExtractor};

/// Initialize a plain tracing subscriber for tests and small tools.
///
/// The server binary uses `embedbatch-monitoring` instead.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_thread_ids(true)
        .try_init();
}
