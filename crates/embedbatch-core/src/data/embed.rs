//! Request and result types of the embedding pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How inputs longer than the chunk size are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TruncateStrategy {
    /// Keep only the first chunk.
    #[default]
    Truncate,
    /// Cover the whole text with consecutive chunks.
    Split,
}

impl TruncateStrategy {
    /// Parses one of the two accepted literals.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "truncate" => Some(TruncateStrategy::Truncate),
            "split" => Some(TruncateStrategy::Split),
            _ => None,
        }
    }

    /// Resolves a caller-supplied value, defaulting to `Truncate` for anything unrecognised.
    pub fn resolve(value: Option<&str>) -> Self {
        value.and_then(Self::parse).unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TruncateStrategy::Truncate => "truncate",
            TruncateStrategy::Split => "split",
        }
    }
}

impl fmt::Display for TruncateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single named text input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputItem {
    pub id: String,
    pub text: String,
}

impl InputItem {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// A batch of inputs to embed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedRequest {
    pub model: String,
    pub inputs: Vec<InputItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncate_strategy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<usize>,
    #[serde(default)]
    pub normalize: bool,
}

/// One embedded segment of a longer input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    /// Inclusive start offset in code points.
    pub start: usize,
    /// Exclusive end offset in code points.
    pub end: usize,
    pub text_snippet: String,
    pub embedding: Vec<f32>,
}

/// The embedding output for a single input: one vector, or one vector per chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedOutput {
    Embeddings(Vec<f32>),
    Chunks(Vec<Chunk>),
}

/// Result for one named input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedResult {
    pub id: String,
    #[serde(flatten)]
    pub output: EmbedOutput,
}

impl EmbedResult {
    pub fn embedding(&self) -> Option<&[f32]> {
        match &self.output {
            EmbedOutput::Embeddings(embedding) => Some(embedding),
            EmbedOutput::Chunks(_) => None,
        }
    }

    pub fn chunks(&self) -> Option<&[Chunk]> {
        match &self.output {
            EmbedOutput::Chunks(chunks) => Some(chunks),
            EmbedOutput::Embeddings(_) => None,
        }
    }
}

/// Ordered results for a whole batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EmbedResponse {
    pub results: Vec<EmbedResult>,
}
