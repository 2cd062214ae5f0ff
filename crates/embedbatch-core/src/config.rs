//! Embedding configuration and environment helpers shared by the workspace crates.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use tracing::warn;

/// Reads a string variable, treating an empty value as unset.
pub fn env_string(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

/// Reads an optional string variable, treating an empty value as unset.
pub fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

/// Reads and parses a variable, falling back to `default` when unset or invalid.
pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match env_optional(key) {
        Some(raw) => match raw.parse::<T>() {
            Ok(value) => value,
            Err(err) => {
                warn!("Invalid {} value: {} ({})", key, raw, err);
                default
            }
        },
        None => default,
    }
}

/// Reads a boolean flag (`true`/`1`/`yes`).
pub fn env_flag(key: &str, default: bool) -> bool {
    env_optional(key)
        .map(|value| matches!(value.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

/// Backend used to generate vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[default]
    Mock,
    Ollama,
    OpenAi,
}

impl FromStr for EmbeddingProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(EmbeddingProvider::Mock),
            "ollama" => Ok(EmbeddingProvider::Ollama),
            "openai" => Ok(EmbeddingProvider::OpenAi),
            other => Err(format!("unknown embedding provider '{}'", other)),
        }
    }
}

/// Configuration of the vector generator and the chunking limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProvider,

    /// Model tag reported to callers
    #[serde(default = "default_model")]
    pub model: String,

    /// Fixed output dimension of every vector
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    #[serde(default = "default_chunk_size")]
    pub default_chunk_size: usize,

    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    #[serde(default = "default_ollama_model")]
    pub ollama_model: String,

    #[serde(default)]
    pub openai_api_key: Option<String>,

    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    /// Timeout for a single remote embedding call
    #[serde(default = "default_remote_timeout")]
    pub remote_timeout_secs: u64,
}

fn default_model() -> String {
    "embed-large-512".to_string()
}

fn default_dimension() -> usize {
    512
}

fn default_chunk_size() -> usize {
    1000
}

fn default_max_chunk_size() -> usize {
    8000
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_openai_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_remote_timeout() -> u64 {
    60
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            model: default_model(),
            dimension: default_dimension(),
            default_chunk_size: default_chunk_size(),
            max_chunk_size: default_max_chunk_size(),
            ollama_url: default_ollama_url(),
            ollama_model: default_ollama_model(),
            openai_api_key: None,
            openai_model: default_openai_model(),
            remote_timeout_secs: default_remote_timeout(),
        }
    }
}

impl EmbeddingConfig {
    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mut config = Self {
            provider: env_parse("EMBEDDING_PROVIDER", defaults.provider),
            model: env_string("EMBEDDING_MODEL", &defaults.model),
            dimension: env_parse("EMBEDDING_DIMENSION", defaults.dimension),
            default_chunk_size: env_parse("DEFAULT_CHUNK_SIZE", defaults.default_chunk_size),
            max_chunk_size: env_parse("MAX_CHUNK_SIZE", defaults.max_chunk_size),
            ollama_url: env_string("OLLAMA_URL", &defaults.ollama_url),
            ollama_model: env_string("OLLAMA_MODEL", &defaults.ollama_model),
            openai_api_key: env_optional("OPENAI_API_KEY"),
            openai_model: env_string("OPENAI_EMBEDDING_MODEL", &defaults.openai_model),
            remote_timeout_secs: env_parse("REMOTE_EMBEDDING_TIMEOUT_SECS", defaults.remote_timeout_secs),
        };

        if config.max_chunk_size == 0 {
            warn!("MAX_CHUNK_SIZE must be positive, using {}", defaults.max_chunk_size);
            config.max_chunk_size = defaults.max_chunk_size;
        }
        if config.default_chunk_size == 0 || config.default_chunk_size > config.max_chunk_size {
            warn!(
                "DEFAULT_CHUNK_SIZE {} outside (0, {}], clamping",
                config.default_chunk_size, config.max_chunk_size
            );
            config.default_chunk_size = config.default_chunk_size.clamp(1, config.max_chunk_size);
        }

        config
    }
}
