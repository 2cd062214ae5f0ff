//! Embedbatch Result Store
//!
//! Persists the results of a completed embedding job and serves them back by
//! name. The `ResultStore` trait is the seam the job workers write through.

use async_trait::async_trait;
use embedbatch_core::config::{env_string, env_parse};
use embedbatch_core::{EmbedResponse, JobId};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

pub mod file;
pub mod memory;

pub use file::FileResultStore;
pub use memory::MemoryResultStore;

/// Errors that can occur during result store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Result not found: {0}")]
    NotFound(String),

    #[error("Invalid result name: {0}")]
    InvalidName(String),
}

/// Result type for ResultStore operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait defining the contract for result persistence
#[cfg_attr(feature = "mocks", mockall::automock)]
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Persists the per-file results of a job and returns the location callers fetch them from
    async fn save(&self, job_id: &JobId, results: &[EmbedResponse]) -> StoreResult<String>;

    /// Reads back a persisted result by file name
    async fn load(&self, name: &str) -> StoreResult<Vec<u8>>;
}

/// File name a job's results are persisted under.
pub fn result_file_name(job_id: &JobId) -> String {
    format!("{}_results.json", job_id)
}

/// Reduces a requested name to its base name, rejecting anything that is not a plain file name.
pub fn sanitize_name(name: &str) -> StoreResult<String> {
    let base = Path::new(name)
        .file_name()
        .and_then(|base| base.to_str())
        .filter(|base| !base.is_empty() && *base != "." && *base != "..")
        .ok_or_else(|| StoreError::InvalidName(name.to_string()))?;
    Ok(base.to_string())
}

/// Backend used for persisted results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    Local,
    Memory,
}

impl FromStr for StorageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "file" => Ok(StorageType::Local),
            "memory" => Ok(StorageType::Memory),
            other => Err(format!("unknown storage type '{}'", other)),
        }
    }
}

/// Result store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub storage_type: StorageType,
    /// Directory that receives `{job_id}_results.json`
    pub storage_path: String,
    /// Prefix of the returned result locations
    pub url_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Local,
            storage_path: "./storage".to_string(),
            url_prefix: "/v1/results".to_string(),
        }
    }
}

impl StoreConfig {
    /// Reads `STORAGE_TYPE`, `STORAGE_PATH` and `RESULTS_URL_PREFIX`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            storage_type: env_parse("STORAGE_TYPE", defaults.storage_type),
            storage_path: env_string("STORAGE_PATH", &defaults.storage_path),
            url_prefix: env_string("RESULTS_URL_PREFIX", &defaults.url_prefix),
        }
    }
}

/// Creates the result store selected by configuration.
pub fn create_result_store(config: &StoreConfig) -> Arc<dyn ResultStore> {
    match config.storage_type {
        StorageType::Local => {
            info!(path = %config.storage_path, "Using file result store");
            Arc::new(FileResultStore::new(&config.storage_path, &config.url_prefix))
        }
        StorageType::Memory => {
            info!("Using in-memory result store");
            Arc::new(MemoryResultStore::new(&config.url_prefix))
        }
    }
}
