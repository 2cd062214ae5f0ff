//! In-memory implementation of ResultStore
//!
//! Intended for tests and `STORAGE_TYPE=memory`. All data is lost when the
//! instance is dropped.

use async_trait::async_trait;
use embedbatch_core::{EmbedResponse, JobId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{result_file_name, sanitize_name, ResultStore, StoreError, StoreResult};

#[derive(Debug, Clone, Default)]
pub struct MemoryResultStore {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    url_prefix: String,
}

impl MemoryResultStore {
    pub fn new(url_prefix: &str) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Number of persisted result sets
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Deserialized results of a job, if any were saved
    pub async fn results_for(&self, job_id: &JobId) -> Option<Vec<EmbedResponse>> {
        let entries = self.entries.read().await;
        entries
            .get(&result_file_name(job_id))
            .and_then(|data| serde_json::from_slice(data).ok())
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn save(&self, job_id: &JobId, results: &[EmbedResponse]) -> StoreResult<String> {
        let name = result_file_name(job_id);
        let data = serde_json::to_vec_pretty(results)?;
        self.entries.write().await.insert(name.clone(), data);
        Ok(format!("{}/{}", self.url_prefix, name))
    }

    async fn load(&self, name: &str) -> StoreResult<Vec<u8>> {
        let name = sanitize_name(name)?;
        self.entries
            .read()
            .await
            .get(&name)
            .cloned()
            .ok_or(StoreError::NotFound(name))
    }
}
