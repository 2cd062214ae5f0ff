//! Local filesystem result store.

use async_trait::async_trait;
use embedbatch_core::{EmbedResponse, JobId};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{result_file_name, sanitize_name, ResultStore, StoreError, StoreResult};

/// Writes each job's results to `{storage_path}/{job_id}_results.json`.
#[derive(Debug, Clone)]
pub struct FileResultStore {
    storage_path: PathBuf,
    url_prefix: String,
}

impl FileResultStore {
    pub fn new(storage_path: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self {
            storage_path: storage_path.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ResultStore for FileResultStore {
    #[instrument(skip(self, job_id, results), fields(job_id = %job_id, files = results.len()))]
    async fn save(&self, job_id: &JobId, results: &[EmbedResponse]) -> StoreResult<String> {
        fs::create_dir_all(&self.storage_path).await?;

        let name = result_file_name(job_id);
        let data = serde_json::to_vec_pretty(results)?;

        // Readers never observe a half-written file
        let target = self.storage_path.join(&name);
        let temp = self.storage_path.join(format!(".{}.{}.tmp", name, Uuid::new_v4()));
        fs::write(&temp, &data).await?;
        if let Err(err) = fs::rename(&temp, &target).await {
            let _ = fs::remove_file(&temp).await;
            return Err(err.into());
        }

        debug!(path = %target.display(), bytes = data.len(), "Persisted job results");
        Ok(format!("{}/{}", self.url_prefix, name))
    }

    async fn load(&self, name: &str) -> StoreResult<Vec<u8>> {
        let name = sanitize_name(name)?;
        match fs::read(self.storage_path.join(&name)).await {
            Ok(data) => Ok(data),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(name)),
            Err(err) => Err(err.into()),
        }
    }
}
