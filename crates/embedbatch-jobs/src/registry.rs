//! In-memory registry of embedding jobs.

use chrono::Utc;
use embedbatch_core::{CoreError, Job, JobId, JobStatus};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Concurrency-safe map of job records.
///
/// Cloning is cheap and every clone shares the same records. Callers only ever
/// see snapshot copies.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<JobId, Job>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new `queued` job.
    pub async fn create(
        &self,
        files: Vec<String>,
        model: impl Into<String>,
        callback_url: Option<String>,
    ) -> Job {
        let job = Job::new(files, model, callback_url);
        self.jobs.write().await.insert(job.job_id, job.clone());
        debug!(job_id = %job.job_id, files = job.files.len(), "Job registered");
        job
    }

    pub async fn get(&self, job_id: &JobId) -> Option<Job> {
        self.jobs.read().await.get(job_id).cloned()
    }

    /// Overwrites a job record and returns it with `updated_at` refreshed.
    ///
    /// Writes to terminal records, backwards status moves and progress
    /// regressions are rejected.
    pub async fn update(&self, mut job: Job) -> Result<Job, CoreError> {
        let mut jobs = self.jobs.write().await;
        let previous = jobs
            .get(&job.job_id)
            .ok_or_else(|| CoreError::InvalidInput(format!("Job {} is not registered", job.job_id)))?;

        if previous.is_terminal() {
            return Err(CoreError::invalid_transition(
                job.job_id,
                previous.status,
                job.status,
                "job is terminal",
            ));
        }
        if !previous.status.can_advance_to(job.status) {
            return Err(CoreError::invalid_transition(
                job.job_id,
                previous.status,
                job.status,
                "status cannot move backwards",
            ));
        }
        if job.progress < previous.progress {
            return Err(CoreError::invalid_transition(
                job.job_id,
                previous.status,
                job.status,
                format!("progress regressed from {} to {}", previous.progress, job.progress),
            ));
        }
        if job.progress >= 100 && job.status != JobStatus::Completed {
            return Err(CoreError::invalid_transition(
                job.job_id,
                previous.status,
                job.status,
                "progress reaches 100 only on completion",
            ));
        }

        job.created_at = previous.created_at;
        job.updated_at = previous.updated_at.max(Utc::now());
        jobs.insert(job.job_id, job.clone());
        Ok(job)
    }

    /// Number of jobs that are `queued` or `running`.
    pub async fn queue_depth(&self) -> usize {
        self.jobs
            .read()
            .await
            .values()
            .filter(|job| job.status.is_pending())
            .count()
    }

    /// Snapshot of every job, in no particular order.
    pub async fn list(&self) -> Vec<Job> {
        self.jobs.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}
