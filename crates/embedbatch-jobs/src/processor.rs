//! The per-job state machine run by every worker.

use embedbatch_core::{
    EmbedRequest, EmbedResponse, EmbeddingPipeline, ErrorCode, InputItem, Job, JobError, JobId,
    JobStatus, TextExtractor, TruncateStrategy,
};
use embedbatch_monitoring::JobMetrics;
use embedbatch_store::ResultStore;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::acquisition::FileAcquirer;
use crate::callback::CallbackDispatcher;
use crate::registry::JobRegistry;

/// Drives a single job from `queued` to a terminal state.
pub struct JobProcessor {
    registry: JobRegistry,
    pipeline: EmbeddingPipeline,
    acquirer: Arc<dyn FileAcquirer>,
    extractor: Arc<dyn TextExtractor>,
    store: Arc<dyn ResultStore>,
    callbacks: CallbackDispatcher,
}

impl JobProcessor {
    pub fn new(
        registry: JobRegistry,
        pipeline: EmbeddingPipeline,
        acquirer: Arc<dyn FileAcquirer>,
        extractor: Arc<dyn TextExtractor>,
        store: Arc<dyn ResultStore>,
        callbacks: CallbackDispatcher,
    ) -> Self {
        Self {
            registry,
            pipeline,
            acquirer,
            extractor,
            store,
            callbacks,
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn callbacks(&self) -> &CallbackDispatcher {
        &self.callbacks
    }

    /// Processes the job with the given id.
    ///
    /// Unknown ids and jobs that are no longer `queued` are skipped. Every
    /// failure ends the job as `failed` and fires its callback once.
    #[instrument(skip(self, job_id), fields(job_id = %job_id))]
    pub async fn process(&self, worker_id: usize, job_id: JobId) {
        let Some(mut job) = self.registry.get(&job_id).await else {
            warn!(worker_id, "Job not found, skipping");
            return;
        };
        if job.status != JobStatus::Queued {
            warn!(worker_id, status = %job.status, "Job is not queued, skipping");
            return;
        }

        info!(worker_id, files = job.files.len(), "Processing job");
        let started = Instant::now();

        if let Err(err) = job.start() {
            error!(error = %err, "Failed to start job");
            return;
        }
        let Some(mut job) = self.commit(job).await else {
            return;
        };

        let files = job.files.clone();
        let total = files.len();
        let mut results = Vec::with_capacity(total);

        for (index, reference) in files.iter().enumerate() {
            match self.process_file(&job, reference).await {
                Ok(response) => results.push(response),
                Err(job_error) => {
                    warn!(worker_id, file = %reference, code = %job_error.code, error = %job_error.message, "File failed");
                    self.finish_failed(job, job_error, started).await;
                    return;
                }
            }

            if let Err(err) = job.advance_progress(index + 1, total) {
                error!(error = %err, "Failed to record progress");
                self.abort(job_id, ErrorCode::EmbeddingFailed, err.to_string(), started).await;
                return;
            }
            job = match self.commit(job).await {
                Some(job) => job,
                None => {
                    let message = "progress update was rejected".to_string();
                    self.abort(job_id, ErrorCode::EmbeddingFailed, message, started).await;
                    return;
                }
            };
            debug!(worker_id, progress = job.progress, "File processed");
        }

        match self.store.save(&job.job_id, &results).await {
            Ok(location) => {
                if let Err(err) = job.complete(vec![location]) {
                    error!(error = %err, "Failed to complete job");
                    self.abort(job_id, ErrorCode::StorageFailed, err.to_string(), started).await;
                    return;
                }
                match self.commit(job).await {
                    Some(job) => {
                        JobMetrics::record_job_completed(&job.job_id.to_string(), total, elapsed_ms(started));
                        self.callbacks.notify(&job);
                    }
                    None => {
                        let message = "completion was rejected".to_string();
                        self.abort(job_id, ErrorCode::StorageFailed, message, started).await;
                    }
                }
            }
            Err(err) => {
                let job_error = JobError::new(ErrorCode::StorageFailed, err.to_string());
                self.finish_failed(job, job_error, started).await;
            }
        }
    }

    /// Acquire, extract and embed one file.
    async fn process_file(&self, job: &Job, reference: &str) -> Result<EmbedResponse, JobError> {
        let acquired = self
            .acquirer
            .acquire(reference)
            .await
            .map_err(|e| JobError::new(ErrorCode::DownloadFailed, e.to_string()))?;

        let file_name = acquired.file_name.clone();
        let extractor = Arc::clone(&self.extractor);
        let text = tokio::task::spawn_blocking(move || {
            extractor.extract(&acquired.file_name, &acquired.bytes)
        })
        .await
        .map_err(|e| JobError::new(ErrorCode::ExtractionFailed, format!("extraction task failed: {}", e)))?
        .map_err(|e| JobError::new(ErrorCode::ExtractionFailed, e.to_string()))?;

        let request = EmbedRequest {
            model: job.model.clone(),
            inputs: vec![InputItem::new(file_name, text)],
            truncate_strategy: Some(TruncateStrategy::Split.as_str().to_string()),
            chunk_size: None,
            normalize: true,
        };

        self.pipeline
            .embed(&request)
            .await
            .map_err(|e| JobError::new(ErrorCode::EmbeddingFailed, e.to_string()))
    }

    async fn finish_failed(&self, mut job: Job, job_error: JobError, started: Instant) {
        let code = job_error.code;
        if let Err(err) = job.fail(job_error) {
            error!(error = %err, "Failed to mark job as failed");
            return;
        }
        if let Some(job) = self.commit(job).await {
            JobMetrics::record_job_failed(&job.job_id.to_string(), code.as_str(), elapsed_ms(started));
            self.callbacks.notify(&job);
        }
    }

    /// Fails the job from its latest registered state after a rejected write.
    async fn abort(&self, job_id: JobId, code: ErrorCode, message: String, started: Instant) {
        match self.registry.get(&job_id).await {
            Some(job) if job.status == JobStatus::Running => {
                self.finish_failed(job, JobError::new(code, message), started).await;
            }
            Some(job) => warn!(status = %job.status, "Job left running state elsewhere"),
            None => warn!("Job disappeared from the registry"),
        }
    }

    /// Writes the record back, logging rejected writes.
    async fn commit(&self, job: Job) -> Option<Job> {
        match self.registry.update(job).await {
            Ok(job) => Some(job),
            Err(err) => {
                error!(error = %err, "Registry rejected job update");
                None
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
