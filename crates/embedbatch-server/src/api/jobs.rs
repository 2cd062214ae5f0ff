//! Asynchronous job submission and status endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use embedbatch_core::{Job, JobError, JobId, JobStatus};
use embedbatch_jobs::JobsError;
use embedbatch_monitoring::metrics::JobMetrics;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::errors::ApiError;
use crate::server::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateJobRequest {
    pub model: String,
    pub files: Vec<String>,
    #[serde(default)]
    pub callback_url: Option<String>,
    /// Accepted for compatibility; jobs are always processed in FIFO order.
    #[serde(default)]
    pub priority: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobAcceptedResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub message: String,
}

/// Public view of a job record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusView {
    pub job_id: JobId,
    pub status: JobStatus,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_urls: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

impl From<&Job> for JobStatusView {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.job_id,
            status: job.status,
            progress: job.progress,
            result_urls: job.result_urls.clone(),
            error: job.error.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobStatusView>,
}

/// A file reference must be an http(s) URL or look like a local path.
pub fn is_valid_file_reference(reference: &str) -> bool {
    reference.starts_with("http://")
        || reference.starts_with("https://")
        || reference.contains('/')
        || reference.contains('\\')
}

pub fn validate_create_job(request: &CreateJobRequest) -> Result<(), ApiError> {
    if request.model.trim().is_empty() {
        return Err(ApiError::BadRequest("model is required".to_string()));
    }
    if request.files.is_empty() {
        return Err(ApiError::BadRequest("At least one file URL is required".to_string()));
    }
    if let Some(invalid) = request.files.iter().find(|file| !is_valid_file_reference(file)) {
        return Err(ApiError::BadRequest(format!("Invalid file URL: {}", invalid)));
    }
    Ok(())
}

/// POST /v1/jobs
#[instrument(skip_all)]
pub async fn create_job_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateJobRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<JobAcceptedResponse>), ApiError> {
    let Json(request) = payload?;
    validate_create_job(&request)?;

    // No record is created for a job no worker would ever pick up
    if state.pool.is_closed() {
        warn!("Job rejected, worker pool is shut down");
        return Err(JobsError::PoolClosed.into());
    }

    let file_count = request.files.len();
    let job = state
        .registry
        .create(request.files, &request.model, request.callback_url)
        .await;
    JobMetrics::record_job_submitted(&job.job_id.to_string(), file_count);
    info!(
        job_id = %job.job_id,
        priority = request.priority.as_deref().unwrap_or("normal"),
        "Job accepted"
    );

    // Waits for queue capacity when the pool is saturated
    if let Err(err) = state.pool.enqueue(job.job_id).await {
        warn!(job_id = %job.job_id, error = %err, "Job could not be enqueued");
        return Err(err.into());
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(JobAcceptedResponse {
            job_id: job.job_id,
            status: job.status,
            message: "Job accepted for processing".to_string(),
        }),
    ))
}

/// GET /v1/jobs
pub async fn list_jobs_handler(State(state): State<AppState>) -> Json<JobListResponse> {
    let mut jobs = state.registry.list().await;
    jobs.sort_by_key(|job| job.created_at);

    Json(JobListResponse {
        jobs: jobs.iter().map(JobStatusView::from).collect(),
    })
}

/// GET /v1/jobs/:job_id
pub async fn get_job_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusView>, ApiError> {
    let not_found = || ApiError::NotFound("Job not found".to_string());

    let job_id: JobId = job_id.parse().map_err(|_| not_found())?;
    let job = state.registry.get(&job_id).await.ok_or_else(not_found)?;
    Ok(Json(JobStatusView::from(&job)))
}
