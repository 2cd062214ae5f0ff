//! The asynchronous embedding job and its lifecycle rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::{CoreError, JobId};

/// Lifecycle status of a job.
///
/// Jobs only move forward along `queued -> running -> {completed | failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether a job still counts towards the queue depth.
    pub fn is_pending(&self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Running)
    }

    /// Whether a record in this status may be overwritten by one in `next`.
    pub fn can_advance_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (JobStatus::Queued, JobStatus::Queued | JobStatus::Running) => true,
            (JobStatus::Running, JobStatus::Running | JobStatus::Completed | JobStatus::Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage-specific failure code attached to a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    DownloadFailed,
    ExtractionFailed,
    EmbeddingFailed,
    StorageFailed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DownloadFailed => "download_failed",
            ErrorCode::ExtractionFailed => "extraction_failed",
            ErrorCode::EmbeddingFailed => "embedding_failed",
            ErrorCode::StorageFailed => "storage_failed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error descriptor carried by a failed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    pub code: ErrorCode,
    pub message: String,
}

impl JobError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// An asynchronous multi-file embedding job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: JobId,
    pub status: JobStatus,
    pub progress: u8,
    pub files: Vec<String>,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_urls: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

impl Job {
    /// Creates a fresh `queued` job with progress 0.
    pub fn new(files: Vec<String>, model: impl Into<String>, callback_url: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            job_id: JobId::new_v4(),
            status: JobStatus::Queued,
            progress: 0,
            files,
            model: model.into(),
            result_urls: None,
            error: None,
            created_at: now,
            updated_at: now,
            callback_url: callback_url.filter(|url| !url.trim().is_empty()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// `queued -> running`, resetting progress to 0.
    pub fn start(&mut self) -> Result<(), CoreError> {
        self.expect_status(JobStatus::Queued, JobStatus::Running)?;
        self.status = JobStatus::Running;
        self.progress = 0;
        Ok(())
    }

    /// Records that `done` of `total` files have been processed.
    ///
    /// Progress stays below 100 until the job completes and never decreases.
    pub fn advance_progress(&mut self, done: usize, total: usize) -> Result<(), CoreError> {
        self.expect_status(JobStatus::Running, JobStatus::Running)?;
        if total == 0 {
            return Ok(());
        }
        let percent = (done.min(total) * 100) / total;
        let percent = percent.min(99) as u8;
        self.progress = self.progress.max(percent);
        Ok(())
    }

    /// `running -> completed` with the persisted result locations.
    pub fn complete(&mut self, result_urls: Vec<String>) -> Result<(), CoreError> {
        self.expect_status(JobStatus::Running, JobStatus::Completed)?;
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.result_urls = Some(result_urls);
        self.error = None;
        Ok(())
    }

    /// `running -> failed` with an error descriptor.
    pub fn fail(&mut self, error: JobError) -> Result<(), CoreError> {
        self.expect_status(JobStatus::Running, JobStatus::Failed)?;
        self.status = JobStatus::Failed;
        self.error = Some(error);
        self.result_urls = None;
        Ok(())
    }

    fn expect_status(&self, required: JobStatus, target: JobStatus) -> Result<(), CoreError> {
        if self.status != required {
            return Err(CoreError::invalid_transition(
                self.job_id,
                self.status,
                target,
                format!("job must be {}", required),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(files: usize) -> Job {
        let files = (0..files).map(|i| format!("/tmp/file-{}.txt", i)).collect();
        Job::new(files, "embed-large-512", None)
    }

    #[test]
    fn test_new_job_is_queued() {
        let job = job(2);
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0);
        assert_eq!(job.created_at, job.updated_at);
        assert!(job.result_urls.is_none());
        assert!(job.error.is_none());
    }

    #[test]
    fn test_blank_callback_url_is_dropped() {
        let job = Job::new(vec![], "m", Some("  ".to_string()));
        assert!(job.callback_url.is_none());
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut job = job(2);
        job.start().unwrap();
        assert_eq!(job.status, JobStatus::Running);

        job.advance_progress(1, 2).unwrap();
        assert_eq!(job.progress, 50);

        job.advance_progress(2, 2).unwrap();
        assert_eq!(job.progress, 99, "progress reaches 100 only on completion");

        job.complete(vec!["/v1/results/x.json".to_string()]).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert!(job.result_urls.is_some());
        assert!(job.error.is_none());
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut job = job(3);
        job.start().unwrap();
        job.advance_progress(2, 3).unwrap();
        assert_eq!(job.progress, 66);
        job.advance_progress(1, 3).unwrap();
        assert_eq!(job.progress, 66);
    }

    #[test]
    fn test_fail_sets_error_only() {
        let mut job = job(1);
        job.start().unwrap();
        job.fail(JobError::new(ErrorCode::DownloadFailed, "boom")).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.result_urls.is_none());
        assert_eq!(job.error.as_ref().map(|e| e.code), Some(ErrorCode::DownloadFailed));
    }

    #[test]
    fn test_terminal_states_reject_mutation() {
        let mut job = job(1);
        job.start().unwrap();
        job.complete(vec![]).unwrap();

        assert!(job.start().is_err());
        assert!(job.advance_progress(1, 1).is_err());
        assert!(job.fail(JobError::new(ErrorCode::StorageFailed, "late")).is_err());
        assert!(job.complete(vec![]).is_err());
    }

    #[test]
    fn test_cannot_skip_running() {
        let mut job = job(1);
        assert!(job.complete(vec![]).is_err());
        assert!(job.fail(JobError::new(ErrorCode::EmbeddingFailed, "x")).is_err());
    }

    #[test]
    fn test_status_advance_rules() {
        assert!(JobStatus::Queued.can_advance_to(JobStatus::Running));
        assert!(JobStatus::Running.can_advance_to(JobStatus::Completed));
        assert!(JobStatus::Running.can_advance_to(JobStatus::Failed));
        assert!(!JobStatus::Queued.can_advance_to(JobStatus::Completed));
        assert!(!JobStatus::Running.can_advance_to(JobStatus::Queued));
        assert!(!JobStatus::Completed.can_advance_to(JobStatus::Completed));
        assert!(!JobStatus::Failed.can_advance_to(JobStatus::Running));
    }

    #[test]
    fn test_wire_format() {
        let mut job = job(1);
        job.start().unwrap();
        job.fail(JobError::new(ErrorCode::ExtractionFailed, "empty")).unwrap();

        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error"]["code"], "extraction_failed");
        assert!(value.get("result_urls").is_none());
    }
}
