//! Job pipeline metrics.
//!
//! Everything goes through the `metrics` facade, so it is a no-op until the
//! binary installs a recorder, and is mirrored to the log.

use tracing::{debug, info};

/// Embedding job metrics
pub struct JobMetrics;

impl JobMetrics {
    /// Record an accepted job submission
    pub fn record_job_submitted(job_id: &str, file_count: usize) {
        metrics::increment_counter!("jobs_submitted_total");
        info!(job_id, file_count, "Job submitted");
    }

    /// Record a job that reached `completed`
    pub fn record_job_completed(job_id: &str, file_count: usize, duration_ms: f64) {
        metrics::increment_counter!("jobs_completed_total");
        metrics::histogram!("job_duration_ms", duration_ms, "outcome" => "completed");
        info!(job_id, file_count, duration_ms, "Job completed");
    }

    /// Record a job that reached `failed`
    pub fn record_job_failed(job_id: &str, code: &str, duration_ms: f64) {
        metrics::increment_counter!("jobs_failed_total", "code" => code.to_string());
        metrics::histogram!("job_duration_ms", duration_ms, "outcome" => "failed");
        info!(job_id, code, duration_ms, "Job failed");
    }

    /// Record one callback delivery attempt
    pub fn record_callback(job_id: &str, success: bool) {
        let outcome = if success { "delivered" } else { "failed" };
        metrics::increment_counter!("callbacks_total", "outcome" => outcome);
        debug!(job_id, outcome, "Callback attempt recorded");
    }

    /// Record a remote embedding call replaced by the local mock
    pub fn record_embedding_fallback(provider: &str) {
        metrics::increment_counter!("embedding_fallbacks_total", "provider" => provider.to_string());
        debug!(provider, "Embedding fallback recorded");
    }

    /// Record the number of jobs still queued or running
    pub fn record_queue_depth(depth: usize) {
        metrics::gauge!("job_queue_depth", depth as f64);
    }
}

/// HTTP surface metrics
pub struct ServerMetrics;

impl ServerMetrics {
    /// Record HTTP request
    pub fn record_http_request(path: &str, method: &str, status_code: u16, duration_ms: f64) {
        metrics::increment_counter!(
            "http_requests_total",
            "method" => method.to_string(),
            "status" => status_code.to_string()
        );
        metrics::histogram!("http_request_duration_ms", duration_ms);
        info!("HTTP Request: path={}, method={}, status={}, duration={}ms", path, method, status_code, duration_ms);
    }
}
