//! Best-effort notification of job completion.

use embedbatch_core::{Job, JobError, JobId, JobStatus};
use embedbatch_monitoring::JobMetrics;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{CallbackError, JobsError};

/// Body POSTed to a job's callback URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackPayload {
    pub job_id: JobId,
    pub status: JobStatus,
    pub result_urls: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

impl From<&Job> for CallbackPayload {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.job_id,
            status: job.status,
            result_urls: job.result_urls.clone(),
            error: job.error.clone(),
        }
    }
}

/// Sends one callback per terminal job, without retries.
///
/// Deliveries run on background tasks owned by the dispatcher; `drain` waits
/// for the ones still in flight.
#[derive(Clone)]
pub struct CallbackDispatcher {
    client: Client,
    in_flight: Arc<Mutex<JoinSet<()>>>,
}

impl std::fmt::Debug for CallbackDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackDispatcher")
            .field("in_flight", &self.in_flight_count())
            .finish()
    }
}

impl CallbackDispatcher {
    pub fn new(timeout_secs: u64) -> Result<Self, JobsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| JobsError::Configuration(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            in_flight: Arc::new(Mutex::new(JoinSet::new())),
        })
    }

    /// Fires the callback on a background task. Returns `false` when the job has no callback URL.
    pub fn notify(&self, job: &Job) -> bool {
        if job.callback_url.is_none() {
            return false;
        }

        let dispatcher = self.clone();
        let job = job.clone();
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        // Reap finished deliveries so the set only holds pending ones
        while in_flight.try_join_next().is_some() {}
        in_flight.spawn(async move {
            let job_id = job.job_id.to_string();
            match dispatcher.deliver(&job).await {
                Ok(status) => {
                    info!(job_id = %job_id, status, "Callback delivered");
                    JobMetrics::record_callback(&job_id, true);
                }
                Err(err) => {
                    warn!(job_id = %job_id, error = %err, "Callback delivery failed");
                    JobMetrics::record_callback(&job_id, false);
                }
            }
        });
        true
    }

    /// Number of deliveries not yet reaped.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Waits until every delivery started so far has finished.
    pub async fn drain(&self) {
        loop {
            let mut pending = {
                let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
                std::mem::take(&mut *in_flight)
            };
            if pending.is_empty() {
                break;
            }
            debug!(pending = pending.len(), "Waiting for callback deliveries");
            while let Some(result) = pending.join_next().await {
                if let Err(e) = result {
                    error!(error = %e, "Callback task panicked");
                }
            }
        }
    }

    /// Makes a single delivery attempt and returns the response status.
    #[instrument(skip(self, job), fields(job_id = %job.job_id))]
    pub async fn deliver(&self, job: &Job) -> Result<u16, CallbackError> {
        let url = job.callback_url.as_deref().ok_or(CallbackError::NoCallbackUrl)?;

        let response = self
            .client
            .post(url)
            .json(&CallbackPayload::from(job))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CallbackError::HttpStatus(status.as_u16()));
        }
        Ok(status.as_u16())
    }
}
