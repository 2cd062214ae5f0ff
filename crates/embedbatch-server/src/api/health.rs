//! Health check endpoint

use axum::{extract::State, Json};
use embedbatch_monitoring::metrics::JobMetrics;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::server::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Jobs created but not yet picked up by a worker
    pub queue_depth: usize,
}

/// Health check handler, served without authentication.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let queue_depth = state.registry.queue_depth().await;
    JobMetrics::record_queue_depth(queue_depth);
    debug!(queue_depth, "Health check requested");

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        queue_depth,
    })
}
