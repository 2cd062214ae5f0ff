//! Serves persisted job result files.

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use tracing::debug;

use super::errors::ApiError;
use crate::server::AppState;

/// GET /v1/results/:filename
///
/// Only the base name of `filename` is looked up in the result store.
pub async fn get_result_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let data = state.store.load(&filename).await?;
    debug!(file = %filename, bytes = data.len(), "Serving result file");

    let mut response = data.into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Ok(response)
}
