//! Synchronous embedding endpoints: JSON batches and single file uploads.

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, State},
    Json,
};
use embedbatch_core::{EmbedRequest, EmbedResponse, InputItem, TruncateStrategy};
use tracing::{debug, info, instrument};

use super::errors::ApiError;
use crate::config::ServerConfig;
use crate::server::AppState;

/// File types accepted by the upload endpoint
pub const UPLOAD_EXTENSIONS: [&str; 2] = ["pdf", "txt"];

/// Checks a JSON batch against the configured limits.
pub fn validate_embed_request(request: &EmbedRequest, config: &ServerConfig) -> Result<(), ApiError> {
    if request.model.trim().is_empty() {
        return Err(ApiError::BadRequest("model is required".to_string()));
    }
    if request.inputs.is_empty() {
        return Err(ApiError::BadRequest("inputs must contain at least one item".to_string()));
    }
    if request.inputs.len() > config.max_batch_size {
        return Err(ApiError::PayloadTooLarge(format!(
            "Batch size exceeds maximum allowed ({})",
            config.max_batch_size
        )));
    }
    if request.inputs.iter().any(|input| input.id.trim().is_empty()) {
        return Err(ApiError::BadRequest("every input requires a non-empty id".to_string()));
    }
    if let Some(chunk_size) = request.chunk_size {
        if chunk_size > config.embedding.max_chunk_size {
            return Err(ApiError::BadRequest(format!(
                "Invalid chunk_size: must be between 0 and {}",
                config.embedding.max_chunk_size
            )));
        }
    }
    validate_strategy(request.truncate_strategy.as_deref())
}

fn validate_strategy(strategy: Option<&str>) -> Result<(), ApiError> {
    match strategy {
        Some(value) if !value.is_empty() && TruncateStrategy::parse(value).is_none() => Err(
            ApiError::BadRequest("truncate_strategy must be 'truncate' or 'split'".to_string()),
        ),
        _ => Ok(()),
    }
}

/// POST /v1/embed
#[instrument(skip_all)]
pub async fn embed_handler(
    State(state): State<AppState>,
    payload: Result<Json<EmbedRequest>, JsonRejection>,
) -> Result<Json<EmbedResponse>, ApiError> {
    let Json(request) = payload?;
    validate_embed_request(&request, &state.config)?;

    let response = state.pipeline.embed(&request).await?;
    debug!(results = response.results.len(), "Embedded batch");
    Ok(Json(response))
}

/// An upload read from the multipart body.
struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct UploadForm {
    file: Option<Upload>,
    model: Option<String>,
    truncate_strategy: Option<String>,
    normalize: Option<String>,
}

fn has_upload_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| UPLOAD_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
}

async fn read_upload_form(mut multipart: Multipart, limit: usize) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .map(|name| name.to_string())
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;

                if !has_upload_extension(&file_name) {
                    return Err(ApiError::BadRequest(
                        "Unsupported file type. Only PDF and TXT files are allowed.".to_string(),
                    ));
                }

                let mut bytes = Vec::new();
                while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                    if bytes.len() + chunk.len() > limit {
                        return Err(ApiError::PayloadTooLarge(
                            "File too large for synchronous processing. Use /v1/jobs for async processing."
                                .to_string(),
                        ));
                    }
                    bytes.extend_from_slice(&chunk);
                }
                form.file = Some(Upload { file_name, bytes });
            }
            "model" | "truncate_strategy" | "normalize" => {
                let value = field.text().await.map_err(multipart_error)?;
                let value = Some(value.trim().to_string()).filter(|value| !value.is_empty());
                match name.as_str() {
                    "model" => form.model = value,
                    "truncate_strategy" => form.truncate_strategy = value,
                    _ => form.normalize = value,
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// POST /v1/embed/file
#[instrument(skip_all)]
pub async fn embed_file_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<EmbedResponse>, ApiError> {
    let multipart = multipart.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let form = read_upload_form(multipart, state.config.sync_file_limit_bytes()).await?;

    let upload = form
        .file
        .ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;

    let truncate_strategy = form.truncate_strategy.unwrap_or_else(|| "split".to_string());
    validate_strategy(Some(&truncate_strategy))?;
    let normalize = form
        .normalize
        .map(|value| value.eq_ignore_ascii_case("true"))
        .unwrap_or(true);

    let extractor = Arc::clone(&state.extractor);
    let file_name = upload.file_name.clone();
    let text = tokio::task::spawn_blocking(move || extractor.extract(&file_name, &upload.bytes))
        .await
        .map_err(|e| ApiError::InternalServerError(format!("Extraction task failed: {}", e)))?
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    info!(file = %upload.file_name, chars = text.chars().count(), "Embedding uploaded file");

    let request = EmbedRequest {
        model: form.model.unwrap_or_else(|| state.config.embedding.model.clone()),
        inputs: vec![InputItem::new(upload.file_name, text)],
        truncate_strategy: Some(truncate_strategy),
        chunk_size: None,
        normalize,
    };

    let response = state.pipeline.embed(&request).await?;
    Ok(Json(response))
}
