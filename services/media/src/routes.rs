//! Processing gateway routes

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Extension, Multipart, Query, State},
    http::{StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tracing::error;

use common::session::Identity;

use crate::AppState;
use crate::error::ApiError;
use crate::metadata::{self, MediaKind, ProcessMode};
use crate::middleware::require_session;
use crate::models::{
    DownloadParams, ProcessRequest, ProcessResponse, ScanResponse, UploadUrlRequest,
    UploadUrlResponse,
};
use crate::storage::JobStorage;

/// Create the router for the processing gateway
pub fn create_router(state: AppState) -> Router {
    // The default body limit is far below a media file; allow the configured
    // maximum plus some slack for the multipart framing.
    let body_limit = state.storage.max_file_bytes() as usize + 1024 * 1024;

    let protected = Router::new()
        .route("/api/upload-url", post(create_upload_url))
        .route("/api/jobs/scan", post(scan_job))
        .route("/api/jobs/process", post(process_job))
        .route("/api/jobs/download", get(download_job))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ))
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "media-service"
    }))
}

/// Hand out a presigned PUT URL for a direct-to-bucket upload.
pub async fn create_upload_url(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<UploadUrlRequest>,
) -> Result<Json<UploadUrlResponse>, ApiError> {
    let Some(uploads) = &state.uploads else {
        return Err(ApiError::BadRequest(
            "Direct uploads are not configured".to_string(),
        ));
    };

    let filename = payload.filename.as_deref().unwrap_or("file.bin");
    let content_type = payload
        .content_type
        .as_deref()
        .unwrap_or("application/octet-stream");

    let (upload_url, file_url) = uploads
        .create_upload_url(identity.lead_id, filename, content_type)
        .await
        .map_err(|e| {
            error!("Failed to presign upload: {}", e);
            ApiError::Internal
        })?;

    Ok(Json(UploadUrlResponse {
        upload_url,
        file_url,
    }))
}

/// Accept a file (direct multipart part or by uploaded-object URL), store it
/// as a job input, and return its embedded metadata.
pub async fn scan_job(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ScanResponse>, ApiError> {
    let mut kind: Option<MediaKind> = None;
    let mut file: Option<(String, Bytes)> = None;
    let mut file_url: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid form data: {e}")))?
    {
        match field.name().unwrap_or("") {
            "kind" => {
                let value = field
                    .text()
                    .await
                    .map_err(|_| ApiError::BadRequest("Invalid kind field".to_string()))?;
                kind = Some(match value.as_str() {
                    "image" => MediaKind::Image,
                    "video" => MediaKind::Video,
                    other => {
                        return Err(ApiError::BadRequest(format!("Unknown kind: {other}")));
                    }
                });
            }
            "file" => {
                let name = field.file_name().unwrap_or("file.bin").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?;
                file = Some((name, bytes));
            }
            "file_url" => {
                let url = field
                    .text()
                    .await
                    .map_err(|_| ApiError::BadRequest("Invalid file_url field".to_string()))?;
                file_url = Some(url);
            }
            _ => {}
        }
    }

    let kind = kind.ok_or_else(|| ApiError::BadRequest("Missing kind".to_string()))?;

    let (original_name, bytes) = match (file, file_url) {
        (Some(found), _) => found,
        (None, Some(url)) => fetch_uploaded(&state, &url).await?,
        (None, None) => return Err(ApiError::BadRequest("Missing file".to_string())),
    };

    let max_bytes = state.storage.max_file_bytes();
    if bytes.len() as u64 > max_bytes {
        return Err(ApiError::BadRequest(format!(
            "File too large (max {}MB)",
            max_bytes / (1024 * 1024)
        )));
    }

    let ext = ext_from_filename(&original_name);
    let job_id = JobStorage::new_job_id();
    let input = state.storage.input_path(&job_id, &ext).map_err(|e| {
        error!("Failed to build job input path: {}", e);
        ApiError::Internal
    })?;
    tokio::fs::write(&input, &bytes).await.map_err(|e| {
        error!("Failed to write job input: {}", e);
        ApiError::Internal
    })?;

    let meta = metadata::scan(kind, &input).await.map_err(|e| {
        error!("Scan failed: {}", e);
        ApiError::BadRequest("Scan failed".to_string())
    })?;

    Ok(Json(ScanResponse {
        ok: true,
        job_id,
        ext,
        meta,
        original_name,
    }))
}

/// Strip or edit the metadata of a previously scanned job input.
pub async fn process_job(
    State(state): State<AppState>,
    Json(payload): Json<ProcessRequest>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let input = state
        .storage
        .input_path(&payload.job_id, &payload.ext)
        .map_err(|_| ApiError::BadRequest("Invalid jobId/ext".to_string()))?;
    if !input.exists() {
        return Err(ApiError::BadRequest(
            "Input expired or missing. Re-upload.".to_string(),
        ));
    }

    let output = state
        .storage
        .output_path(&payload.job_id, &payload.ext)
        .map_err(|_| ApiError::BadRequest("Invalid jobId/ext".to_string()))?;

    let result = match payload.mode {
        ProcessMode::Strip => metadata::strip(payload.kind, &input, &output).await,
        ProcessMode::Edit => {
            metadata::edit(payload.kind, &input, &output, &payload.fields).await
        }
    };
    if let Err(e) = result {
        error!("Processing failed: {}", e);
        return Err(ApiError::BadRequest("Processing failed".to_string()));
    }

    Ok(Json(ProcessResponse {
        ok: true,
        download_url: format!(
            "/api/jobs/download?jobId={}&ext={}",
            payload.job_id, payload.ext
        ),
    }))
}

/// Stream a processed output back to the client.
pub async fn download_job(
    State(state): State<AppState>,
    Query(params): Query<DownloadParams>,
) -> Result<Response, ApiError> {
    let ext = params.ext.as_deref().unwrap_or("bin");
    let path = state
        .storage
        .output_path(&params.job_id, ext)
        .map_err(|_| ApiError::BadRequest("Invalid jobId/ext".to_string()))?;

    let data = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::NotFound("File not found".to_string()))?;

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                "application/octet-stream".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.{}\"", params.job_id, ext),
            ),
        ],
        data,
    )
        .into_response())
}

/// Fetch a file the client uploaded to object storage via a presigned URL.
async fn fetch_uploaded(state: &AppState, url: &str) -> Result<(String, Bytes), ApiError> {
    let response = state
        .http
        .get(url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|e| {
            error!("Failed to fetch uploaded file: {}", e);
            ApiError::BadRequest("Failed to fetch file".to_string())
        })?;

    let path = url.split('?').next().unwrap_or(url);
    let name = path
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or("file.bin")
        .to_string();

    let bytes = response.bytes().await.map_err(|e| {
        error!("Failed to read uploaded file: {}", e);
        ApiError::BadRequest("Failed to fetch file".to_string())
    })?;

    Ok((name, bytes))
}

/// Lowercased extension of a client-supplied filename, `bin` when in doubt.
fn ext_from_filename(name: &str) -> String {
    let ext = name
        .rsplit('.')
        .next()
        .filter(|ext| !ext.is_empty() && *ext != name)
        .unwrap_or("bin")
        .to_ascii_lowercase();

    if !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        ext
    } else {
        "bin".to_string()
    }
}
