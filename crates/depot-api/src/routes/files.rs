//! # File API
//!
//! Upload (multipart in, URIs out), batch load (URIs in, bytes out), and
//! direct download of a single artifact. Handlers only decode the transport
//! format and enforce boundary limits; batch semantics live in
//! [`crate::pipeline`].

use axum::extract::multipart::{Field, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::header;
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::{Bytes, BytesMut};
use depot_core::mime_type_of;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::AppConfig;
use crate::error::{AppError, ErrorBody};
use crate::extractors::{extract_json, multipart_error, multipart_rejection};
use crate::middleware::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::pipeline::{IncomingFile, IngestedFile, LoadedFile};
use crate::state::AppState;

/// Multipart field name carrying uploaded files.
pub const FILES_FIELD: &str = "files";

/// Multipart upload form. Documentation only; the handler streams parts.
#[derive(Debug, ToSchema)]
pub struct UploadForm {
    /// One or more files, repeated under the same field name.
    #[schema(value_type = Vec<String>, format = Binary)]
    pub files: Vec<Vec<u8>>,
}

/// Batch load request.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct LoadRequest {
    /// URIs returned by a previous upload. Kept as raw JSON values so a
    /// non-string element is reported by position.
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub uris: Vec<serde_json::Value>,
}

/// Build the file router. Upload and load/download carry separate rate
/// limit budgets; only the upload route gets the enlarged body limit.
pub fn router(config: &AppConfig) -> Router<AppState> {
    let upload_limiter = RateLimiter::new(config.upload_rate_limit.clone())
        .trusting_forwarded_for(config.trust_forwarded_for);
    let load_limiter = RateLimiter::new(config.load_rate_limit.clone())
        .trusting_forwarded_for(config.trust_forwarded_for);

    let upload = Router::new()
        .route("/v1/files/upload", post(upload_files))
        .layer(DefaultBodyLimit::max(config.upload_body_limit()))
        .route_layer(from_fn_with_state(upload_limiter, rate_limit_middleware));

    let load = Router::new()
        .route("/v1/files/load", post(load_files))
        .route("/uploads/{date}/{name}", get(download_file))
        .route_layer(from_fn_with_state(load_limiter, rate_limit_middleware));

    upload.merge(load)
}

/// POST /v1/files/upload: store one or more files.
#[utoipa::path(
    post,
    path = "/v1/files/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Files stored, in request order", body = Vec<IngestedFile>),
        (status = 400, description = "Empty batch, too many files, or disallowed type", body = ErrorBody),
        (status = 413, description = "A file exceeds the size limit", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = ErrorBody),
        (status = 500, description = "Storage failure", body = ErrorBody),
    ),
    tag = "files"
)]
pub async fn upload_files(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Vec<IngestedFile>>, AppError> {
    let mut multipart = multipart.map_err(multipart_rejection)?;
    let max_files = state.config.max_files;
    let max_file_size = state.config.max_file_size;

    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        if files.len() == max_files {
            return Err(AppError::Validation(format!(
                "too many files: at most {max_files} per request"
            )));
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let mime_hint = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| mime_type_of(&original_name));
        let bytes = read_capped(field, max_file_size, &original_name).await?;

        files.push(IncomingFile {
            original_name,
            mime_hint,
            bytes,
        });
    }

    tracing::debug!(count = files.len(), "upload received");
    let ingested = state.ingestion.ingest(files).await?;
    Ok(Json(ingested))
}

async fn read_capped(
    mut field: Field<'_>,
    limit: usize,
    original_name: &str,
) -> Result<Bytes, AppError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if buf.len() + chunk.len() > limit {
            tracing::info!(original_name, limit, "upload part exceeds size limit");
            return Err(AppError::PayloadTooLarge(format!(
                "file {original_name:?} exceeds the {limit} byte limit"
            )));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

/// POST /v1/files/load: fetch the bytes of previously uploaded files.
#[utoipa::path(
    post,
    path = "/v1/files/load",
    request_body = LoadRequest,
    responses(
        (status = 200, description = "File contents, in request order", body = Vec<LoadedFile>),
        (status = 400, description = "Malformed request or integrity failure", body = ErrorBody),
        (status = 404, description = "One or more URIs unknown", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = ErrorBody),
    ),
    tag = "files"
)]
pub async fn load_files(
    State(state): State<AppState>,
    body: Result<Json<LoadRequest>, JsonRejection>,
) -> Result<Json<Vec<LoadedFile>>, AppError> {
    let req = extract_json(body)?;
    let loaded = state.retrieval.load(req.uris).await?;
    Ok(Json(loaded))
}

/// GET /uploads/{date}/{name}: raw bytes of one artifact.
#[utoipa::path(
    get,
    path = "/uploads/{date}/{name}",
    params(
        ("date" = String, Path, description = "Date partition, YYYY-MM-DD"),
        ("name" = String, Path, description = "Stored name"),
    ),
    responses(
        (status = 200, description = "File contents with their recorded MIME type"),
        (status = 400, description = "Integrity failure", body = ErrorBody),
        (status = 404, description = "Unknown URI", body = ErrorBody),
    ),
    tag = "files"
)]
pub async fn download_file(
    State(state): State<AppState>,
    Path((date, name)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let uri = format!("{}{date}/{name}", depot_core::URI_PREFIX);
    let (artifact, bytes) = state.retrieval.load_one(&uri).await?;
    Ok(([(header::CONTENT_TYPE, artifact.mime_type)], bytes).into_response())
}
