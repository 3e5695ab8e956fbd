//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented file routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "depot: File Upload and Retrieval API",
        description = "Stores uploaded files under collision-free, date-partitioned URIs and returns their bytes by URI.\n\n- Uploads are all-or-nothing per request.\n- Loads are all-or-nothing per request; unknown URIs fail the batch.\n- Content hashes recorded at upload are verified on every read.",
    ),
    paths(
        crate::routes::files::upload_files,
        crate::routes::files::load_files,
        crate::routes::files::download_file,
    ),
    components(
        schemas(
            // ── Requests ────────────────────────────────────────────────
            crate::routes::files::UploadForm,
            crate::routes::files::LoadRequest,
            // ── Responses ───────────────────────────────────────────────
            crate::pipeline::IngestedFile,
            crate::pipeline::LoadedFile,
            crate::pipeline::BufferPayload,
            // ── Error types ─────────────────────────────────────────────
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
        ),
    ),
    tags(
        (name = "files", description = "Upload, batch load, and direct download of stored files"),
    )
)]
pub struct ApiDoc;

/// Serves the spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
