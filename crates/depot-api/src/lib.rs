//! # depot-api: HTTP Service for the depot File Service
//!
//! Axum/Tower/Tokio front end over the ingestion and retrieval pipelines.
//!
//! ## API Surface
//!
//! | Route                       | Module                  | Purpose                 |
//! |-----------------------------|-------------------------|-------------------------|
//! | `POST /v1/files/upload`     | [`routes::files`]       | Multipart batch upload  |
//! | `POST /v1/files/load`       | [`routes::files`]       | Batch load by URI       |
//! | `GET /uploads/{date}/{name}`| [`routes::files`]       | Direct download         |
//! | `GET /health/*`             | this module             | Liveness and readiness  |
//! | `GET /openapi.json`         | [`openapi`]             | Generated OpenAPI spec  |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! CorsLayer → TraceLayer → RateLimitMiddleware (per route group) → Handler
//! ```
//!
//! ## Crate Policy
//!
//! - No batch logic in route handlers; handlers decode the transport format
//!   and delegate to [`pipeline`].
//! - All errors map to structured HTTP responses via [`AppError`].

pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod pipeline;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use config::AppConfig;
pub use error::AppError;
pub use state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health checks and `/openapi.json` are not rate limited.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::files::router(&state.config))
        .merge(openapi::router())
        .with_state(state.clone());

    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .with_state(state.clone());

    Router::new()
        .merge(health)
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors::cors_layer(&state.config.cors_origins))
}

/// Liveness check: 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness check: 200 "ready" when the upload root exists and is a
/// directory, 503 otherwise.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let root = state.store.root();
    match tokio::fs::metadata(root).await {
        Ok(meta) if meta.is_dir() => (StatusCode::OK, "ready").into_response(),
        Ok(_) => {
            tracing::warn!(root = %root.display(), "upload root is not a directory");
            (StatusCode::SERVICE_UNAVAILABLE, "upload root is not a directory").into_response()
        }
        Err(e) => {
            tracing::warn!(root = %root.display(), error = %e, "upload root unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, "upload root unavailable").into_response()
        }
    }
}
