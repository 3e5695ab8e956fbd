//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Pipeline errors arrive as [`DepotError`] and are mapped by variant tag to
//! an HTTP status and a JSON body:
//!
//! ```json
//! { "error": { "code": "NOT_FOUND", "message": "...", "statusCode": 404 } }
//! ```
//!
//! 500-class messages are replaced with a generic message; the cause is logged.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use depot_core::DepotError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// HTTP status, mirrored from the response status line.
    #[serde(rename = "statusCode")]
    pub status_code: u16,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or empty batch, non-string URI, too many files (400).
    #[error("{0}")]
    Validation(String),

    /// Unknown URI or missing blob (404).
    #[error("{0}")]
    NotFound(String),

    /// Stored bytes do not match the recorded digest (400).
    #[error("{0}")]
    Integrity(String),

    /// Request body could not be parsed (400).
    #[error("{0}")]
    BadRequest(String),

    /// A single upload exceeds the per-file size cap (413).
    #[error("{0}")]
    PayloadTooLarge(String),

    /// I/O failure in the content store (500). Message is logged, not returned.
    #[error("storage error: {0}")]
    Storage(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Integrity(_) => (StatusCode::BAD_REQUEST, "INTEGRITY_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            Self::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed with server error");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                status_code: status.as_u16(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<DepotError> for AppError {
    fn from(err: DepotError) -> Self {
        match err {
            DepotError::Validation(msg) => Self::Validation(msg),
            DepotError::NotFound(msg) => Self::NotFound(msg),
            DepotError::Integrity {
                uri,
                expected,
                actual,
            } => {
                tracing::warn!(%uri, %expected, %actual, "integrity check failed");
                Self::Integrity(format!("integrity check failed for {uri}"))
            }
            err @ DepotError::Storage { .. } => Self::Storage(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[test]
    fn status_codes() {
        let cases = [
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (AppError::Integrity("x".into()), StatusCode::BAD_REQUEST, "INTEGRITY_ERROR"),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            (
                AppError::PayloadTooLarge("x".into()),
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
            ),
            (
                AppError::Storage("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
            ),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status_and_code(), (status, code), "{err:?}");
        }
    }

    #[tokio::test]
    async fn body_mirrors_status() {
        let (status, body) = response_parts(AppError::NotFound("one or more files not found".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error.status_code, 404);
        assert_eq!(body.error.code, "NOT_FOUND");
        assert_eq!(body.error.message, "one or more files not found");
    }

    #[tokio::test]
    async fn body_uses_camel_case_status_field() {
        let response = AppError::Validation("empty".into()).into_response();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"]["statusCode"], 400);
        assert_eq!(json["error"]["message"], "empty");
    }

    #[tokio::test]
    async fn storage_errors_hide_details() {
        let err = AppError::from(DepotError::storage(
            "write blob",
            std::io::Error::new(std::io::ErrorKind::Other, "/srv/uploads: disk full"),
        ));
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.code, "STORAGE_ERROR");
        assert_eq!(body.error.message, "An internal error occurred");
        assert!(!body.error.message.contains("disk full"));
    }

    #[test]
    fn depot_errors_map_by_variant() {
        assert!(matches!(
            AppError::from(DepotError::Validation("v".into())),
            AppError::Validation(_)
        ));
        assert!(matches!(
            AppError::from(DepotError::NotFound("n".into())),
            AppError::NotFound(_)
        ));
        let integrity = AppError::from(DepotError::Integrity {
            uri: "/uploads/2024-01-01/a".into(),
            expected: "e".repeat(64),
            actual: "f".repeat(64),
        });
        match integrity {
            AppError::Integrity(msg) => {
                assert!(msg.contains("/uploads/2024-01-01/a"));
                // Digests stay in the logs.
                assert!(!msg.contains(&"e".repeat(64)));
            }
            other => panic!("expected Integrity, got {other:?}"),
        }
    }
}
