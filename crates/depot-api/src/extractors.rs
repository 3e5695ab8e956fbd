//! # Extraction Helpers
//!
//! Map axum's JSON and multipart rejections onto [`AppError`] so handlers can
//! take `Result<_, Rejection>` and stay in the structured error format.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;

use crate::error::AppError;

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
///
/// ```ignore
/// async fn handler(body: Result<Json<T>, JsonRejection>) -> Result<..., AppError> {
///     let req = extract_json(body)?;
/// }
/// ```
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Non-multipart request to the upload route.
pub fn multipart_rejection(err: MultipartRejection) -> AppError {
    AppError::BadRequest(err.body_text())
}

/// Failure while streaming multipart fields. A body that hit the route's
/// size limit surfaces as 413 rather than a generic parse error.
pub fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("request body exceeds the upload limit".to_string())
    } else {
        AppError::BadRequest(err.body_text())
    }
}
