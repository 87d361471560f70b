use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;
use thiserror::Error;

/// API-level errors with the exact response bodies the endpoints promise.
///
/// Task creation reports structured `{error: {code, message}}` objects;
/// the read/patch/delete/media endpoints report flat `{error: "..."}`
/// strings. Media validation failures always render as not-found so the
/// response never distinguishes forbidden from missing.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidUrl(String),
    #[error("Invalid task ID")]
    InvalidId,
    #[error("payload invalid: {0}")]
    InvalidPayload(String),
    #[error("payload too large: {0} bytes")]
    PayloadTooLarge(usize),
    #[error("Task not found")]
    TaskNotFound,
    #[error("Not found")]
    MediaNotFound,
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidId => StatusCode::BAD_REQUEST,
            ApiError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::TaskNotFound => StatusCode::NOT_FOUND,
            ApiError::MediaNotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = match &self {
            // Structured error object for the creation endpoint
            ApiError::InvalidUrl(message) => json!({
                "error": { "code": "INVALID_URL", "message": message }
            }),
            // Flat strings everywhere else
            ApiError::InvalidId => json!({ "error": "Invalid task ID" }),
            ApiError::InvalidPayload(_) => json!({ "error": "Invalid payload" }),
            ApiError::PayloadTooLarge(_) => json!({ "error": "Payload too large" }),
            ApiError::TaskNotFound => json!({ "error": "Task not found" }),
            ApiError::MediaNotFound => json!({ "error": "Not found" }),
            ApiError::Internal(message) => json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}
