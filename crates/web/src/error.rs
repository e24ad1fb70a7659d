use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Failure responses of the progress API, rendered as `{ "error": ... }`.
#[derive(Debug)]
pub enum ApiError {
    InvalidJson,
    InvalidData(String),
    LoadFailed,
    SaveFailed,
    NotFound,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::InvalidJson => (
                StatusCode::BAD_REQUEST,
                json!({"error": "Invalid JSON body"}),
            ),
            ApiError::InvalidData(detail) => (
                StatusCode::BAD_REQUEST,
                json!({"error": "Invalid data format", "detail": detail}),
            ),
            ApiError::LoadFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": "Failed to load progress"}),
            ),
            ApiError::SaveFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": "Failed to save progress"}),
            ),
            ApiError::NotFound => (StatusCode::NOT_FOUND, json!({"error": "Not found"})),
        };
        (status, Json(body)).into_response()
    }
}
