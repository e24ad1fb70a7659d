use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use serde_json::{Value, json};
use tracing::{error, warn};

use progress_core::ProgressDocument;

use crate::WebState;
use crate::error::ApiError;

pub(crate) async fn get_progress(
    State(state): State<WebState>,
) -> Result<Json<ProgressDocument>, ApiError> {
    match state.progress.load().await {
        Ok(document) => Ok(Json(document)),
        Err(err) => {
            error!(error = %err, "failed to load progress");
            Err(ApiError::LoadFailed)
        }
    }
}

pub(crate) async fn post_progress(
    State(state): State<WebState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let value: Value = serde_json::from_slice(&body).map_err(|err| {
        warn!(error = %err, "rejected progress update with invalid JSON");
        ApiError::InvalidJson
    })?;

    match state.progress.record(value).await {
        Ok(_) => Ok(Json(json!({"success": true}))),
        Err(err) if err.is_validation() => {
            warn!(error = %err, "rejected progress update");
            Err(ApiError::InvalidData(err.to_string()))
        }
        Err(err) => {
            error!(error = %err, "failed to save progress");
            Err(ApiError::SaveFailed)
        }
    }
}
