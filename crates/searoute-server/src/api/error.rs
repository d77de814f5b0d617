use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use searoute_core::{InputError, NeedMorePoints};
use serde_json::json;
use thiserror::Error;

/// Handler failures and the status each maps to.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    NeedMorePoints(#[from] NeedMorePoints),

    #[error("invalid request body: {0}")]
    Body(String),

    #[error("segment {0} not found")]
    NotFound(String),

    /// Save did not commit; the prior active version still stands.
    #[error("save failed: {0:#}")]
    SaveFailed(anyhow::Error),

    #[error("storage read failed: {0:#}")]
    Storage(anyhow::Error),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body(rejection.body_text())
    }
}

fn bad_request(message: &str, field: Option<&str>) -> (StatusCode, Json<serde_json::Value>) {
    let mut payload = json!({ "error": message });
    if let Some(field) = field {
        payload["field"] = serde_json::Value::String(field.to_string());
    }
    (StatusCode::BAD_REQUEST, Json(payload))
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Input(err) => bad_request(&err.to_string(), Some(err.field())).into_response(),
            ApiError::Body(message) => bad_request(&message, None).into_response(),
            ApiError::NeedMorePoints(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "error": "need more points",
                    "required": err.required,
                    "actual": err.actual,
                })),
            )
                .into_response(),
            ApiError::NotFound(segment_id) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("segment {} not found", segment_id) })),
            )
                .into_response(),
            ApiError::SaveFailed(err) => {
                tracing::error!("Segment save failed: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "failed to save segment, the previous version is unchanged" })),
                )
                    .into_response()
            }
            ApiError::Storage(err) => {
                tracing::error!("Segment read failed: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "failed to read segment" })),
                )
                    .into_response()
            }
        }
    }
}
