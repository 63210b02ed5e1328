use loom_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("core error: {0}")]
    Core(CoreError),
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::TargetNotFound(target) => ApiError::TaskNotFound(target),
            CoreError::Config(e) => ApiError::InvalidRequest(e.to_string()),
            CoreError::Model(e) => ApiError::InvalidRequest(e.to_string()),
            other => ApiError::Core(other),
        }
    }
}

#[cfg(feature = "http")]
impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        use axum::{Json, http::StatusCode};

        let (status, kind) = match &self {
            ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            ApiError::TaskNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Core(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        if status.is_server_error() {
            tracing::error!(target: "loom.api", error = %self, "request failed");
        } else {
            tracing::debug!(target: "loom.api", error = %self, "request rejected");
        }

        let body = serde_json::json!({
            "error": {
                "message": self.to_string(),
                "type": kind,
            }
        });
        (status, Json(body)).into_response()
    }
}
