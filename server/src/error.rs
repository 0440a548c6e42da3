//! Maps `ExecutorError` onto HTTP status codes per spec.md §7's error-handling
//! design: `ThreadBusy` is the one variant spec.md pins to a specific status
//! (409); everything else is grouped by what an HTTP client can actually do
//! about it (its own bad input vs. an engine-internal failure).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use engine::ExecutorError;
use serde_json::json;

pub struct ApiError(pub ExecutorError);

impl From<ExecutorError> for ApiError {
    fn from(err: ExecutorError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            ExecutorError::ThreadBusy => (StatusCode::CONFLICT, self.0.to_string()),
            ExecutorError::UnknownAgent(_) => (StatusCode::NOT_FOUND, self.0.to_string()),
            ExecutorError::NodeFailed(_) => (StatusCode::BAD_REQUEST, self.0.to_string()),
            ExecutorError::SafetyTripped(_) => (StatusCode::OK, self.0.to_string()),
            ExecutorError::Compilation(_)
            | ExecutorError::Checkpoint(_)
            | ExecutorError::Gateway(_)
            | ExecutorError::Tool(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
