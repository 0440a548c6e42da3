//! `POST /workflow/{name}`: runs one named subgraph (`strategy`, `design`,
//! `build`, `ship`) to completion with no Router decision between its
//! member agents (spec.md §6, §4.6).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use engine::stream::StreamWriter;

use crate::app::AppState;
use crate::error::ApiError;
use crate::routes::chat::{ChatRequest, ChatResponse};

pub async fn run_workflow(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.metrics.record_request();
    let result = state.executor.run_workflow(&name, req.message, StreamWriter::noop()).await?;
    Ok(Json(ChatResponse::from(result)))
}
