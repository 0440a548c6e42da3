//! `GET /thread/{id}`, `GET /state/{id}` (read the latest checkpointed
//! state) and `POST /thread/{id}/approve` (resume a thread suspended on
//! human approval), spec.md §6.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use engine::stream::StreamWriter;
use serde::Deserialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::routes::chat::ChatResponse;

pub async fn get_thread(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<impl IntoResponse, ApiError> {
    match state.executor.latest_state(&id).await? {
        Some(s) => Ok(Json(ChatResponse::from(s)).into_response()),
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

/// `GET /state/{id}`: the raw, unfiltered checkpointed [`engine::ConversationState`]
/// (spec.md §6 "raw state dump for debugging"), as opposed to `/thread/{id}`'s
/// narrower `ChatResponse` projection (history, contributors, phase).
pub async fn get_state(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<impl IntoResponse, ApiError> {
    match state.executor.latest_state(&id).await? {
        Some(s) => Ok(Json(s).into_response()),
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub approved: bool,
}

pub async fn approve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ApproveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.metrics.record_request();
    let result = state.executor.approve(&id, req.approved, StreamWriter::noop()).await?;
    Ok(Json(ChatResponse::from(result)))
}
