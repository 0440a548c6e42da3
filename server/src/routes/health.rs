//! `GET /health`, `GET /metrics`, `GET /metrics/prometheus` (spec.md §6).

use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::app::AppState;

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn metrics_json(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(state.metrics.snapshot(&state.executor))
}

pub async fn metrics_prometheus(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state.metrics.render_prometheus(&state.executor);
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}
