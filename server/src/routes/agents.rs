//! `GET /agents`: the current registry roster, built-in team plus any
//! loaded plugins (spec.md §4.1, §6).

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::app::AppState;

#[derive(Debug, Serialize)]
pub struct AgentSummary {
    pub name: String,
    pub role_description: String,
    pub is_plugin: bool,
}

pub async fn list_agents(State(state): State<Arc<AppState>>) -> Json<Vec<AgentSummary>> {
    let registry = state.executor.registry();
    let mut agents: Vec<AgentSummary> = registry
        .all_entries()
        .into_iter()
        .map(|e| AgentSummary {
            name: e.name,
            role_description: e.role_description,
            is_plugin: e.is_plugin,
        })
        .collect();
    agents.sort_by(|a, b| a.name.cmp(&b.name));
    Json(agents)
}
