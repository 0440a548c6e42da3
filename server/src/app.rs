//! Axum app: shared state and route table (spec.md §6 "HTTP surface").
//!
//! `AppState` behind an `Arc`, `Router::new().route(...).with_state(state)`,
//! covering the chat/streaming/workflow/thread/admin routes spec.md §6 names.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use engine::Executor;

use crate::config::ServerConfig;
use crate::metrics::Metrics;
use crate::routes;

pub struct AppState {
    pub executor: Arc<Executor>,
    pub metrics: Arc<Metrics>,
    pub api_key: Option<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/chat", post(routes::chat::chat))
        .route("/chat/stream", post(routes::chat::chat_stream))
        .route("/workflow/:name", post(routes::workflow::run_workflow))
        .route("/thread/:id", get(routes::thread::get_thread))
        .route("/thread/:id/approve", post(routes::thread::approve))
        .route("/state/:id", get(routes::thread::get_state))
        .route("/agents", get(routes::agents::list_agents))
        .route("/health", get(routes::health::health))
        .route("/metrics", get(routes::health::metrics_json))
        .route("/metrics/prometheus", get(routes::health::metrics_prometheus))
        .with_state(state)
}

/// Builds the `Executor` (and its `Arc<AppState>`) from process configuration:
/// agent/tool registries, primary and secondary LLM gateways, and the
/// checkpoint store (spec.md §6 "Configuration").
pub fn build_state(config: &ServerConfig) -> Result<Arc<AppState>, Box<dyn std::error::Error + Send + Sync>> {
    use engine::agents::AgentRegistry;
    use engine::llm::{LlmGateway, OpenAiProvider};
    use engine::memory::{Checkpointer, SqliteSaver};
    use engine::tools::{GlobTool, GrepTool, HttpFetchTool, ListDirTool, ReadFileTool, ShellTool, TestRunnerTool, ToolRegistry, WriteFileTool};

    std::fs::create_dir_all(&config.workspace_root)?;

    let registry = Arc::new(AgentRegistry::with_builtin_team()?);
    if let Some(plugin_dir) = &config.plugin_dir {
        match registry.load_plugins(plugin_dir) {
            Ok(count) => tracing::info!(count, dir = %plugin_dir.display(), "loaded plugin agents"),
            Err(err) => tracing::warn!(error = %err, dir = %plugin_dir.display(), "failed to load plugin directory"),
        }
    }

    let tools = Arc::new(ToolRegistry::new());
    tools.register(Arc::new(ReadFileTool));
    tools.register(Arc::new(WriteFileTool));
    tools.register(Arc::new(ListDirTool));
    tools.register(Arc::new(GlobTool));
    tools.register(Arc::new(GrepTool));
    tools.register(Arc::new(ShellTool));
    tools.register(Arc::new(HttpFetchTool::new()));
    tools.register(Arc::new(TestRunnerTool::new()));

    let metrics = Metrics::new();

    let primary = Arc::new(
        LlmGateway::new(Arc::new(OpenAiProvider::new(config.primary_model.clone())))
            .with_usage_recorder(metrics.clone())
            .with_llm_timeout(config.llm_timeout),
    );
    let secondary = Arc::new(
        LlmGateway::new(Arc::new(OpenAiProvider::new(config.secondary_model.clone())))
            .with_usage_recorder(metrics.clone())
            .with_llm_timeout(config.llm_timeout),
    );

    let checkpointer: Arc<dyn Checkpointer> = Arc::new(SqliteSaver::new(&config.checkpoint_db_path)?);

    let executor = Arc::new(Executor::new(registry, tools, primary, secondary, checkpointer, config.executor.clone())?);

    Ok(Arc::new(AppState { executor, metrics, api_key: config.api_key.clone() }))
}
