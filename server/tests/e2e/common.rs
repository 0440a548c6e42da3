//! Shared helpers for e2e tests: spin up a real server on an ephemeral port,
//! backed by a scripted [`MockProvider`] so no network call ever leaves the
//! process.

use std::sync::Arc;

use engine::agents::{AgentEntry, AgentRegistry};
use engine::llm::{LlmGateway, MockProvider};
use engine::memory::{Checkpointer, MemorySaver};
use engine::tools::ToolRegistry;
use engine::{Executor, ExecutorConfig};
use server::{router, AppState};
use tokio::net::TcpListener;

/// Registers a single `Builder` agent, enough to exercise the Router →
/// Builder → Router → FINISH path without pulling in the full thirteen-agent
/// team (mirrors `engine::executor::tests::registry_with_builder_only`).
fn registry_with_builder_only() -> Arc<AgentRegistry> {
    let registry = Arc::new(AgentRegistry::new());
    registry.register(AgentEntry::new("Builder", "builds things", "system prompt", "mock")).unwrap();
    registry
}

/// Binds an ephemeral port, builds an `AppState` around `primary` (the
/// Router's and every agent's gateway), and spawns the server. Returns the
/// base URL and the server task's join handle.
pub async fn spawn_test_server(primary: MockProvider) -> (String, tokio::task::JoinHandle<()>) {
    spawn_test_server_with_config(primary, ExecutorConfig::default()).await
}

/// Same as [`spawn_test_server`] but with a caller-supplied `ExecutorConfig`
/// (e.g. a lowered `max_turns` for the turn-ceiling scenario).
pub async fn spawn_test_server_with_config(primary: MockProvider, config: ExecutorConfig) -> (String, tokio::task::JoinHandle<()>) {
    let registry = registry_with_builder_only();
    let tools = Arc::new(ToolRegistry::new());
    let primary = Arc::new(LlmGateway::new(Arc::new(primary)));
    let secondary = Arc::new(LlmGateway::new(Arc::new(MockProvider::new("secondary"))));
    let checkpointer: Arc<dyn Checkpointer> = Arc::new(MemorySaver::new());
    let executor = Arc::new(Executor::new(registry, tools, primary, secondary, checkpointer, config).unwrap());
    let state = Arc::new(AppState {
        executor,
        metrics: server::Metrics::new(),
        api_key: None,
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(state);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), handle)
}
