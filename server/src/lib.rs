//! HTTP surface for the orchestration engine: chat, streaming SSE, workflow,
//! thread/approval, and admin routes (spec.md §6).
//!
//! **Public API**: [`serve`], [`serve_on_listener`].

mod app;
mod config;
mod error;
mod metrics;
mod routes;

use tokio::net::TcpListener;
use tracing::info;

pub use app::{build_state, router, AppState};
pub use config::ServerConfig;
pub use metrics::Metrics;

/// Binds `config.bind_addr`, builds the app state and router, and serves
/// until the process is killed.
pub async fn serve(config: ServerConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(&config.bind_addr).await?;
    serve_on_listener(listener, config).await
}

/// Runs the server on an already-bound listener. Used by tests (bind to
/// `127.0.0.1:0`, then read back the ephemeral port before passing the
/// listener in).
pub async fn serve_on_listener(listener: TcpListener, config: ServerConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = listener.local_addr()?;
    let state = build_state(&config)?;
    let app = router(state);
    info!(%addr, "orchestrator server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
