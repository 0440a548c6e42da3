use std::sync::Arc;

use super::bus::EventBus;
use super::event::LifecycleEvent;

/// Convenience façade over an [`EventBus`]: one emit method per event kind,
/// covering the eight lifecycle kinds spec.md names, always-on (no per-mode
/// gating — every event kind is emitted unconditionally).
#[derive(Clone)]
pub struct StreamWriter {
    bus: Option<Arc<EventBus>>,
}

impl StreamWriter {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus: Some(bus) }
    }

    /// A writer with no backing bus; every emit is a no-op. Used when a run
    /// has no subscribed client.
    pub fn noop() -> Self {
        Self { bus: None }
    }

    async fn emit(&self, event: LifecycleEvent) {
        if let Some(bus) = &self.bus {
            bus.publish(event).await;
        }
    }

    pub async fn thread(&self, thread_id: impl Into<String>) {
        self.emit(LifecycleEvent::Thread { thread_id: thread_id.into() }).await;
    }

    pub async fn agent_start(&self, agent: impl Into<String>) {
        self.emit(LifecycleEvent::AgentStart { agent: agent.into() }).await;
    }

    pub async fn chunk(&self, agent: impl Into<String>, content: impl Into<String>) {
        self.emit(LifecycleEvent::Chunk { agent: agent.into(), content: content.into() }).await;
    }

    pub async fn agent_end(&self, agent: impl Into<String>) {
        self.emit(LifecycleEvent::AgentEnd { agent: agent.into() }).await;
    }

    pub async fn handoff(&self, from: impl Into<String>, to: impl Into<String>) {
        self.emit(LifecycleEvent::Handoff { from: from.into(), to: to.into() }).await;
    }

    /// `name` is the tool's name; `arg_digest` a short hash of its call
    /// arguments (spec.md §4.7 `tool { name, arg_digest, ok }`); `ok` whether
    /// the call completed without raising a `ToolError`.
    pub async fn tool(&self, name: impl Into<String>, arg_digest: impl Into<String>, ok: bool) {
        self.emit(LifecycleEvent::Tool { name: name.into(), arg_digest: arg_digest.into(), ok }).await;
    }

    pub async fn error(&self, agent: Option<String>, content: impl Into<String>) {
        self.emit(LifecycleEvent::Error { agent, content: content.into() }).await;
    }

    pub async fn done(&self) {
        self.emit(LifecycleEvent::Done).await;
    }
}
