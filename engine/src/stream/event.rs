use serde::{Deserialize, Serialize};

/// Client-visible lifecycle event (spec.md §4.7). Every event the executor
/// emits falls into exactly one of these eight kinds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Thread { thread_id: String },
    AgentStart { agent: String },
    Chunk { agent: String, content: String },
    AgentEnd { agent: String },
    Handoff { from: String, to: String },
    Tool { name: String, arg_digest: String, ok: bool },
    Error { agent: Option<String>, content: String },
    Done,
}

impl LifecycleEvent {
    /// `true` for the one kind the backpressure projector is allowed to drop
    /// under load; every other kind is a lifecycle event that must be
    /// preserved (spec.md §5: "drops oldest chunk events first while
    /// preserving lifecycle events").
    pub fn is_droppable(&self) -> bool {
        matches!(self, LifecycleEvent::Chunk { .. })
    }
}
