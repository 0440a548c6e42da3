use async_trait::async_trait;

use crate::error::ExecutorError;
use crate::state::{ConversationDelta, ConversationState};

use super::RunContext;

/// One step in the graph: reads the current conversation state, returns a
/// delta to merge (spec.md §4.2's agent-handler contract: "a partial-state
/// update containing at minimum one or more new Messages... and optionally
/// artifacts, tool-call outcomes, or self-loop fields").
///
/// Every node in this graph is concrete over [`ConversationState`], and
/// routing after a node runs is always decided by reading the merged state
/// (`state.next`, `needs_retry`) through a conditional edge, never by the node
/// itself, so there is no `Next`-style return value to carry.
#[async_trait]
pub trait Node: Send + Sync {
    /// Node id (e.g. an agent name, or `"Router"`). Must be unique within a graph.
    fn id(&self) -> &str;

    async fn run(&self, state: &ConversationState) -> Result<ConversationDelta, ExecutorError>;

    /// Optional variant with run context (streaming). Default ignores the context.
    async fn run_with_context(
        &self,
        state: &ConversationState,
        _ctx: &RunContext,
    ) -> Result<ConversationDelta, ExecutorError> {
        self.run(state).await
    }
}
