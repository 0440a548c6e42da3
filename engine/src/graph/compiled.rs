use std::collections::HashMap;
use std::sync::Arc;

use super::conditional::NextEntry;
use super::node::Node;
use super::retry::RetryPolicy;
use super::run_context::RunContext;
use super::state_graph::END;
use crate::channels::{ConversationStateUpdater, StateUpdater};
use crate::error::ExecutorError;
use crate::memory::Checkpointer;
use crate::state::ConversationState;

/// A validated, runnable node/edge table. Produced only by
/// [`super::StateGraph::compile`].
///
/// [`Node::run`] never returns routing information at all (see `graph::node`'s
/// doc comment), so [`Self::step`] exposes one super-step at a time —
/// `next_map` always decides — and the outer run-to-completion loop,
/// checkpointing, and event emission live in [`crate::executor`], which also
/// owns the safety envelope this graph knows nothing about.
pub struct CompiledStateGraph {
    nodes: HashMap<String, Arc<dyn Node>>,
    first_node_id: String,
    next_map: HashMap<String, NextEntry>,
    checkpointer: Option<Arc<dyn Checkpointer>>,
    retry_policy: RetryPolicy,
    updater: ConversationStateUpdater,
}

impl CompiledStateGraph {
    pub(super) fn new(
        nodes: HashMap<String, Arc<dyn Node>>,
        first_node_id: String,
        next_map: HashMap<String, NextEntry>,
        checkpointer: Option<Arc<dyn Checkpointer>>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self { nodes, first_node_id, next_map, checkpointer, retry_policy, updater: ConversationStateUpdater }
    }

    pub fn first_node_id(&self) -> &str {
        &self.first_node_id
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn checkpointer(&self) -> Option<&Arc<dyn Checkpointer>> {
        self.checkpointer.as_ref()
    }

    async fn run_node_with_retry(
        &self,
        node: &Arc<dyn Node>,
        state: &ConversationState,
        ctx: &RunContext,
    ) -> Result<crate::state::ConversationDelta, ExecutorError> {
        let mut attempt = 0usize;
        loop {
            match node.run_with_context(state, ctx).await {
                Ok(delta) => return Ok(delta),
                Err(err) => {
                    if !self.retry_policy.should_retry(attempt) {
                        return Err(err);
                    }
                    let delay = self.retry_policy.delay(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Runs exactly one super-step: looks up `current_id`'s node, runs it
    /// (retrying per the configured [`RetryPolicy`] on failure), merges the
    /// resulting delta into `state`, then resolves the next node id by
    /// consulting `next_map` for `current_id` — never by anything the node
    /// itself returned (spec.md §4.6: "routing after a node runs is decided
    /// by reading state through a conditional edge").
    ///
    /// Returns `Ok(None)` once the resolved next id is the `END` sentinel,
    /// `Ok(Some(next_id))` otherwise.
    pub async fn step(
        &self,
        current_id: &str,
        state: &mut ConversationState,
        ctx: &RunContext,
    ) -> Result<Option<String>, ExecutorError> {
        let node = self
            .nodes
            .get(current_id)
            .cloned()
            .ok_or_else(|| ExecutorError::UnknownAgent(current_id.to_string()))?;

        let delta = self.run_node_with_retry(&node, state, ctx).await?;
        self.updater.apply_update(state, delta);

        let next_id = match self.next_map.get(current_id) {
            Some(NextEntry::Unconditional(to)) => to.clone(),
            Some(NextEntry::Conditional(router)) => router.resolve_next(state),
            None => {
                return Err(ExecutorError::NodeFailed(format!(
                    "node `{current_id}` has no routing entry"
                )))
            }
        };

        if next_id == END {
            Ok(None)
        } else {
            Ok(Some(next_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::super::state_graph::StateGraph;
    use super::*;
    use crate::message::Message;
    use crate::state::{ConversationDelta, Decision};
    use crate::stream::StreamWriter;

    struct Echo(&'static str);

    #[async_trait]
    impl Node for Echo {
        fn id(&self) -> &str {
            self.0
        }
        async fn run(&self, _state: &ConversationState) -> Result<ConversationDelta, ExecutorError> {
            Ok(ConversationDelta::agent_reply(self.0, "ok"))
        }
    }

    struct FlakyThenOk {
        failures_left: AtomicUsize,
    }

    #[async_trait]
    impl Node for FlakyThenOk {
        fn id(&self) -> &str {
            "Flaky"
        }
        async fn run(&self, _state: &ConversationState) -> Result<ConversationDelta, ExecutorError> {
            if self.failures_left.fetch_sub(1, Ordering::SeqCst) > 0 {
                Err(ExecutorError::NodeFailed("not yet".into()))
            } else {
                Ok(ConversationDelta::agent_reply("Flaky", "recovered"))
            }
        }
    }

    fn ctx() -> RunContext {
        RunContext::new("t1", StreamWriter::noop())
    }

    fn fresh_state() -> ConversationState {
        ConversationState::new("t1", Message::user("hi"))
    }

    #[tokio::test]
    async fn single_step_linear_graph_reaches_end() {
        let compiled = StateGraph::new().add_node(Arc::new(Echo("A"))).set_start("A").add_edge("A", END).compile().unwrap();
        let mut state = fresh_state();
        let next = compiled.step("A", &mut state, &ctx()).await.unwrap();
        assert_eq!(next, None);
        assert_eq!(state.messages.len(), 2);
    }

    #[tokio::test]
    async fn conditional_edge_resolves_from_state() {
        let compiled = StateGraph::new()
            .add_node(Arc::new(Echo("Router")))
            .add_node(Arc::new(Echo("Builder")))
            .set_start("Router")
            .add_conditional_edge("Router", Arc::new(|s: &ConversationState| s.next.to_string()), None)
            .add_edge("Builder", END)
            .compile()
            .unwrap();

        let mut state = fresh_state();
        state.next = Decision::Named("Builder".into());
        let next = compiled.step("Router", &mut state, &ctx()).await.unwrap();
        assert_eq!(next.as_deref(), Some("Builder"));

        let next = compiled.step("Builder", &mut state, &ctx()).await.unwrap();
        assert_eq!(next, None);
    }

    #[tokio::test]
    async fn unknown_current_id_is_reported() {
        let compiled = StateGraph::new().add_node(Arc::new(Echo("A"))).set_start("A").add_edge("A", END).compile().unwrap();
        let mut state = fresh_state();
        let err = compiled.step("Ghost", &mut state, &ctx()).await.unwrap_err();
        assert!(matches!(err, ExecutorError::UnknownAgent(_)));
    }

    #[tokio::test]
    async fn retry_policy_recovers_a_transient_failure() {
        let node = Arc::new(FlakyThenOk { failures_left: AtomicUsize::new(2) });
        let compiled = StateGraph::new()
            .add_node(node)
            .set_start("Flaky")
            .add_edge("Flaky", END)
            .with_retry_policy(RetryPolicy::fixed(3, std::time::Duration::ZERO))
            .compile()
            .unwrap();
        let mut state = fresh_state();
        let next = compiled.step("Flaky", &mut state, &ctx()).await.unwrap();
        assert_eq!(next, None);
        assert!(state.messages.iter().any(|m| m.content == "recovered"));
    }

    #[tokio::test]
    async fn retry_policy_exhausted_propagates_the_error() {
        let node = Arc::new(FlakyThenOk { failures_left: AtomicUsize::new(10) });
        let compiled = StateGraph::new()
            .add_node(node)
            .set_start("Flaky")
            .add_edge("Flaky", END)
            .with_retry_policy(RetryPolicy::fixed(2, std::time::Duration::ZERO))
            .compile()
            .unwrap();
        let mut state = fresh_state();
        let err = compiled.step("Flaky", &mut state, &ctx()).await.unwrap_err();
        assert!(matches!(err, ExecutorError::NodeFailed(_)));
    }
}
