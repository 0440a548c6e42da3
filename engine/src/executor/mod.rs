//! The Graph Executor (spec.md §4.6): wires the Router, one node per
//! registered agent, and Builder's self-loop edge into a single
//! [`crate::graph::CompiledStateGraph`]; drives a thread's conversation to
//! completion (or to the next suspension point) one super-step at a time;
//! owns checkpointing and the per-thread single-holder lock (spec.md §5).
//!
//! The run loop is select node, run it, merge, checkpoint, emit events,
//! repeat, with a per-thread task-spawn/lock shape for the concurrency
//! discipline spec.md §5 requires ("a map of thread id -> mutex, acquired at
//! request entry and released at checkpoint commit").

mod hierarchical;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex as AsyncMutex;

pub use hierarchical::{DispatcherNode, SupervisorNode, SynthesizerNode};

use crate::agents::{AgentNode, AgentRegistry};
use crate::error::ExecutorError;
use crate::graph::{CompiledStateGraph, Node, RunContext, StateGraph, END};
use crate::llm::LlmGateway;
use crate::memory::{Checkpoint, Checkpointer};
use crate::message::Message;
use crate::router::{Router, RouterLevelCounts, NODE_ID as ROUTER_NODE_ID};
use crate::safety::CircuitBreaker;
use crate::state::{ConversationState, Decision};
use crate::stream::StreamWriter;
use crate::tools::ToolRegistry;

/// The one node spec.md names as owning a self-loop edge (spec.md §1, §4.6).
pub const BUILDER_NODE_ID: &str = "Builder";

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub workspace_root: PathBuf,
    pub max_turns: u32,
    pub max_retries: u32,
    pub max_tool_iterations: usize,
    pub circuit_threshold: u32,
    pub circuit_cooldown: Duration,
    /// Independent per-tool-call deadline (spec.md §5 "Timeouts"), applied to
    /// every [`crate::tools::ToolCallContext`] the executor hands to an
    /// [`AgentNode`].
    pub tool_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("."),
            max_turns: 50,
            max_retries: 3,
            max_tool_iterations: 8,
            circuit_threshold: 3,
            circuit_cooldown: Duration::from_secs(60),
            tool_timeout: Duration::from_secs(30),
        }
    }
}

/// Drives conversations through the fixed node/edge table spec.md §4.6
/// describes. One `Executor` is built once per process (or once per plugin
/// reload) and shared behind an `Arc` by every HTTP handler.
pub struct Executor {
    registry: Arc<AgentRegistry>,
    checkpointer: Arc<dyn Checkpointer>,
    compiled: CompiledStateGraph,
    thread_locks: DashMap<String, Arc<AsyncMutex<()>>>,
    circuit_breaker: Arc<CircuitBreaker>,
    router_levels: Arc<RouterLevelCounts>,
}

impl Executor {
    pub fn new(
        registry: Arc<AgentRegistry>,
        tools: Arc<ToolRegistry>,
        primary_gateway: Arc<LlmGateway>,
        secondary_gateway: Arc<LlmGateway>,
        checkpointer: Arc<dyn Checkpointer>,
        config: ExecutorConfig,
    ) -> Result<Self, ExecutorError> {
        let circuit_breaker = Arc::new(CircuitBreaker::new(config.circuit_threshold, config.circuit_cooldown));
        let router = Arc::new(
            Router::new(registry.clone(), primary_gateway.clone(), secondary_gateway.clone(), circuit_breaker.clone())
                .with_max_turns(config.max_turns),
        );
        let router_levels = router.levels.clone();

        let mut builder = StateGraph::new()
            .add_node(router.clone() as Arc<dyn Node>)
            .set_start(ROUTER_NODE_ID)
            .add_conditional_edge(
                ROUTER_NODE_ID,
                Arc::new(|s: &ConversationState| {
                    if s.next.is_finish() {
                        END.to_string()
                    } else {
                        s.next.to_string()
                    }
                }),
                None,
            );

        for entry in registry.all_entries() {
            let name = entry.name.clone();
            let node = Arc::new(
                AgentNode::new(entry, primary_gateway.clone(), tools.clone(), config.workspace_root.clone())
                    .with_max_tool_iterations(config.max_tool_iterations)
                    .with_max_retries(config.max_retries)
                    .with_tool_timeout(config.tool_timeout),
            );
            builder = builder.add_node(node as Arc<dyn Node>);

            if name == BUILDER_NODE_ID {
                let loop_id = name.clone();
                builder = builder.add_conditional_edge(
                    &name,
                    Arc::new(move |s: &ConversationState| {
                        if s.needs_retry {
                            loop_id.clone()
                        } else {
                            ROUTER_NODE_ID.to_string()
                        }
                    }),
                    None,
                );
            } else {
                builder = builder.add_edge(&name, ROUTER_NODE_ID);
            }
        }

        let compiled = builder.compile()?;

        Ok(Self {
            registry,
            checkpointer,
            compiled,
            thread_locks: DashMap::new(),
            circuit_breaker,
            router_levels,
        })
    }

    pub fn agent_names(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn checkpointer(&self) -> &Arc<dyn Checkpointer> {
        &self.checkpointer
    }

    pub fn circuit_breaker(&self) -> &Arc<CircuitBreaker> {
        &self.circuit_breaker
    }

    /// `[l0, l1, l2, l3]` Router fallback-level invocation counts, surfaced
    /// through `GET /metrics` (spec.md §6).
    pub fn router_level_counts(&self) -> [u64; 4] {
        self.router_levels.snapshot()
    }

    fn lock_for(&self, thread_id: &str) -> Arc<AsyncMutex<()>> {
        self.thread_locks
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Reads the merged conversation history for `thread_id` without running
    /// a step; backs `GET /thread/{id}` and `GET /state/{id}` (spec.md §6).
    pub async fn latest_state(&self, thread_id: &str) -> Result<Option<ConversationState>, ExecutorError> {
        Ok(self.checkpointer.latest(thread_id).await?.map(|cp| cp.state))
    }

    /// Merges a human approval decision into the thread's state and resumes
    /// the run from wherever it was waiting (`POST /thread/{id}/approve`,
    /// spec.md §6). `requires_approval`/`approval_status` are ordinary
    /// checkpointed fields (DESIGN.md Open Question #1), so this is just
    /// another `run` entered with no new user message.
    pub async fn approve(&self, thread_id: &str, approved: bool, stream: StreamWriter) -> Result<ConversationState, ExecutorError> {
        {
            let existing = self
                .checkpointer
                .latest(thread_id)
                .await?
                .ok_or_else(|| ExecutorError::UnknownAgent(thread_id.to_string()))?;
            let mut state = existing.state;
            state.approval_status = Some(approved);
            state.requires_approval = false;
            self.checkpointer
                .put(&Checkpoint::new(thread_id, existing.step + 1, state))
                .await?;
        }
        self.run(Some(thread_id.to_string()), None, stream).await
    }

    /// Runs `thread_id` (creating it if absent) to completion: loops
    /// super-steps until the Router (or Builder's self-loop exit) resolves to
    /// `END`, checkpointing after every step and emitting the lifecycle
    /// events of spec.md §4.7.
    ///
    /// `message` is the new user input. `None` resumes an existing thread
    /// with no new input (e.g. after an approval, or reconnecting to a crash
    /// mid-run per spec.md §8 S6) by re-entering the node named by the
    /// thread's last `next` decision rather than the Router.
    pub async fn run(&self, thread_id: Option<String>, message: Option<String>, stream: StreamWriter) -> Result<ConversationState, ExecutorError> {
        let thread_id = thread_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let lock = self.lock_for(&thread_id);
        let _guard = lock.try_lock().map_err(|_| ExecutorError::ThreadBusy)?;

        let existing = self.checkpointer.latest(&thread_id).await?;
        let (mut state, mut step, mut current_node) = match existing {
            Some(cp) => {
                let mut resumed = cp.state;
                let mut current = if resumed.next.is_finish() {
                    self.compiled.first_node_id().to_string()
                } else {
                    resumed
                        .next
                        .agent_name()
                        .map(str::to_string)
                        .unwrap_or_else(|| self.compiled.first_node_id().to_string())
                };
                if let Some(text) = message {
                    resumed.messages.push(Message::user(text));
                    current = self.compiled.first_node_id().to_string();
                }
                (resumed, cp.step + 1, current)
            }
            None => {
                let text = message.ok_or(ExecutorError::NodeFailed(
                    "a new thread requires an opening user message".to_string(),
                ))?;
                (
                    ConversationState::new(thread_id.clone(), Message::user(text)),
                    0,
                    self.compiled.first_node_id().to_string(),
                )
            }
        };

        stream.thread(thread_id.clone()).await;
        let ctx = RunContext::new(thread_id.clone(), stream);

        loop {
            let from_router = current_node == self.compiled.first_node_id();
            match self.compiled.step(&current_node, &mut state, &ctx).await {
                Ok(next) => {
                    self.record_outcome(&current_node, &state);
                    self.checkpointer.put(&Checkpoint::new(&thread_id, step, state.clone())).await?;
                    step += 1;
                    if from_router {
                        if let Decision::Named(name) = &state.next {
                            ctx.stream.handoff(self.compiled.first_node_id(), name.clone()).await;
                        }
                    }
                    match next {
                        Some(id) => current_node = id,
                        None => break,
                    }
                }
                Err(err) => {
                    self.circuit_breaker.record_failure(&current_node);
                    ctx.stream.error(Some(current_node.clone()), err.to_string()).await;
                    state.messages.push(Message::system_error(err.to_string()));
                    self.checkpointer.put(&Checkpoint::new(&thread_id, step, state.clone())).await?;
                    break;
                }
            }
        }

        ctx.stream.done().await;
        Ok(state)
    }

    /// Updates the circuit breaker for `node_id` after a successful
    /// super-step: a node that surrendered (ceiling reached, spec.md §4.5)
    /// counts as a failure even though it returned `Ok`; anything else that
    /// ran without raising counts as a success and closes the breaker.
    fn record_outcome(&self, node_id: &str, state: &ConversationState) {
        if node_id == self.compiled.first_node_id() {
            return;
        }
        let surrendered = state
            .last_error
            .as_deref()
            .is_some_and(|e| e.contains("surrendered"));
        if surrendered {
            self.circuit_breaker.record_failure(node_id);
        } else {
            self.circuit_breaker.record_success(node_id);
        }
    }
}

/// Convenience alias used by `server` to describe a named subgraph run
/// (`POST /workflow/{strategy|design|build|ship}`, spec.md §6): a fixed
/// ordered list of agent names run in sequence with no Router involved.
pub type WorkflowStages = HashMap<&'static str, &'static [&'static str]>;

/// The four named workflow subgraphs. Each runs its member agents in a fixed
/// order with no Router decision between them (spec.md §6: "runs one named
/// subgraph only (no Router)").
pub fn workflow_stage_agents(name: &str) -> Option<&'static [&'static str]> {
    match name {
        "strategy" => Some(&["ProductManager", "Strategist", "Analyst"]),
        "design" => Some(&["Designer", "Architect", "UXResearcher"]),
        "build" => Some(&["Builder", "Security", "QA"]),
        "ship" => Some(&["SRE", "DevOps", "TechnicalWriter"]),
        _ => None,
    }
}

impl Executor {
    /// Runs one named workflow subgraph to completion with no Router
    /// decision between stages (spec.md §6 `POST /workflow/{name}`): each
    /// listed agent runs once, in order, against the accumulating state.
    pub async fn run_workflow(&self, workflow: &str, message: String, stream: StreamWriter) -> Result<ConversationState, ExecutorError> {
        let stage_agents = workflow_stage_agents(workflow)
            .ok_or_else(|| ExecutorError::UnknownAgent(workflow.to_string()))?;

        let thread_id = uuid::Uuid::new_v4().to_string();
        let mut state = ConversationState::new(thread_id.clone(), Message::user(message));
        stream.thread(thread_id.clone()).await;
        let ctx = RunContext::new(thread_id.clone(), stream);

        for agent in stage_agents {
            if !self.compiled.contains_node(agent) {
                continue;
            }
            match self.compiled.step(agent, &mut state, &ctx).await {
                Ok(_) => self.record_outcome(agent, &state),
                Err(err) => {
                    ctx.stream.error(Some((*agent).to_string()), err.to_string()).await;
                    state.messages.push(Message::system_error(err.to_string()));
                    self.circuit_breaker.record_failure(agent);
                    break;
                }
            }
        }

        ctx.stream.done().await;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentEntry;
    use crate::llm::MockProvider;
    use crate::memory::MemorySaver;

    fn registry_with_builder_only() -> Arc<AgentRegistry> {
        let registry = Arc::new(AgentRegistry::new());
        registry
            .register(AgentEntry::new("Builder", "builds", "sys", "mock"))
            .unwrap();
        registry
    }

    fn executor_with(primary: MockProvider) -> Executor {
        let registry = registry_with_builder_only();
        let tools = Arc::new(ToolRegistry::new());
        let gateway = Arc::new(LlmGateway::new(Arc::new(primary)));
        let secondary = Arc::new(LlmGateway::new(Arc::new(MockProvider::new("secondary"))));
        let checkpointer: Arc<dyn Checkpointer> = Arc::new(MemorySaver::new());
        Executor::new(registry, tools, gateway, secondary, checkpointer, ExecutorConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn finish_immediately_produces_one_checkpoint_and_no_agent_message() {
        let primary = MockProvider::new("gpt-4o").with_structured_reply(serde_json::json!({"next": "FINISH", "reasoning": "done"}));
        let exec = executor_with(primary);
        let state = exec.run(None, Some("hi".to_string()), StreamWriter::noop()).await.unwrap();
        assert!(state.contributors.is_empty());
        assert_eq!(state.next, Decision::Finish);
        let history = exec.checkpointer().history(&state.thread_id).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn single_agent_round_trip_reaches_finish_with_one_contributor() {
        let primary = MockProvider::new("gpt-4o")
            .with_structured_reply(serde_json::json!({"next": "Builder", "reasoning": "go"}))
            .with_plain_reply(Message::agent("Builder", "ok"))
            .with_structured_reply(serde_json::json!({"next": "FINISH", "reasoning": "done"}));
        let exec = executor_with(primary);
        let state = exec.run(None, Some("build it".to_string()), StreamWriter::noop()).await.unwrap();
        assert_eq!(state.contributors.len(), 1);
        assert!(state.contributors.contains("Builder"));
        assert_eq!(state.messages.last().unwrap().content, "ok");
        assert_eq!(state.next, Decision::Finish);
    }

    #[tokio::test]
    async fn turn_ceiling_forces_finish() {
        let registry = registry_with_builder_only();
        let tools = Arc::new(ToolRegistry::new());
        let provider = MockProvider::new("gpt-4o").with_structured_reply(serde_json::json!({"next": "Builder", "reasoning": "go"}));
        let gateway = Arc::new(LlmGateway::new(Arc::new(provider)));
        let secondary = Arc::new(LlmGateway::new(Arc::new(MockProvider::new("secondary"))));
        let checkpointer: Arc<dyn Checkpointer> = Arc::new(MemorySaver::new());
        let mut config = ExecutorConfig::default();
        config.max_turns = 1;
        let exec = Executor::new(registry, tools, gateway, secondary, checkpointer, config).unwrap();
        let state = exec.run(None, Some("go".to_string()), StreamWriter::noop()).await.unwrap();
        assert_eq!(state.next, Decision::Finish);
        assert_eq!(state.turn_count, 1);
    }

    #[tokio::test]
    async fn resuming_an_existing_thread_with_no_new_message_reaches_the_same_contributors() {
        let primary = MockProvider::new("gpt-4o")
            .with_structured_reply(serde_json::json!({"next": "Builder", "reasoning": "go"}))
            .with_plain_reply(Message::agent("Builder", "ok"))
            .with_structured_reply(serde_json::json!({"next": "FINISH", "reasoning": "done"}));
        let exec = executor_with(primary);
        let first = exec.run(None, Some("build it".to_string()), StreamWriter::noop()).await.unwrap();
        assert_eq!(first.next, Decision::Finish);

        // A fresh run against the same thread id with no new message is a no-op resume
        // (already at FINISH): it re-enters the Router, which (with an empty mock queue)
        // falls back through to L3 and still reaches FINISH deterministically for "hi".
        let resumed = exec.run(Some(first.thread_id.clone()), None, StreamWriter::noop()).await.unwrap();
        assert_eq!(resumed.contributors, first.contributors);
    }
}
