//! Hierarchical dispatch mode (spec.md §4.6, "Hierarchical subgraph (optional)"):
//! [`SupervisorNode`] (ProductManager in supervisor mode) produces a list of
//! SubTasks; [`DispatcherNode`] picks the next pending one and invokes its
//! named worker agent with the task as extra context; [`SynthesizerNode`]
//! aggregates every completed SubTask's result once none remain pending or
//! in-progress.
//!
//! Dispatched strictly sequentially, not in parallel (DESIGN.md Open Question
//! #2): each super-step advances exactly one SubTask, so — like every other
//! node in this engine — a dispatch step is a single delta the executor can
//! checkpoint and resume, with no sub-scheduler of its own. This is a parallel
//! graph to the linear Router+team graph `executor::Executor` wires by
//! default; an operator opts into it by composing these two nodes into their
//! own [`crate::graph::StateGraph`] rather than the Router's conditional edges.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::agents::AgentRegistry;
use crate::artifact::{SubTask, SubTaskStatus};
use crate::error::ExecutorError;
use crate::graph::{Node, RunContext};
use crate::llm::LlmGateway;
use crate::message::Message;
use crate::state::{ConversationDelta, ConversationState, Decision};
use crate::tools::ToolCallContext;

pub const SUPERVISOR_NODE_ID: &str = "Supervisor";
pub const DISPATCHER_NODE_ID: &str = "Dispatcher";
pub const SYNTHESIZER_NODE_ID: &str = "Synthesizer";

/// JSON schema the supervisor's structured-output call is constrained to:
/// an ordered list of sub-tasks, each naming the worker agent responsible.
fn sub_task_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "sub_tasks": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string" },
                        "worker": { "type": "string" },
                        "description": { "type": "string" },
                        "context": { "type": "string" }
                    },
                    "required": ["id", "worker", "description"]
                }
            }
        },
        "required": ["sub_tasks"]
    })
}

/// Decomposes the conversation so far into the [`SubTask`] list
/// [`DispatcherNode`] works through (spec.md §4.6: "a Supervisor
/// (ProductManager in supervisor mode) produces a list of SubTasks"). A
/// structured-output, single-shot invocation of the named supervisor agent —
/// by default `ProductManager`, the same registered entry the linear graph
/// uses for its own PRD-writing turn, just asked a different question here.
pub struct SupervisorNode {
    registry: Arc<AgentRegistry>,
    gateway: Arc<LlmGateway>,
    supervisor_agent: String,
}

impl SupervisorNode {
    pub fn new(registry: Arc<AgentRegistry>, gateway: Arc<LlmGateway>) -> Self {
        Self { registry, gateway, supervisor_agent: "ProductManager".to_string() }
    }

    pub fn with_supervisor_agent(mut self, name: impl Into<String>) -> Self {
        self.supervisor_agent = name.into();
        self
    }
}

#[async_trait]
impl Node for SupervisorNode {
    fn id(&self) -> &str {
        SUPERVISOR_NODE_ID
    }

    async fn run(&self, state: &ConversationState) -> Result<ConversationDelta, ExecutorError> {
        let supervisor = self
            .registry
            .lookup(&self.supervisor_agent)
            .map_err(|_| ExecutorError::UnknownAgent(self.supervisor_agent.clone()))?;

        let value = self
            .gateway
            .structured(&supervisor.name, &state.thread_id, &supervisor.system_prompt, &state.messages, "sub_task_list", &sub_task_schema())
            .await?;

        let sub_tasks: Vec<SubTask> = value
            .get("sub_tasks")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .enumerate()
                    .filter_map(|(i, item)| {
                        let worker = item.get("worker")?.as_str()?.to_string();
                        let description = item.get("description")?.as_str()?.to_string();
                        let id = item
                            .get("id")
                            .and_then(Value::as_str)
                            .map(str::to_string)
                            .unwrap_or_else(|| format!("s{}", i + 1));
                        let context = item.get("context").and_then(Value::as_str).unwrap_or_default().to_string();
                        Some(SubTask::new(id, worker, description, context))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut contributors = BTreeSet::new();
        contributors.insert(supervisor.name.clone());

        Ok(ConversationDelta {
            sub_tasks: Some(sub_tasks),
            supervisor_mode: Some(true),
            contributors,
            ..Default::default()
        })
    }

    async fn run_with_context(&self, state: &ConversationState, ctx: &RunContext) -> Result<ConversationDelta, ExecutorError> {
        ctx.stream.agent_start(SUPERVISOR_NODE_ID).await;
        let delta = self.run(state).await;
        ctx.stream.agent_end(SUPERVISOR_NODE_ID).await;
        delta
    }
}

/// Picks the first `Pending` [`crate::artifact::SubTask`] and invokes its
/// worker agent with the task folded into the message history as extra
/// context, exactly as spec.md §4.6 describes. A single-shot (no
/// tool-calling loop) invocation, mirroring `AgentNode`'s plain path — a
/// sub-task worker that itself needs tools is handled by the ordinary linear
/// graph instead, not this dispatch mode.
pub struct DispatcherNode {
    registry: Arc<AgentRegistry>,
    gateway: Arc<LlmGateway>,
    workspace_root: PathBuf,
}

impl DispatcherNode {
    pub fn new(registry: Arc<AgentRegistry>, gateway: Arc<LlmGateway>, workspace_root: impl Into<PathBuf>) -> Self {
        Self { registry, gateway, workspace_root: workspace_root.into() }
    }
}

#[async_trait]
impl Node for DispatcherNode {
    fn id(&self) -> &str {
        DISPATCHER_NODE_ID
    }

    async fn run(&self, state: &ConversationState) -> Result<ConversationDelta, ExecutorError> {
        let Some(index) = state.sub_tasks.iter().position(|t| t.status == SubTaskStatus::Pending) else {
            // Nothing left to dispatch; the exit condition ("all completed, or
            // none generated") is a routing decision the caller's conditional
            // edge makes by reading `state.sub_tasks`, not this node's concern.
            return Ok(ConversationDelta::default());
        };

        let mut sub_tasks = state.sub_tasks.clone();
        let task = sub_tasks[index].clone();

        let worker = match self.registry.lookup(&task.worker) {
            Ok(entry) => entry,
            Err(_) => {
                sub_tasks[index].fail(format!("unknown worker agent: {}", task.worker));
                return Ok(ConversationDelta {
                    sub_tasks: Some(sub_tasks),
                    last_error: Some(Some(format!("sub-task {} named an unknown worker {}", task.id, task.worker))),
                    ..Default::default()
                });
            }
        };

        sub_tasks[index].status = SubTaskStatus::InProgress;

        // The sandbox root is threaded through even though this single-shot
        // path never calls a tool, so a future worker that does needs no
        // signature change here.
        let _ctx = ToolCallContext::new(self.workspace_root.clone(), state.thread_id.clone());

        let mut history = state.messages.clone();
        history.push(Message::user(format!("Sub-task for {}: {}\n\nContext: {}", worker.name, task.description, task.context)));

        match self.gateway.plain(&worker.name, &state.thread_id, &worker.system_prompt, &history).await {
            Ok(message) => {
                sub_tasks[index].complete(message.content.clone());
                let mut contributors = BTreeSet::new();
                contributors.insert(worker.name.clone());
                Ok(ConversationDelta {
                    new_messages: vec![message],
                    contributors,
                    sub_tasks: Some(sub_tasks),
                    ..Default::default()
                })
            }
            Err(err) => {
                sub_tasks[index].fail(err.to_string());
                Ok(ConversationDelta {
                    sub_tasks: Some(sub_tasks),
                    last_error: Some(Some(err.to_string())),
                    ..Default::default()
                })
            }
        }
    }

    async fn run_with_context(&self, state: &ConversationState, ctx: &RunContext) -> Result<ConversationDelta, ExecutorError> {
        ctx.stream.agent_start(DISPATCHER_NODE_ID).await;
        let delta = self.run(state).await;
        ctx.stream.agent_end(DISPATCHER_NODE_ID).await;
        delta
    }
}

/// Aggregates every `Completed` SubTask's result into one summary message and
/// finishes the run (spec.md §4.6: "a Synthesizer aggregates completed
/// SubTask results once all are `completed`").
#[derive(Default)]
pub struct SynthesizerNode;

impl SynthesizerNode {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Node for SynthesizerNode {
    fn id(&self) -> &str {
        SYNTHESIZER_NODE_ID
    }

    async fn run(&self, state: &ConversationState) -> Result<ConversationDelta, ExecutorError> {
        let results: Vec<String> = state
            .sub_tasks
            .iter()
            .filter(|t| t.status == SubTaskStatus::Completed)
            .map(|t| format!("- {}: {}", t.worker, t.result.clone().unwrap_or_default()))
            .collect();

        let summary = if results.is_empty() {
            "No sub-tasks completed.".to_string()
        } else {
            format!("Synthesis of {} completed sub-task(s):\n{}", results.len(), results.join("\n"))
        };

        let mut contributors = BTreeSet::new();
        contributors.insert(SYNTHESIZER_NODE_ID.to_string());

        Ok(ConversationDelta {
            new_messages: vec![Message::agent(SYNTHESIZER_NODE_ID, summary)],
            contributors,
            aggregated_results: Some(results),
            next: Some(Decision::Finish),
            ..Default::default()
        })
    }

    async fn run_with_context(&self, state: &ConversationState, ctx: &RunContext) -> Result<ConversationDelta, ExecutorError> {
        ctx.stream.agent_start(SYNTHESIZER_NODE_ID).await;
        let delta = self.run(state).await;
        ctx.stream.agent_end(SYNTHESIZER_NODE_ID).await;
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentEntry;
    use crate::artifact::SubTask;
    use crate::llm::MockProvider;
    use crate::message::Message as Msg;

    fn state_with_tasks(tasks: Vec<SubTask>) -> ConversationState {
        let mut state = ConversationState::new("t1", Msg::user("build the onboarding flow"));
        state.supervisor_mode = true;
        state.sub_tasks = tasks;
        state
    }

    #[tokio::test]
    async fn dispatcher_completes_the_first_pending_subtask() {
        let registry = Arc::new(AgentRegistry::new());
        registry.register(AgentEntry::new("Builder", "builds", "sys", "gpt-4o")).unwrap();
        let gateway = Arc::new(LlmGateway::new(Arc::new(
            MockProvider::new("gpt-4o").with_plain_reply(Msg::agent("Builder", "implemented")),
        )));
        let node = DispatcherNode::new(registry, gateway, "/tmp");

        let state = state_with_tasks(vec![SubTask::new("s1", "Builder", "build the form", "use the design doc")]);
        let delta = node.run(&state).await.unwrap();

        let sub_tasks = delta.sub_tasks.unwrap();
        assert_eq!(sub_tasks[0].status, SubTaskStatus::Completed);
        assert_eq!(sub_tasks[0].result.as_deref(), Some("implemented"));
        assert!(delta.contributors.contains("Builder"));
    }

    #[tokio::test]
    async fn dispatcher_fails_the_subtask_on_unknown_worker() {
        let registry = Arc::new(AgentRegistry::new());
        let gateway = Arc::new(LlmGateway::new(Arc::new(MockProvider::new("gpt-4o"))));
        let node = DispatcherNode::new(registry, gateway, "/tmp");

        let state = state_with_tasks(vec![SubTask::new("s1", "Ghost", "do a thing", "ctx")]);
        let delta = node.run(&state).await.unwrap();

        let sub_tasks = delta.sub_tasks.unwrap();
        assert_eq!(sub_tasks[0].status, SubTaskStatus::Failed);
    }

    #[tokio::test]
    async fn dispatcher_is_a_noop_once_no_subtask_is_pending() {
        let registry = Arc::new(AgentRegistry::new());
        let gateway = Arc::new(LlmGateway::new(Arc::new(MockProvider::new("gpt-4o"))));
        let node = DispatcherNode::new(registry, gateway, "/tmp");

        let mut task = SubTask::new("s1", "Builder", "build the form", "ctx");
        task.complete("already done");
        let state = state_with_tasks(vec![task]);
        let delta = node.run(&state).await.unwrap();
        assert!(delta.sub_tasks.is_none());
        assert!(delta.new_messages.is_empty());
    }

    #[tokio::test]
    async fn synthesizer_aggregates_completed_subtasks_and_finishes() {
        let mut t1 = SubTask::new("s1", "Builder", "build the form", "ctx");
        t1.complete("form built");
        let mut t2 = SubTask::new("s2", "Security", "review the form", "ctx");
        t2.complete("no issues");
        let state = state_with_tasks(vec![t1, t2]);

        let node = SynthesizerNode::new();
        let delta = node.run(&state).await.unwrap();

        assert_eq!(delta.next, Some(Decision::Finish));
        let results = delta.aggregated_results.unwrap();
        assert_eq!(results.len(), 2);
        assert!(delta.new_messages[0].content.contains("Synthesis of 2"));
    }

    #[tokio::test]
    async fn synthesizer_handles_no_completed_subtasks() {
        let state = state_with_tasks(vec![]);
        let node = SynthesizerNode::new();
        let delta = node.run(&state).await.unwrap();
        assert!(delta.new_messages[0].content.contains("No sub-tasks completed"));
    }

    fn registry_with_product_manager() -> Arc<AgentRegistry> {
        let registry = Arc::new(AgentRegistry::new());
        registry
            .register(AgentEntry::new("ProductManager", "supervises", "sys", "gpt-4o"))
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn supervisor_produces_subtasks_from_the_structured_reply() {
        let registry = registry_with_product_manager();
        let gateway = Arc::new(LlmGateway::new(Arc::new(MockProvider::new("gpt-4o").with_structured_reply(
            serde_json::json!({"sub_tasks": [
                {"id": "s1", "worker": "Builder", "description": "build the form", "context": "use the design doc"},
                {"id": "s2", "worker": "Security", "description": "review the form"},
            ]}),
        ))));
        let node = SupervisorNode::new(registry, gateway);

        let state = ConversationState::new("t1", Msg::user("build the onboarding flow"));
        let delta = node.run(&state).await.unwrap();

        let sub_tasks = delta.sub_tasks.unwrap();
        assert_eq!(sub_tasks.len(), 2);
        assert_eq!(sub_tasks[0].worker, "Builder");
        assert_eq!(sub_tasks[0].status, SubTaskStatus::Pending);
        assert_eq!(sub_tasks[1].context, "");
        assert_eq!(delta.supervisor_mode, Some(true));
        assert!(delta.contributors.contains("ProductManager"));
    }

    #[tokio::test]
    async fn supervisor_assigns_an_id_when_the_model_omits_one() {
        let registry = registry_with_product_manager();
        let gateway = Arc::new(LlmGateway::new(Arc::new(MockProvider::new("gpt-4o").with_structured_reply(
            serde_json::json!({"sub_tasks": [{"worker": "Builder", "description": "build the form"}]}),
        ))));
        let node = SupervisorNode::new(registry, gateway);

        let state = ConversationState::new("t1", Msg::user("build the onboarding flow"));
        let delta = node.run(&state).await.unwrap();

        let sub_tasks = delta.sub_tasks.unwrap();
        assert_eq!(sub_tasks[0].id, "s1");
    }

    #[tokio::test]
    async fn supervisor_errors_when_its_agent_is_unregistered() {
        let registry = Arc::new(AgentRegistry::new());
        let gateway = Arc::new(LlmGateway::new(Arc::new(MockProvider::new("gpt-4o"))));
        let node = SupervisorNode::new(registry, gateway);

        let state = ConversationState::new("t1", Msg::user("build the onboarding flow"));
        let err = node.run(&state).await.unwrap_err();
        assert!(matches!(err, ExecutorError::UnknownAgent(_)));
    }
}
