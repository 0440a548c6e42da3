//! The generic specialist agent node: every built-in and plugin agent runs
//! through this one [`crate::graph::Node`] implementation, parameterized by
//! its [`AgentEntry`].
//!
//! A bounded ReAct loop: AskLLM -> ExecuteTools -> (loop while the model
//! keeps requesting calls) -> Final, bounded by a max-iteration guard instead
//! of recursing. The failure-pattern scan and the self-loop/retry-ceiling
//! bookkeeping are built directly from spec.md §4.5 and §4.3 ("Error Handling"
//! / "failure-detection scan").

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::ExecutorError;
use crate::graph::{Node, RunContext};
use crate::llm::gateway::ToolSpec as GatewayToolSpec;
use crate::llm::{LlmGateway, ToolChoiceMode, ToolInvocationOutcome};
use crate::message::Message;
use crate::safety::{retry_ceiling_reached, DEFAULT_MAX_RETRIES};
use crate::state::{ConversationDelta, ConversationState};
use crate::stream::StreamWriter;
use crate::tools::{ToolCallContext, ToolRegistry};

use super::entry::AgentEntry;

/// Short hex digest of a tool call's arguments, for the `tool` SSE event's
/// `arg_digest` field (spec.md §4.7) — identifies a call without echoing
/// potentially sensitive argument content back to the client.
fn arg_digest(args: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(args.to_string().as_bytes());
    let digest = hasher.finalize();
    digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
}

const DEFAULT_MAX_TOOL_ITERATIONS: usize = 8;

/// Substrings the failure-detection scan looks for in a tool result or final
/// reply (spec.md §4.5, case-insensitive). Whole strings rather than
/// whole-word patterns: a tool's raw stdout/stderr is unstructured text, not
/// the user's prose the Router's L3 keyword table matches against.
const FAILURE_PATTERNS: &[&str] =
    &["error", "exception", "fail", "typeerror", "referenceerror", "not found"];

fn looks_like_a_failure(text: &str) -> bool {
    let lowered = text.to_lowercase();
    FAILURE_PATTERNS.iter().any(|pattern| lowered.contains(pattern))
}

/// A single specialist agent, wired into the graph once per [`AgentEntry`]
/// (spec.md §4.1/§4.6). Only [`super::team::builtin_team`]'s `"Builder"`
/// entry is actually given a self-loop edge by the executor; every other
/// node uses the same code path but its conditional edge always routes
/// straight back to the Router.
pub struct AgentNode {
    entry: AgentEntry,
    gateway: Arc<LlmGateway>,
    tools: Arc<ToolRegistry>,
    workspace_root: PathBuf,
    max_tool_iterations: usize,
    max_retries: u32,
    tool_timeout: std::time::Duration,
}

impl AgentNode {
    pub fn new(entry: AgentEntry, gateway: Arc<LlmGateway>, tools: Arc<ToolRegistry>, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            entry,
            gateway,
            tools,
            workspace_root: workspace_root.into(),
            max_tool_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
            max_retries: DEFAULT_MAX_RETRIES,
            tool_timeout: std::time::Duration::from_secs(30),
        }
    }

    pub fn with_max_tool_iterations(mut self, n: usize) -> Self {
        self.max_tool_iterations = n;
        self
    }

    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// Per-tool-call deadline (spec.md §5): applied to every
    /// [`ToolCallContext`] this node hands to the Tool Registry.
    pub fn with_tool_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    fn tool_specs(&self) -> Vec<GatewayToolSpec> {
        self.tools
            .list()
            .into_iter()
            .filter(|spec| self.entry.tools.iter().any(|name| name == &spec.name))
            .map(|spec| GatewayToolSpec { name: spec.name, description: spec.description, parameters: spec.parameters })
            .collect()
    }

    /// Runs the bounded AskLLM -> ExecuteTools loop until the model produces a
    /// final message or the iteration guard trips. Emits one `tool` SSE event
    /// per completed call (spec.md §4.7: "when a tool finishes").
    async fn tool_calling_reply(
        &self,
        thread_id: &str,
        history: &mut Vec<Message>,
        ctx: &ToolCallContext,
        stream: &StreamWriter,
    ) -> Result<Message, ExecutorError> {
        let specs = self.tool_specs();
        for _ in 0..self.max_tool_iterations {
            let outcome = self
                .gateway
                .tools(&self.entry.name, thread_id, &self.entry.system_prompt, history, &specs, ToolChoiceMode::Auto)
                .await?;
            match outcome {
                ToolInvocationOutcome::Final(message) => return Ok(message),
                ToolInvocationOutcome::Calls(calls) => {
                    for call in calls {
                        let digest = arg_digest(&call.arguments);
                        let result = self.tools.call(&call.name, call.arguments.clone(), ctx).await;
                        let (content, ok) = match result {
                            Ok(output) => (output, true),
                            Err(err) => (err.to_string(), false),
                        };
                        stream.tool(&call.name, digest, ok).await;
                        history.push(Message::tool(&call.name, content));
                    }
                }
            }
        }
        Ok(Message::system_error(format!(
            "{} exceeded the tool-call iteration bound without reaching a final answer",
            self.entry.name
        )))
    }

    async fn produce_reply(
        &self,
        thread_id: &str,
        state: &ConversationState,
        ctx: &ToolCallContext,
        stream: &StreamWriter,
    ) -> Result<Message, ExecutorError> {
        if self.entry.tools.is_empty() {
            if let Some(schema) = &self.entry.structured_output_schema {
                let value = self
                    .gateway
                    .structured(&self.entry.name, thread_id, &self.entry.system_prompt, &state.messages, &self.entry.name, schema)
                    .await?;
                return Ok(structured_value_to_message(&self.entry.name, value));
            }
            let message = self.gateway.plain(&self.entry.name, thread_id, &self.entry.system_prompt, &state.messages).await?;
            return Ok(message);
        }

        let mut history = state.messages.clone();
        self.tool_calling_reply(thread_id, &mut history, ctx, stream).await
    }
}

fn structured_value_to_message(agent: &str, value: Value) -> Message {
    let content = value
        .get("summary")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string());
    Message::agent(agent, content).with_payload(value)
}

#[async_trait]
impl Node for AgentNode {
    fn id(&self) -> &str {
        &self.entry.name
    }

    async fn run(&self, state: &ConversationState) -> Result<ConversationDelta, ExecutorError> {
        let ctx = ToolCallContext::new(self.workspace_root.clone(), state.thread_id.clone()).with_tool_timeout(self.tool_timeout);
        self.run_inner(state, &ctx, &StreamWriter::noop()).await
    }

    async fn run_with_context(&self, state: &ConversationState, run_ctx: &RunContext) -> Result<ConversationDelta, ExecutorError> {
        run_ctx.stream.agent_start(&self.entry.name).await;
        let ctx = ToolCallContext::new(self.workspace_root.clone(), state.thread_id.clone()).with_tool_timeout(self.tool_timeout);
        let delta = self.run_inner(state, &ctx, &run_ctx.stream).await;
        run_ctx.stream.agent_end(&self.entry.name).await;
        delta
    }
}

impl AgentNode {
    async fn run_inner(&self, state: &ConversationState, ctx: &ToolCallContext, stream: &StreamWriter) -> Result<ConversationDelta, ExecutorError> {
        let reply = self.produce_reply(&state.thread_id, state, ctx, stream).await;

        let (message, needs_retry, last_error) = match reply {
            Ok(message) => {
                let failed = looks_like_a_failure(&message.content);
                let last_error = failed.then(|| message.content.clone());
                (message, failed, last_error)
            }
            Err(err) => (Message::system_error(err.to_string()), true, Some(err.to_string())),
        };

        let mut contributors = std::collections::BTreeSet::new();
        contributors.insert(self.entry.name.clone());
        let mut delta = ConversationDelta { new_messages: vec![message], contributors, ..Default::default() };

        if retry_ceiling_reached(state, &self.entry.name, self.max_retries) && needs_retry {
            // Surrender: stop looping, hand back to the Router, reset the counter.
            delta = delta
                .with_needs_retry(false)
                .with_retry_count(&self.entry.name, 0)
                .with_last_error(format!("{} surrendered after {} retries", self.entry.name, self.max_retries));
            return Ok(delta);
        }

        delta = delta.with_needs_retry(needs_retry);
        delta = match last_error {
            Some(error) => delta.with_last_error(error),
            None => delta.clear_last_error(),
        };
        delta = delta.with_retry_count(
            &self.entry.name,
            if needs_retry { state.retries_for(&self.entry.name) + 1 } else { 0 },
        );

        Ok(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockProvider;
    use crate::message::Message as Msg;

    fn node_with(entry: AgentEntry, provider: MockProvider) -> AgentNode {
        AgentNode::new(entry, Arc::new(LlmGateway::new(Arc::new(provider))), Arc::new(ToolRegistry::new()), "/tmp")
    }

    fn fresh_state() -> ConversationState {
        ConversationState::new("t1", Msg::user("build the login page"))
    }

    #[tokio::test]
    async fn plain_success_clears_retry_state() {
        let entry = AgentEntry::new("Builder", "builds", "sys", "gpt-4o");
        let provider = MockProvider::new("gpt-4o").with_plain_reply(Msg::agent("Builder", "done, tests pass"));
        let node = node_with(entry, provider);
        let state = fresh_state();
        let delta = node.run(&state).await.unwrap();
        assert_eq!(delta.needs_retry, Some(false));
        assert_eq!(delta.last_error, Some(None));
        assert_eq!(delta.agent_retries.get("Builder"), Some(&0));
    }

    #[tokio::test]
    async fn failure_pattern_sets_needs_retry_and_increments_counter() {
        let entry = AgentEntry::new("Builder", "builds", "sys", "gpt-4o");
        let provider = MockProvider::new("gpt-4o").with_plain_reply(Msg::agent("Builder", "TypeError: cannot read property"));
        let node = node_with(entry, provider);
        let mut state = fresh_state();
        state.agent_retries.insert("Builder".to_string(), 1);
        let delta = node.run(&state).await.unwrap();
        assert_eq!(delta.needs_retry, Some(true));
        assert_eq!(delta.agent_retries.get("Builder"), Some(&2));
    }

    #[tokio::test]
    async fn surrenders_once_retry_ceiling_is_reached() {
        let entry = AgentEntry::new("Builder", "builds", "sys", "gpt-4o");
        let provider = MockProvider::new("gpt-4o").with_plain_reply(Msg::agent("Builder", "still failing: exception raised"));
        let node = node_with(entry, provider).with_max_retries(2);
        let mut state = fresh_state();
        state.agent_retries.insert("Builder".to_string(), 2);
        let delta = node.run(&state).await.unwrap();
        assert_eq!(delta.needs_retry, Some(false));
        assert_eq!(delta.agent_retries.get("Builder"), Some(&0));
        assert!(delta.last_error.unwrap().unwrap().contains("surrendered"));
    }

    #[tokio::test]
    async fn tool_call_loop_runs_tool_then_returns_final_message() {
        let entry = AgentEntry::new("Builder", "builds", "sys", "gpt-4o").with_tools(["echo"]);
        let provider = MockProvider::new("gpt-4o")
            .with_tool_call("call-1", "echo", serde_json::json!({"x": 1}))
            .with_final_message("Builder", "all good");

        struct Echo;
        #[async_trait]
        impl crate::tools::Tool for Echo {
            fn name(&self) -> &str {
                "echo"
            }
            fn description(&self) -> &str {
                "echoes"
            }
            fn parameters_schema(&self) -> Value {
                serde_json::json!({"type": "object"})
            }
            async fn call(&self, args: Value, _ctx: &ToolCallContext) -> Result<String, crate::tools::ToolError> {
                Ok(args.to_string())
            }
        }

        let tools = Arc::new(ToolRegistry::new());
        tools.register(Arc::new(Echo));
        let node = AgentNode::new(entry, Arc::new(LlmGateway::new(Arc::new(provider))), tools, "/tmp");
        let state = fresh_state();
        let delta = node.run(&state).await.unwrap();
        assert_eq!(delta.new_messages[0].content, "all good");
    }

    #[tokio::test]
    async fn tool_call_loop_emits_a_tool_event_per_completed_call() {
        use crate::stream::{EventBus, LifecycleEvent, StreamWriter};

        let entry = AgentEntry::new("Builder", "builds", "sys", "gpt-4o").with_tools(["echo"]);
        let provider = MockProvider::new("gpt-4o")
            .with_tool_call("call-1", "echo", serde_json::json!({"x": 1}))
            .with_final_message("Builder", "all good");

        struct Echo;
        #[async_trait]
        impl crate::tools::Tool for Echo {
            fn name(&self) -> &str {
                "echo"
            }
            fn description(&self) -> &str {
                "echoes"
            }
            fn parameters_schema(&self) -> Value {
                serde_json::json!({"type": "object"})
            }
            async fn call(&self, args: Value, _ctx: &ToolCallContext) -> Result<String, crate::tools::ToolError> {
                Ok(args.to_string())
            }
        }

        let tools = Arc::new(ToolRegistry::new());
        tools.register(Arc::new(Echo));
        let node = AgentNode::new(entry, Arc::new(LlmGateway::new(Arc::new(provider))), tools, "/tmp");
        let state = fresh_state();

        let bus = Arc::new(EventBus::new(8));
        let run_ctx = RunContext::new("t1", StreamWriter::new(bus.clone()));
        node.run_with_context(&state, &run_ctx).await.unwrap();

        // AgentStart, Tool, AgentEnd, in order.
        assert!(matches!(bus.next().await, LifecycleEvent::AgentStart { .. }));
        match bus.next().await {
            LifecycleEvent::Tool { name, ok, .. } => {
                assert_eq!(name, "echo");
                assert!(ok);
            }
            other => panic!("expected a Tool event, got {other:?}"),
        }
        assert!(matches!(bus.next().await, LifecycleEvent::AgentEnd { .. }));
    }
}
