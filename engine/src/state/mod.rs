//! Conversation State: the single value threaded through every super-step, and the
//! delta type each node returns to describe its contribution to it.
//!
//! Merged via [`crate::channels::StateUpdater`] with the append/union/overwrite
//! rules spec.md specifies for multi-agent routing.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::artifact::{Artifact, SubTask};
use crate::message::Message;

/// The Router's decision: a named agent to run next, or the sentinel that ends the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "agent", rename_all = "snake_case")]
pub enum Decision {
    Named(String),
    Finish,
}

impl Decision {
    pub fn is_finish(&self) -> bool {
        matches!(self, Decision::Finish)
    }

    pub fn agent_name(&self) -> Option<&str> {
        match self {
            Decision::Named(n) => Some(n.as_str()),
            Decision::Finish => None,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Named(n) => write!(f, "{n}"),
            Decision::Finish => write!(f, "FINISH"),
        }
    }
}

/// The value persisted at every checkpoint and read by every node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub thread_id: String,
    pub messages: Vec<Message>,
    pub artifacts: Vec<Artifact>,
    pub contributors: BTreeSet<String>,
    pub next: Decision,
    pub turn_count: u32,
    pub agent_retries: BTreeMap<String, u32>,
    pub last_error: Option<String>,
    pub needs_retry: bool,

    // Hierarchical-mode fields; empty/false in linear mode.
    pub sub_tasks: Vec<SubTask>,
    pub aggregated_results: Vec<String>,
    pub supervisor_mode: bool,
    pub parent_task_id: Option<String>,

    // Human-in-the-loop fields.
    pub phase: Option<String>,
    pub approval_status: Option<bool>,
    pub requires_approval: bool,
}

impl ConversationState {
    /// New thread, seeded with the user's opening message.
    pub fn new(thread_id: impl Into<String>, opening_message: Message) -> Self {
        Self {
            thread_id: thread_id.into(),
            messages: vec![opening_message],
            artifacts: Vec::new(),
            contributors: BTreeSet::new(),
            next: Decision::Finish,
            turn_count: 0,
            agent_retries: BTreeMap::new(),
            last_error: None,
            needs_retry: false,
            sub_tasks: Vec::new(),
            aggregated_results: Vec::new(),
            supervisor_mode: false,
            parent_task_id: None,
            phase: None,
            approval_status: None,
            requires_approval: false,
        }
    }

    pub fn retries_for(&self, agent: &str) -> u32 {
        *self.agent_retries.get(agent).unwrap_or(&0)
    }
}

/// Partial contribution returned by a node's handler; merged into [`ConversationState`]
/// following spec's merge rules: `messages`/`artifacts` append, `contributors` unions,
/// scalars overwrite, and `agent_retries` merges key-wise with per-key overwrite.
///
/// Fields using `Option<Option<T>>` distinguish "leave unchanged" (`None`) from
/// "explicitly set, possibly to absent" (`Some(None)`) for nullable scalars.
#[derive(Debug, Clone, Default)]
pub struct ConversationDelta {
    pub new_messages: Vec<Message>,
    pub new_artifacts: Vec<Artifact>,
    pub contributors: BTreeSet<String>,
    pub next: Option<Decision>,
    pub turn_count: Option<u32>,
    pub agent_retries: BTreeMap<String, u32>,
    pub last_error: Option<Option<String>>,
    pub needs_retry: Option<bool>,
    pub sub_tasks: Option<Vec<SubTask>>,
    pub aggregated_results: Option<Vec<String>>,
    pub supervisor_mode: Option<bool>,
    pub parent_task_id: Option<Option<String>>,
    pub phase: Option<Option<String>>,
    pub approval_status: Option<Option<bool>>,
    pub requires_approval: Option<bool>,
}

impl ConversationDelta {
    /// The minimum every successful node invocation must produce: one message naming
    /// the acting agent, and that agent added to `contributors`.
    pub fn agent_reply(agent: impl Into<String>, content: impl Into<String>) -> Self {
        let agent = agent.into();
        let mut contributors = BTreeSet::new();
        contributors.insert(agent.clone());
        Self {
            new_messages: vec![Message::agent(agent, content)],
            contributors,
            ..Default::default()
        }
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.new_artifacts.push(artifact);
        self
    }

    pub fn with_needs_retry(mut self, needs_retry: bool) -> Self {
        self.needs_retry = Some(needs_retry);
        self
    }

    pub fn with_last_error(mut self, error: impl Into<String>) -> Self {
        self.last_error = Some(Some(error.into()));
        self
    }

    pub fn clear_last_error(mut self) -> Self {
        self.last_error = Some(None);
        self
    }

    pub fn with_retry_count(mut self, agent: impl Into<String>, count: u32) -> Self {
        self.agent_retries.insert(agent.into(), count);
        self
    }

    /// The Router's delta: sets `next` and increments `turn_count`; never touches
    /// `messages` (the Router produces no user-visible message, per spec §4.4).
    pub fn routed(decision: Decision, turn_count: u32) -> Self {
        Self {
            next: Some(decision),
            turn_count: Some(turn_count),
            ..Default::default()
        }
    }
}

/// Applies `delta` to `state` in place. `thread_id` is never touched by a delta; it is
/// fixed at thread creation.
pub fn apply_delta(state: &mut ConversationState, delta: ConversationDelta) {
    state.messages.extend(delta.new_messages);
    state.artifacts.extend(delta.new_artifacts);
    state.contributors.extend(delta.contributors);
    for (agent, count) in delta.agent_retries {
        state.agent_retries.insert(agent, count);
    }
    if let Some(next) = delta.next {
        state.next = next;
    }
    if let Some(turn_count) = delta.turn_count {
        state.turn_count = turn_count;
    }
    if let Some(last_error) = delta.last_error {
        state.last_error = last_error;
    }
    if let Some(needs_retry) = delta.needs_retry {
        state.needs_retry = needs_retry;
    }
    if let Some(sub_tasks) = delta.sub_tasks {
        state.sub_tasks = sub_tasks;
    }
    if let Some(aggregated_results) = delta.aggregated_results {
        state.aggregated_results = aggregated_results;
    }
    if let Some(supervisor_mode) = delta.supervisor_mode {
        state.supervisor_mode = supervisor_mode;
    }
    if let Some(parent_task_id) = delta.parent_task_id {
        state.parent_task_id = parent_task_id;
    }
    if let Some(phase) = delta.phase {
        state.phase = phase;
    }
    if let Some(approval_status) = delta.approval_status {
        state.approval_status = approval_status;
    }
    if let Some(requires_approval) = delta.requires_approval {
        state.requires_approval = requires_approval;
    }
}
