//! The Router node: spec.md §4.4's four-level fallback chain deciding which
//! agent runs next, or `FINISH`.
//!
//! A structured-decision node reading a registry-built prompt, going through
//! [`crate::llm::gateway::LlmGateway`] for the provider-call layer. The
//! fallback-through-levels chain is built directly from spec.md §4.4's
//! L0-L3 description.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

use crate::agents::AgentRegistry;
use crate::error::ExecutorError;
use crate::graph::{Node, RunContext};
use crate::llm::LlmGateway;
use crate::message::{Message, Role};
use crate::safety::CircuitBreaker;
use crate::state::{ConversationDelta, ConversationState, Decision};

pub const NODE_ID: &str = "Router";
const DEFAULT_MAX_TURNS: u32 = 50;

/// Keyword -> agent mapping for the L3 deterministic fallback. Matched as
/// whole words, case-insensitively, against the most recent user message.
const KEYWORD_TABLE: &[(&str, &str)] = &[
    ("security", "Security"),
    ("vulnerability", "Security"),
    ("vulnerabilities", "Security"),
    ("deploy", "SRE"),
    ("deployment", "SRE"),
    ("rollout", "SRE"),
    ("design", "Designer"),
    ("ux", "UXResearcher"),
    ("architecture", "Architect"),
    ("test", "QA"),
    ("testing", "QA"),
    ("data", "DataEngineer"),
    ("pipeline", "DataEngineer"),
    ("ci", "DevOps"),
    ("infrastructure", "DevOps"),
    ("docs", "TechnicalWriter"),
    ("documentation", "TechnicalWriter"),
    ("strategy", "Strategist"),
    ("priority", "Strategist"),
    ("metrics", "Analyst"),
    ("build", "Builder"),
    ("implement", "Builder"),
];

static KEYWORD_REGEX: Lazy<Regex> = Lazy::new(|| {
    let alternation = KEYWORD_TABLE
        .iter()
        .map(|(keyword, _)| regex::escape(keyword))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b({alternation})\b")).expect("keyword regex is well-formed")
});

/// Counts how often each fallback level ultimately decided, for observability
/// (surfaced through `GET /metrics`).
#[derive(Default)]
pub struct RouterLevelCounts {
    l0: AtomicU64,
    l1: AtomicU64,
    l2: AtomicU64,
    l3: AtomicU64,
}

impl RouterLevelCounts {
    fn record(&self, level: u8) {
        let counter = match level {
            0 => &self.l0,
            1 => &self.l1,
            2 => &self.l2,
            _ => &self.l3,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// `[l0, l1, l2, l3]` invocation counts.
    pub fn snapshot(&self) -> [u64; 4] {
        [
            self.l0.load(Ordering::Relaxed),
            self.l1.load(Ordering::Relaxed),
            self.l2.load(Ordering::Relaxed),
            self.l3.load(Ordering::Relaxed),
        ]
    }
}

/// The Router node: produces `{next, reasoning}`, merged as `state.next`
/// (spec.md §4.4). Never fails — the L3 fallback is a pure function of the
/// conversation history and always returns a decision.
pub struct Router {
    registry: Arc<AgentRegistry>,
    primary: Arc<LlmGateway>,
    secondary: Arc<LlmGateway>,
    circuit_breaker: Arc<CircuitBreaker>,
    max_turns: u32,
    min_fallback_level: u8,
    pub levels: Arc<RouterLevelCounts>,
}

impl Router {
    pub fn new(
        registry: Arc<AgentRegistry>,
        primary: Arc<LlmGateway>,
        secondary: Arc<LlmGateway>,
        circuit_breaker: Arc<CircuitBreaker>,
    ) -> Self {
        let min_fallback_level = std::env::var("ROUTER_FORCE_MIN_LEVEL")
            .ok()
            .and_then(|v| v.parse::<u8>().ok())
            .unwrap_or(0);
        Self {
            registry,
            primary,
            secondary,
            circuit_breaker,
            max_turns: DEFAULT_MAX_TURNS,
            min_fallback_level,
            levels: Arc::new(RouterLevelCounts::default()),
        }
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Forces the fallback chain to start no earlier than `level` (0-3),
    /// mirroring the `ROUTER_FORCE_MIN_LEVEL` env var this engine honors at
    /// construction — useful for exercising lower fallback levels in tests
    /// without a flaky primary provider.
    pub fn with_min_fallback_level(mut self, level: u8) -> Self {
        self.min_fallback_level = level;
        self
    }

    fn decision_schema(&self) -> Value {
        let mut options: Vec<Value> = self.registry.names().into_iter().map(Value::String).collect();
        options.push(json!("FINISH"));
        json!({
            "type": "object",
            "properties": {
                "next": {"type": "string", "enum": options},
                "reasoning": {"type": "string"}
            },
            "required": ["next", "reasoning"]
        })
    }

    fn system_prompt(&self) -> String {
        let plugins = self.registry.router_context();
        let mut prompt = String::from(
            "You are the Router. Read the conversation and decide which specialist should act \
             next, or FINISH if the request is satisfied. Respond with the agent's exact name or \
             FINISH.",
        );
        if !plugins.is_empty() {
            prompt.push_str("\n\nAdditional plugin agents available:\n");
            prompt.push_str(&plugins);
        }
        prompt
    }

    fn parse_decision_value(&self, value: &Value) -> Option<Decision> {
        let next = value.get("next")?.as_str()?;
        if next.eq_ignore_ascii_case("FINISH") {
            return Some(Decision::Finish);
        }
        Some(Decision::Named(next.to_string()))
    }

    /// L1: the model answered in plain text; extract the first balanced JSON
    /// object substring and parse `next` out of it.
    fn parse_plain_reply(&self, message: &Message) -> Option<Decision> {
        let text = &message.content;
        let start = text.find('{')?;
        let mut depth = 0i32;
        let mut end = None;
        for (i, ch) in text[start..].char_indices() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(start + i + 1);
                        break;
                    }
                }
                _ => {}
            }
        }
        let end = end?;
        let value: Value = serde_json::from_str(&text[start..end]).ok()?;
        self.parse_decision_value(&value)
    }

    /// L3: deterministic keyword match against the latest user message,
    /// defaulting to `ProductManager`. Never fails.
    fn rule_based_decision(&self, state: &ConversationState) -> Decision {
        let last_user = state.messages.iter().rev().find(|m| m.role == Role::User);
        if let Some(message) = last_user {
            if let Some(captures) = KEYWORD_REGEX.captures(&message.content) {
                let matched = captures.get(1).unwrap().as_str().to_lowercase();
                if let Some((_, agent)) = KEYWORD_TABLE.iter().find(|(k, _)| *k == matched) {
                    return Decision::Named((*agent).to_string());
                }
            }
        }
        Decision::Named("ProductManager".to_string())
    }

    async fn decide(&self, thread_id: &str, state: &ConversationState) -> (Decision, u8) {
        let schema = self.decision_schema();
        let system_prompt = self.system_prompt();

        if self.min_fallback_level == 0 {
            if let Ok(value) = self
                .primary
                .structured(NODE_ID, thread_id, &system_prompt, &state.messages, "RouterDecision", &schema)
                .await
            {
                if let Some(decision) = self.parse_decision_value(&value) {
                    return (decision, 0);
                }
            }
        }

        if self.min_fallback_level <= 1 {
            if let Ok(message) = self.primary.plain(NODE_ID, thread_id, &system_prompt, &state.messages).await {
                if let Some(decision) = self.parse_plain_reply(&message) {
                    return (decision, 1);
                }
            }
        }

        if self.min_fallback_level <= 2 {
            if let Ok(value) = self
                .secondary
                .structured(NODE_ID, thread_id, &system_prompt, &state.messages, "RouterDecision", &schema)
                .await
            {
                if let Some(decision) = self.parse_decision_value(&value) {
                    return (decision, 2);
                }
            }
        }

        (self.rule_based_decision(state), 3)
    }
}

#[async_trait]
impl Node for Router {
    fn id(&self) -> &str {
        NODE_ID
    }

    async fn run(&self, state: &ConversationState) -> Result<ConversationDelta, ExecutorError> {
        if state.turn_count >= self.max_turns {
            return Ok(ConversationDelta::routed(Decision::Finish, state.turn_count));
        }

        let (mut decision, level) = self.decide(&state.thread_id, state).await;

        if let Decision::Named(name) = &decision {
            if !self.registry.contains(name) || self.circuit_breaker.is_open(name) {
                decision = Decision::Finish;
            }
        }

        self.levels.record(level);
        Ok(ConversationDelta::routed(decision, state.turn_count + 1))
    }

    /// The Router is a node like any other for lifecycle-event purposes
    /// (spec.md §8 S2's expected event sequence names `agent_start(Router)` /
    /// `agent_end(Router)`), even though it never appends a user-visible
    /// Message of its own.
    async fn run_with_context(&self, state: &ConversationState, ctx: &RunContext) -> Result<ConversationDelta, ExecutorError> {
        ctx.stream.agent_start(NODE_ID).await;
        let delta = self.run(state).await;
        ctx.stream.agent_end(NODE_ID).await;
        delta
    }
}
