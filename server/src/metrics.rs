//! `GET /metrics` (JSON) and `GET /metrics/prometheus` (text exposition
//! format), backed by a `UsageRecorder` that tallies every LLM Gateway
//! invocation (spec.md §4.2, §6) alongside the Router's per-level fallback
//! counters and the circuit breaker's open/closed state (spec.md §4.4, §4.5).
//!
//! Per-key `dashmap` counters, the same shape `safety::CircuitBreaker` and
//! `agents::AgentRegistry` already use in this workspace, rather than
//! pulling in a metrics-specific crate for a handful of tallies.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use engine::llm::{UsageRecorder, UsageSample};
use engine::Executor;
use serde_json::{json, Value};

#[derive(Default)]
struct AgentTally {
    invocations: AtomicU64,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
}

/// Accumulates usage samples keyed by agent name. One instance is shared
/// between every `LlmGateway` the process constructs (primary and secondary)
/// so `/metrics` reflects both.
#[derive(Default)]
pub struct Metrics {
    requests_total: AtomicU64,
    by_agent: DashMap<String, AgentTally>,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Renders the JSON shape `GET /metrics` returns: request count, router
    /// fallback-level distribution, per-agent circuit state, and per-agent
    /// usage tallies.
    pub fn snapshot(&self, executor: &Executor) -> Value {
        let levels = executor.router_level_counts();
        let agents: Vec<Value> = executor
            .agent_names()
            .into_iter()
            .map(|name| {
                let tally = self.by_agent.get(&name);
                let (invocations, input_tokens, output_tokens) = tally
                    .map(|t| {
                        (
                            t.invocations.load(Ordering::Relaxed),
                            t.input_tokens.load(Ordering::Relaxed),
                            t.output_tokens.load(Ordering::Relaxed),
                        )
                    })
                    .unwrap_or((0, 0, 0));
                json!({
                    "agent": name,
                    "invocations": invocations,
                    "input_tokens": input_tokens,
                    "output_tokens": output_tokens,
                    "circuit_open": executor.circuit_breaker().is_open(&name),
                })
            })
            .collect();

        json!({
            "requests_total": self.requests_total.load(Ordering::Relaxed),
            "router_levels": {
                "l0": levels[0],
                "l1": levels[1],
                "l2": levels[2],
                "l3": levels[3],
            },
            "agents": agents,
        })
    }

    /// Prometheus text exposition format, `GET /metrics/prometheus`.
    pub fn render_prometheus(&self, executor: &Executor) -> String {
        let levels = executor.router_level_counts();
        let mut out = String::new();
        out.push_str("# HELP orchestrator_requests_total Total HTTP requests handled.\n");
        out.push_str("# TYPE orchestrator_requests_total counter\n");
        out.push_str(&format!("orchestrator_requests_total {}\n", self.requests_total.load(Ordering::Relaxed)));

        out.push_str("# HELP orchestrator_router_level_total Router decisions by fallback level.\n");
        out.push_str("# TYPE orchestrator_router_level_total counter\n");
        for (level, count) in levels.iter().enumerate() {
            out.push_str(&format!("orchestrator_router_level_total{{level=\"{level}\"}} {count}\n"));
        }

        out.push_str("# HELP orchestrator_agent_invocations_total LLM Gateway invocations per agent.\n");
        out.push_str("# TYPE orchestrator_agent_invocations_total counter\n");
        for name in executor.agent_names() {
            let invocations = self.by_agent.get(&name).map(|t| t.invocations.load(Ordering::Relaxed)).unwrap_or(0);
            out.push_str(&format!("orchestrator_agent_invocations_total{{agent=\"{name}\"}} {invocations}\n"));
        }
        out
    }
}

#[async_trait]
impl UsageRecorder for Metrics {
    async fn record(&self, sample: UsageSample) {
        let tally = self.by_agent.entry(sample.agent).or_default();
        tally.invocations.fetch_add(1, Ordering::Relaxed);
        tally.input_tokens.fetch_add(sample.input_tokens as u64, Ordering::Relaxed);
        tally.output_tokens.fetch_add(sample.output_tokens as u64, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn record_accumulates_per_agent_tallies() {
        let metrics = Metrics::new();
        metrics
            .record(UsageSample {
                agent: "Builder".into(),
                model: "gpt-4o".into(),
                input_tokens: 10,
                output_tokens: 5,
                latency_ms: 1,
                thread_id: "t1".into(),
            })
            .await;
        metrics
            .record(UsageSample {
                agent: "Builder".into(),
                model: "gpt-4o".into(),
                input_tokens: 3,
                output_tokens: 2,
                latency_ms: 1,
                thread_id: "t1".into(),
            })
            .await;
        let tally = metrics.by_agent.get("Builder").unwrap();
        assert_eq!(tally.invocations.load(Ordering::Relaxed), 2);
        assert_eq!(tally.input_tokens.load(Ordering::Relaxed), 13);
    }

    #[test]
    fn request_counter_increments() {
        let metrics = Metrics::new();
        metrics.record_request();
        metrics.record_request();
        assert_eq!(metrics.requests_total.load(Ordering::Relaxed), 2);
    }
}
