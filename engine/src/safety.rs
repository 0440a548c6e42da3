//! Safety Envelope (spec.md §4.5): the turn ceiling and per-agent retry
//! ceiling are plain threshold checks against [`crate::state::ConversationState`]
//! fields (enforced by [`crate::router::Router`] and [`crate::agents::AgentNode`]
//! respectively); the one piece of standalone state is the circuit breaker,
//! which tracks consecutive failures per agent across turns.
//!
//! A dashmap-backed per-key failure counter with a cooldown window, keyed
//! per agent rather than per provider.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::state::ConversationState;

pub const DEFAULT_MAX_RETRIES: u32 = 3;

struct BreakerState {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Per-agent sliding consecutive-failure counter. Opens for `cooldown` once
/// `threshold` consecutive failures are recorded; any success closes it.
pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    agents: DashMap<String, BreakerState>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self { threshold, cooldown, agents: DashMap::new() }
    }

    /// Records a failed invocation. Returns `true` if this failure just opened
    /// the breaker.
    pub fn record_failure(&self, agent: &str) -> bool {
        let mut entry = self.agents.entry(agent.to_string()).or_insert_with(|| BreakerState {
            consecutive_failures: 0,
            opened_at: None,
        });
        entry.consecutive_failures += 1;
        if entry.consecutive_failures >= self.threshold && entry.opened_at.is_none() {
            entry.opened_at = Some(Instant::now());
            true
        } else {
            false
        }
    }

    /// Records a successful invocation, closing the breaker.
    pub fn record_success(&self, agent: &str) {
        if let Some(mut entry) = self.agents.get_mut(agent) {
            entry.consecutive_failures = 0;
            entry.opened_at = None;
        }
    }

    /// `true` if `agent` is currently inside its cooldown window. Clears a
    /// stale cooldown that has elapsed so a later lookup no longer pays the
    /// `Instant::now()` comparison cost of a state that closed itself.
    pub fn is_open(&self, agent: &str) -> bool {
        let Some(mut entry) = self.agents.get_mut(agent) else {
            return false;
        };
        match entry.opened_at {
            Some(opened_at) if opened_at.elapsed() < self.cooldown => true,
            Some(_) => {
                entry.consecutive_failures = 0;
                entry.opened_at = None;
                false
            }
            None => false,
        }
    }
}

/// `true` once `agent`'s recorded retry count has reached `max_retries` — the
/// Builder self-loop's surrender condition (spec.md §4.5).
pub fn retry_ceiling_reached(state: &ConversationState, agent: &str, max_retries: u32) -> bool {
    state.retries_for(agent) >= max_retries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[test]
    fn breaker_opens_after_threshold_consecutive_failures() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        assert!(!breaker.record_failure("Builder"));
        assert!(!breaker.record_failure("Builder"));
        assert!(breaker.record_failure("Builder"));
        assert!(breaker.is_open("Builder"));
    }

    #[test]
    fn success_closes_the_breaker() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60));
        breaker.record_failure("Builder");
        breaker.record_failure("Builder");
        assert!(breaker.is_open("Builder"));
        breaker.record_success("Builder");
        assert!(!breaker.is_open("Builder"));
    }

    #[test]
    fn unknown_agent_is_never_open() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60));
        assert!(!breaker.is_open("Ghost"));
    }

    #[test]
    fn cooldown_elapsing_closes_the_breaker() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        breaker.record_failure("Builder");
        assert!(breaker.is_open("Builder"));
        std::thread::sleep(Duration::from_millis(20));
        assert!(!breaker.is_open("Builder"));
    }

    #[test]
    fn retry_ceiling_check_reads_agent_retries() {
        let mut state = ConversationState::new("t1", Message::user("hi"));
        assert!(!retry_ceiling_reached(&state, "Builder", DEFAULT_MAX_RETRIES));
        state.agent_retries.insert("Builder".to_string(), DEFAULT_MAX_RETRIES);
        assert!(retry_ceiling_reached(&state, "Builder", DEFAULT_MAX_RETRIES));
    }
}
