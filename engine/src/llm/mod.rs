//! LLM Gateway: uniform interface over multiple providers (spec.md §4.2).
//!
//! A "trait + mock + concrete provider" shape covering the three invocation
//! modes spec.md names (plain, structured, tool-calling), wrapped in a
//! retrying `LlmGateway` that records a [`UsageSample`] per call, with a
//! `thiserror` enum for [`GatewayError`].

mod gateway;
mod mock;
mod openai;
mod usage;

pub use gateway::{LlmGateway, ProviderClient, ToolCallRequest, ToolCallResult, ToolInvocationOutcome};
pub use mock::MockProvider;
pub use openai::OpenAiProvider;
pub use usage::{UsageRecorder, UsageSample};

use thiserror::Error;

/// Failure taxonomy for one Gateway invocation (spec.md §4.2).
#[derive(Debug, Error, Clone)]
pub enum GatewayError {
    #[error("timeout")]
    Timeout,
    #[error("rate limited")]
    RateLimited,
    #[error("unauthorized")]
    Unauthorized,
    #[error("provider error: {0}")]
    ProviderError(String),
    #[error("schema violation: {0}")]
    SchemaViolation(String),
    #[error("cancelled")]
    Cancelled,
}

impl GatewayError {
    /// Timeout and RateLimited are retried by the Gateway with bounded exponential
    /// backoff (§4.2); every other variant propagates immediately.
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Timeout | GatewayError::RateLimited)
    }
}

/// Controls whether the model may, must not, or must call a tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ToolChoiceMode {
    #[default]
    Auto,
    None,
    Required,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_timeout_and_rate_limited_only() {
        assert!(GatewayError::Timeout.is_transient());
        assert!(GatewayError::RateLimited.is_transient());
        assert!(!GatewayError::Unauthorized.is_transient());
        assert!(!GatewayError::ProviderError("x".into()).is_transient());
        assert!(!GatewayError::SchemaViolation("x".into()).is_transient());
        assert!(!GatewayError::Cancelled.is_transient());
    }
}
