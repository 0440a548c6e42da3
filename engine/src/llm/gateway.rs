//! The retrying `LlmGateway` wrapping a low-level [`ProviderClient`], and the
//! three invocation modes spec.md §4.2 names.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info_span, Instrument};

use crate::message::Message;

use super::usage::{NoopUsageRecorder, UsageRecorder, UsageSample};
use super::{GatewayError, ToolChoiceMode};

/// One tool spec offered to the model in tool-calling mode.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// One tool invocation the model requested.
#[derive(Debug, Clone)]
pub struct ToolCallRequest {
    pub call_id: String,
    pub name: String,
    pub arguments: Value,
}

/// Outcome of one tool-calling-mode Gateway invocation: either the model produced
/// a final message, or it wants one or more tools invoked first.
#[derive(Debug, Clone)]
pub enum ToolInvocationOutcome {
    Final(Message),
    Calls(Vec<ToolCallRequest>),
}

/// Result of executing a tool call, appended as a tool-role Message by the caller.
#[derive(Debug, Clone)]
pub struct ToolCallResult {
    pub call_id: String,
    pub content: String,
}

/// Low-level, single-provider, single-shot client. Implementations:
/// [`super::MockProvider`] (deterministic, for tests) and
/// [`super::OpenAiProvider`] (the real provider, via `async-openai`).
///
/// Each method may raise any [`GatewayError`] variant; [`LlmGateway`] is
/// responsible for retrying the transient ones (`Timeout`, `RateLimited`).
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn model_id(&self) -> &str;

    async fn invoke_plain(
        &self,
        system_prompt: &str,
        history: &[Message],
    ) -> Result<(Message, Option<(u32, u32)>), GatewayError>;

    async fn invoke_structured(
        &self,
        system_prompt: &str,
        history: &[Message],
        schema_name: &str,
        schema: &Value,
    ) -> Result<(Value, Option<(u32, u32)>), GatewayError>;

    async fn invoke_tools(
        &self,
        system_prompt: &str,
        history: &[Message],
        tools: &[ToolSpec],
        tool_choice: ToolChoiceMode,
    ) -> Result<(ToolInvocationOutcome, Option<(u32, u32)>), GatewayError>;
}

/// Uniform Gateway: wraps a [`ProviderClient`], retries `Timeout`/`RateLimited`
/// with bounded exponential backoff, and records a [`UsageSample`] per call.
pub struct LlmGateway {
    provider: Arc<dyn ProviderClient>,
    usage: Arc<dyn UsageRecorder>,
    max_retries: u32,
    base_backoff: Duration,
    deadline: Duration,
}

impl LlmGateway {
    pub fn new(provider: Arc<dyn ProviderClient>) -> Self {
        Self {
            provider,
            usage: Arc::new(NoopUsageRecorder),
            max_retries: 3,
            base_backoff: Duration::from_millis(200),
            deadline: Duration::from_secs(60),
        }
    }

    pub fn with_usage_recorder(mut self, usage: Arc<dyn UsageRecorder>) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// Per-invocation deadline (spec.md §5 "Timeouts": "Each LLM invocation
    /// ... has an independent deadline"). Expiry is treated as a transient
    /// `GatewayError::Timeout`, so `with_retry` retries it like any other.
    pub fn with_llm_timeout(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Races `fut` against the configured deadline, collapsing expiry into
    /// `GatewayError::Timeout`.
    async fn with_deadline<T>(&self, fut: impl std::future::Future<Output = Result<T, GatewayError>>) -> Result<T, GatewayError> {
        match tokio::time::timeout(self.deadline, fut).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout),
        }
    }

    pub fn model_id(&self) -> &str {
        self.provider.model_id()
    }

    async fn with_retry<T, F, Fut>(&self, mut call: F) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, GatewayError>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let backoff = self.base_backoff * 2u32.pow(attempt);
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn record_usage(
        &self,
        agent: &str,
        thread_id: &str,
        tokens: Option<(u32, u32)>,
        latency_ms: u64,
    ) {
        let (input_tokens, output_tokens) = tokens.unwrap_or((0, 0));
        self.usage
            .record(UsageSample {
                agent: agent.to_string(),
                model: self.provider.model_id().to_string(),
                input_tokens,
                output_tokens,
                latency_ms,
                thread_id: thread_id.to_string(),
            })
            .await;
    }

    pub async fn plain(
        &self,
        agent: &str,
        thread_id: &str,
        system_prompt: &str,
        history: &[Message],
    ) -> Result<Message, GatewayError> {
        let span = info_span!("llm_invoke", agent, thread_id, model = self.provider.model_id(), mode = "plain");
        async {
            let start = std::time::Instant::now();
            let (msg, tokens) = self
                .with_retry(|| self.with_deadline(self.provider.invoke_plain(system_prompt, history)))
                .await?;
            self.record_usage(agent, thread_id, tokens, start.elapsed().as_millis() as u64)
                .await;
            Ok(msg)
        }
        .instrument(span)
        .await
    }

    pub async fn structured(
        &self,
        agent: &str,
        thread_id: &str,
        system_prompt: &str,
        history: &[Message],
        schema_name: &str,
        schema: &Value,
    ) -> Result<Value, GatewayError> {
        let span = info_span!("llm_invoke", agent, thread_id, model = self.provider.model_id(), mode = "structured");
        async {
            let start = std::time::Instant::now();
            let (value, tokens) = self
                .with_retry(|| self.with_deadline(self.provider.invoke_structured(system_prompt, history, schema_name, schema)))
                .await?;
            self.record_usage(agent, thread_id, tokens, start.elapsed().as_millis() as u64)
                .await;
            Ok(value)
        }
        .instrument(span)
        .await
    }

    pub async fn tools(
        &self,
        agent: &str,
        thread_id: &str,
        system_prompt: &str,
        history: &[Message],
        tool_specs: &[ToolSpec],
        tool_choice: ToolChoiceMode,
    ) -> Result<ToolInvocationOutcome, GatewayError> {
        let span = info_span!("llm_invoke", agent, thread_id, model = self.provider.model_id(), mode = "tools");
        async {
            let start = std::time::Instant::now();
            let (outcome, tokens) = self
                .with_retry(|| self.with_deadline(self.provider.invoke_tools(system_prompt, history, tool_specs, tool_choice)))
                .await?;
            self.record_usage(agent, thread_id, tokens, start.elapsed().as_millis() as u64)
                .await;
            Ok(outcome)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockProvider;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyThenOk {
        failures_left: AtomicU32,
    }

    #[async_trait]
    impl ProviderClient for FlakyThenOk {
        fn model_id(&self) -> &str {
            "flaky"
        }

        async fn invoke_plain(
            &self,
            _system_prompt: &str,
            _history: &[Message],
        ) -> Result<(Message, Option<(u32, u32)>), GatewayError> {
            if self.failures_left.fetch_sub(1, Ordering::SeqCst) > 0 {
                return Err(GatewayError::Timeout);
            }
            Ok((Message::agent("X", "ok"), Some((1, 1))))
        }

        async fn invoke_structured(
            &self,
            _s: &str,
            _h: &[Message],
            _n: &str,
            _schema: &Value,
        ) -> Result<(Value, Option<(u32, u32)>), GatewayError> {
            unimplemented!()
        }

        async fn invoke_tools(
            &self,
            _s: &str,
            _h: &[Message],
            _t: &[ToolSpec],
            _c: ToolChoiceMode,
        ) -> Result<(ToolInvocationOutcome, Option<(u32, u32)>), GatewayError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn retries_transient_errors_then_succeeds() {
        let provider = Arc::new(FlakyThenOk {
            failures_left: AtomicU32::new(2),
        });
        let gw = LlmGateway::new(provider).with_max_retries(3);
        let result = gw.plain("Builder", "t1", "sys", &[]).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let provider = Arc::new(FlakyThenOk {
            failures_left: AtomicU32::new(100),
        });
        let gw = LlmGateway::new(provider).with_max_retries(2);
        let result = gw.plain("Builder", "t1", "sys", &[]).await;
        assert!(matches!(result, Err(GatewayError::Timeout)));
    }

    #[tokio::test]
    async fn non_transient_error_propagates_immediately() {
        let provider: Arc<dyn ProviderClient> = Arc::new(MockProvider::erroring(GatewayError::Unauthorized));
        let gw = LlmGateway::new(provider);
        let result = gw.plain("Builder", "t1", "sys", &[]).await;
        assert!(matches!(result, Err(GatewayError::Unauthorized)));
    }

    struct NeverResponds;

    #[async_trait]
    impl ProviderClient for NeverResponds {
        fn model_id(&self) -> &str {
            "slow"
        }

        async fn invoke_plain(
            &self,
            _system_prompt: &str,
            _history: &[Message],
        ) -> Result<(Message, Option<(u32, u32)>), GatewayError> {
            std::future::pending().await
        }

        async fn invoke_structured(
            &self,
            _s: &str,
            _h: &[Message],
            _n: &str,
            _schema: &Value,
        ) -> Result<(Value, Option<(u32, u32)>), GatewayError> {
            unimplemented!()
        }

        async fn invoke_tools(
            &self,
            _s: &str,
            _h: &[Message],
            _t: &[ToolSpec],
            _c: ToolChoiceMode,
        ) -> Result<(ToolInvocationOutcome, Option<(u32, u32)>), GatewayError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn a_call_exceeding_its_deadline_surfaces_as_timeout() {
        let gw = LlmGateway::new(Arc::new(NeverResponds))
            .with_llm_timeout(Duration::from_millis(10))
            .with_max_retries(0);
        let result = gw.plain("Builder", "t1", "sys", &[]).await;
        assert!(matches!(result, Err(GatewayError::Timeout)));
    }
}
