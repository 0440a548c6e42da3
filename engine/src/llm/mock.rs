//! Deterministic provider client for tests: fixed responses, no network.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::message::Message;

use super::gateway::{ProviderClient, ToolCallRequest, ToolInvocationOutcome, ToolSpec};
use super::{GatewayError, ToolChoiceMode};

/// A scripted provider: returns queued plain/structured/tool responses in order,
/// or a fixed error on every call when constructed with [`MockProvider::erroring`].
pub struct MockProvider {
    model: String,
    plain_queue: Mutex<Vec<Message>>,
    structured_queue: Mutex<Vec<Value>>,
    tools_queue: Mutex<Vec<ToolInvocationOutcome>>,
    error: Option<GatewayError>,
}

impl MockProvider {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            plain_queue: Mutex::new(Vec::new()),
            structured_queue: Mutex::new(Vec::new()),
            tools_queue: Mutex::new(Vec::new()),
            error: None,
        }
    }

    pub fn erroring(error: GatewayError) -> Self {
        Self {
            model: "mock-error".to_string(),
            plain_queue: Mutex::new(Vec::new()),
            structured_queue: Mutex::new(Vec::new()),
            tools_queue: Mutex::new(Vec::new()),
            error: Some(error),
        }
    }

    pub fn with_plain_reply(self, message: Message) -> Self {
        self.plain_queue.lock().unwrap().push(message);
        self
    }

    pub fn with_structured_reply(self, value: Value) -> Self {
        self.structured_queue.lock().unwrap().push(value);
        self
    }

    pub fn with_tool_outcome(self, outcome: ToolInvocationOutcome) -> Self {
        self.tools_queue.lock().unwrap().push(outcome);
        self
    }

    pub fn with_final_message(self, author: &str, content: &str) -> Self {
        self.with_tool_outcome(ToolInvocationOutcome::Final(Message::agent(author, content)))
    }

    pub fn with_tool_call(self, call_id: &str, name: &str, arguments: Value) -> Self {
        self.with_tool_outcome(ToolInvocationOutcome::Calls(vec![ToolCallRequest {
            call_id: call_id.to_string(),
            name: name.to_string(),
            arguments,
        }]))
    }
}

#[async_trait]
impl ProviderClient for MockProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn invoke_plain(
        &self,
        _system_prompt: &str,
        _history: &[Message],
    ) -> Result<(Message, Option<(u32, u32)>), GatewayError> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        let mut queue = self.plain_queue.lock().unwrap();
        if queue.is_empty() {
            return Ok((Message::agent("Mock", ""), Some((0, 0))));
        }
        Ok((queue.remove(0), Some((10, 5))))
    }

    async fn invoke_structured(
        &self,
        _system_prompt: &str,
        _history: &[Message],
        _schema_name: &str,
        _schema: &Value,
    ) -> Result<(Value, Option<(u32, u32)>), GatewayError> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        let mut queue = self.structured_queue.lock().unwrap();
        if queue.is_empty() {
            return Err(GatewayError::SchemaViolation("mock queue empty".to_string()));
        }
        Ok((queue.remove(0), Some((10, 5))))
    }

    async fn invoke_tools(
        &self,
        _system_prompt: &str,
        _history: &[Message],
        _tools: &[ToolSpec],
        _tool_choice: ToolChoiceMode,
    ) -> Result<(ToolInvocationOutcome, Option<(u32, u32)>), GatewayError> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        let mut queue = self.tools_queue.lock().unwrap();
        if queue.is_empty() {
            return Ok((ToolInvocationOutcome::Final(Message::agent("Mock", "")), Some((0, 0))));
        }
        Ok((queue.remove(0), Some((10, 5))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn plain_reply_is_returned_then_falls_back_to_empty() {
        let provider = MockProvider::new("mock").with_plain_reply(Message::agent("Builder", "hi"));
        let (msg, _) = provider.invoke_plain("sys", &[]).await.unwrap();
        assert_eq!(msg.content, "hi");
        let (msg2, _) = provider.invoke_plain("sys", &[]).await.unwrap();
        assert_eq!(msg2.content, "");
    }

    #[tokio::test]
    async fn erroring_provider_always_fails() {
        let provider = MockProvider::erroring(GatewayError::Unauthorized);
        let result = provider.invoke_plain("sys", &[]).await;
        assert!(matches!(result, Err(GatewayError::Unauthorized)));
    }
}
