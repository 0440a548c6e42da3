//! OpenAI-compatible provider implementing [`ProviderClient`].
//!
//! Built on `async_openai::Client<OpenAIConfig>`, covering the Gateway's three
//! modes: plain, structured via `response_format` JSON schema, and
//! tool-calling.

use async_trait::async_trait;
use serde_json::Value;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionMessageToolCalls, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        ChatCompletionResponseFormat, ChatCompletionResponseFormatJsonSchema,
        ChatCompletionTool, ChatCompletionToolChoiceOption, ChatCompletionTools,
        CreateChatCompletionRequestArgs, FunctionObject, ToolChoiceOptions,
    },
    Client,
};

use crate::message::Message;

use super::gateway::{ProviderClient, ToolCallRequest, ToolInvocationOutcome, ToolSpec};
use super::{GatewayError, ToolChoiceMode};

pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: Option<f32>,
}

impl OpenAiProvider {
    /// Builds a client using `OPENAI_API_KEY`/`OPENAI_BASE_URL` from the environment.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            model: model.into(),
            temperature: None,
        }
    }

    pub fn with_config(config: OpenAIConfig, model: impl Into<String>) -> Self {
        Self {
            client: Client::with_config(config),
            model: model.into(),
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn messages_to_request(system_prompt: &str, history: &[Message]) -> Vec<ChatCompletionRequestMessage> {
        let mut out = vec![ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessage::from(system_prompt),
        )];
        out.extend(history.iter().map(|m| match m.role {
            crate::message::Role::User => ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessage::from(m.content.as_str()),
            ),
            crate::message::Role::Agent => {
                ChatCompletionRequestMessage::Assistant(m.content.as_str().into())
            }
            crate::message::Role::Tool => ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessage::from(format!("[tool:{}] {}", m.author, m.content)),
            ),
        }));
        out
    }

    fn map_err(e: impl std::fmt::Display) -> GatewayError {
        let msg = e.to_string();
        let lower = msg.to_lowercase();
        if lower.contains("timeout") {
            GatewayError::Timeout
        } else if lower.contains("rate limit") || lower.contains("429") {
            GatewayError::RateLimited
        } else if lower.contains("unauthorized") || lower.contains("401") {
            GatewayError::Unauthorized
        } else {
            GatewayError::ProviderError(msg)
        }
    }
}

#[async_trait]
impl ProviderClient for OpenAiProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn invoke_plain(
        &self,
        system_prompt: &str,
        history: &[Message],
    ) -> Result<(Message, Option<(u32, u32)>), GatewayError> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model.clone());
        args.messages(Self::messages_to_request(system_prompt, history));
        if let Some(t) = self.temperature {
            args.temperature(t);
        }
        let request = args.build().map_err(Self::map_err)?;
        let response = self.client.chat().create(request).await.map_err(Self::map_err)?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::ProviderError("no choices returned".to_string()))?;
        let content = choice.message.content.unwrap_or_default();
        let tokens = response
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens));
        Ok((Message::agent("Assistant", content), tokens))
    }

    async fn invoke_structured(
        &self,
        system_prompt: &str,
        history: &[Message],
        schema_name: &str,
        schema: &Value,
    ) -> Result<(Value, Option<(u32, u32)>), GatewayError> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model.clone());
        args.messages(Self::messages_to_request(system_prompt, history));
        args.response_format(ChatCompletionResponseFormat::JsonSchema {
            json_schema: ChatCompletionResponseFormatJsonSchema {
                description: None,
                name: schema_name.to_string(),
                schema: Some(schema.clone()),
                strict: Some(true),
            },
        });
        if let Some(t) = self.temperature {
            args.temperature(t);
        }
        let request = args.build().map_err(Self::map_err)?;
        let response = self.client.chat().create(request).await.map_err(Self::map_err)?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::ProviderError("no choices returned".to_string()))?;
        let content = choice.message.content.unwrap_or_default();
        let value: Value = serde_json::from_str(&content)
            .map_err(|e| GatewayError::SchemaViolation(e.to_string()))?;
        let tokens = response
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens));
        Ok((value, tokens))
    }

    async fn invoke_tools(
        &self,
        system_prompt: &str,
        history: &[Message],
        tools: &[ToolSpec],
        tool_choice: ToolChoiceMode,
    ) -> Result<(ToolInvocationOutcome, Option<(u32, u32)>), GatewayError> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model.clone());
        args.messages(Self::messages_to_request(system_prompt, history));
        let chat_tools: Vec<ChatCompletionTools> = tools
            .iter()
            .map(|t| {
                ChatCompletionTools::Function(ChatCompletionTool {
                    function: FunctionObject {
                        name: t.name.clone(),
                        description: Some(t.description.clone()),
                        parameters: Some(t.parameters.clone()),
                        strict: None,
                    },
                })
            })
            .collect();
        args.tools(chat_tools);
        let mode = match tool_choice {
            ToolChoiceMode::Auto => ToolChoiceOptions::Auto,
            ToolChoiceMode::None => ToolChoiceOptions::None,
            ToolChoiceMode::Required => ToolChoiceOptions::Required,
        };
        args.tool_choice(ChatCompletionToolChoiceOption::Mode(mode));
        if let Some(t) = self.temperature {
            args.temperature(t);
        }
        let request = args.build().map_err(Self::map_err)?;
        let response = self.client.chat().create(request).await.map_err(Self::map_err)?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::ProviderError("no choices returned".to_string()))?;
        let msg = choice.message;
        let tool_calls: Vec<ToolCallRequest> = msg
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .filter_map(|tc| match tc {
                ChatCompletionMessageToolCalls::Function(f) => Some(ToolCallRequest {
                    call_id: f.id,
                    name: f.function.name,
                    arguments: serde_json::from_str(&f.function.arguments).unwrap_or(Value::Null),
                }),
            })
            .collect();
        let tokens = response
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens));
        let outcome = if tool_calls.is_empty() {
            ToolInvocationOutcome::Final(Message::agent("Assistant", msg.content.unwrap_or_default()))
        } else {
            ToolInvocationOutcome::Calls(tool_calls)
        };
        Ok((outcome, tokens))
    }
}
