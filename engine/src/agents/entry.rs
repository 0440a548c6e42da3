use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One registered agent: a name, a prompt, a model binding, and optionally
/// tools and a structured-output schema (spec.md §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEntry {
    pub name: String,
    pub role_description: String,
    pub system_prompt: String,
    pub model_id: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub structured_output_schema: Option<Value>,
    /// Keywords the L3 rule-based router matches against the latest user
    /// message (populated for plugin agents; built-in team members carry
    /// their own fixed entries in the router's keyword table instead).
    #[serde(default)]
    pub router_hints: Vec<String>,
    /// `true` for plugin agents loaded from a manifest, `false` for the
    /// static built-in team.
    #[serde(default)]
    pub is_plugin: bool,
}

impl AgentEntry {
    pub fn new(
        name: impl Into<String>,
        role_description: impl Into<String>,
        system_prompt: impl Into<String>,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role_description: role_description.into(),
            system_prompt: system_prompt.into(),
            model_id: model_id.into(),
            temperature: None,
            tools: Vec::new(),
            structured_output_schema: None,
            router_hints: Vec::new(),
            is_plugin: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_tools(mut self, tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_structured_output_schema(mut self, schema: Value) -> Self {
        self.structured_output_schema = Some(schema);
        self
    }

    pub fn with_router_hints(mut self, hints: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.router_hints = hints.into_iter().map(Into::into).collect();
        self
    }

    pub fn as_plugin(mut self) -> Self {
        self.is_plugin = true;
        self
    }
}
