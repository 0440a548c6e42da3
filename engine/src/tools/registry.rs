//! Name → [`Tool`] map. Read-mostly; registration happens at process start.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use super::context::ToolCallContext;
use super::error::ToolError;
use super::Tool;

/// A tool's declared shape, offered to the LLM Gateway in tool-calling mode
/// (spec.md §4.2's `tool-calling` invocation).
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: DashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|e| e.value().clone())
    }

    /// All registered tool specs, in the shape the Gateway's tool-calling
    /// mode needs.
    pub fn list(&self) -> Vec<ToolSpec> {
        self.tools
            .iter()
            .map(|e| ToolSpec {
                name: e.value().name().to_string(),
                description: e.value().description().to_string(),
                parameters: e.value().parameters_schema(),
            })
            .collect()
    }

    pub async fn call(
        &self,
        name: &str,
        args: Value,
        ctx: &ToolCallContext,
    ) -> Result<String, ToolError> {
        let tool = self
            .lookup(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tokio::time::timeout(ctx.tool_timeout, tool.call(args, ctx))
            .await
            .map_err(|_| ToolError::Timeout(ctx.tool_timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes its input"
        }
        fn parameters_schema(&self) -> Value {
            serde_json::json!({"type": "object"})
        }
        async fn call(&self, args: Value, _ctx: &ToolCallContext) -> Result<String, ToolError> {
            Ok(args.to_string())
        }
    }

    #[tokio::test]
    async fn register_then_call_round_trips() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(Echo));
        let ctx = ToolCallContext::new("/workspace", "t1");
        let result = registry.call("echo", serde_json::json!({"a": 1}), &ctx).await.unwrap();
        assert_eq!(result, "{\"a\":1}");
    }

    #[tokio::test]
    async fn call_unknown_tool_fails_with_not_found() {
        let registry = ToolRegistry::new();
        let ctx = ToolCallContext::new("/workspace", "t1");
        let err = registry.call("ghost", Value::Null, &ctx).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[test]
    fn list_reflects_registered_tools() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(Echo));
        let specs = registry.list();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "echo");
    }
}
