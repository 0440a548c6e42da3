//! Test runner tool: shells out to a configurable test command inside the
//! workspace and reports pass/fail plus captured output (SPEC_FULL.md §4.3's
//! Tool Registry supplement). Reuses the shell tool's process-spawning shape
//! ([`super::shell_tool::ShellTool`]) rather than duplicating it.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{ToolCallContext, ToolError};
use crate::tools::Tool;

pub struct TestRunnerTool {
    default_command: String,
}

impl Default for TestRunnerTool {
    fn default() -> Self {
        Self { default_command: "cargo test".to_string() }
    }
}

impl TestRunnerTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_command(command: impl Into<String>) -> Self {
        Self { default_command: command.into() }
    }
}

#[async_trait]
impl Tool for TestRunnerTool {
    fn name(&self) -> &str {
        "test_runner"
    }
    fn description(&self) -> &str {
        "Run the project's test suite in the workspace and report pass/fail with captured output."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {"type": "string", "description": "overrides the configured default test command"}
            }
        })
    }

    async fn call(&self, args: Value, ctx: &ToolCallContext) -> Result<String, ToolError> {
        let command = args
            .get("command")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.default_command);

        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(&ctx.workspace_root)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());

        let output = tokio::time::timeout(ctx.tool_timeout, cmd.output())
            .await
            .map_err(|_| ToolError::Timeout(ctx.tool_timeout))?
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let verdict = if output.status.success() { "PASS" } else { "FAIL" };
        Ok(format!("{verdict}\nstdout:\n{stdout}\nstderr:\n{stderr}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_pass_on_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolCallContext::new(dir.path(), "t1");
        let tool = TestRunnerTool::with_default_command("true");
        let out = tool.call(json!({}), &ctx).await.unwrap();
        assert!(out.starts_with("PASS"));
    }

    #[tokio::test]
    async fn reports_fail_on_nonzero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolCallContext::new(dir.path(), "t1");
        let tool = TestRunnerTool::with_default_command("false");
        let out = tool.call(json!({}), &ctx).await.unwrap();
        assert!(out.starts_with("FAIL"));
    }

    #[tokio::test]
    async fn command_argument_overrides_default() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolCallContext::new(dir.path(), "t1");
        let tool = TestRunnerTool::new();
        let out = tool.call(json!({"command": "echo custom && true"}), &ctx).await.unwrap();
        assert!(out.contains("custom"));
        assert!(out.starts_with("PASS"));
    }
}
