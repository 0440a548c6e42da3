//! Shell tool: runs a command inside the workspace with a bounded timeout,
//! capturing stdout/stderr/exit code.
//!
//! A single-shot `tokio::process::Command` invocation, raced against
//! `ctx.tool_timeout` via `tokio::time::timeout`.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{ToolCallContext, ToolError};
use crate::tools::Tool;

pub struct ShellTool;

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }
    fn description(&self) -> &str {
        "Run a shell command in the workspace directory. Bounded by a timeout; stdout, stderr, and exit code are returned."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {"type": "string"}
            },
            "required": ["command"]
        })
    }

    async fn call(&self, args: Value, ctx: &ToolCallContext) -> Result<String, ToolError> {
        let command = args
            .get("command")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArgs("missing `command`".to_string()))?;

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
        let code = output.status.code().unwrap_or(-1);
        Ok(format!("exit: {code}\nstdout:\n{stdout}\nstderr:\n{stderr}"))
    }
}
