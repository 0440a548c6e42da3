//! Tool Registry: named side-effect-capable operations an agent may invoke
//! (spec.md §4.3): the five categories it names — fs, shell, http, test
//! runner — plus the workspace sandbox every file tool must enforce.

mod context;
mod error;
mod fs_tools;
mod http_tool;
mod registry;
mod shell_tool;
mod test_runner_tool;

pub use context::ToolCallContext;
pub use error::ToolError;
pub use registry::{ToolRegistry, ToolSpec};

pub use fs_tools::{GlobTool, GrepTool, ListDirTool, ReadFileTool, WriteFileTool};
pub use http_tool::HttpFetchTool;
pub use shell_tool::ShellTool;
pub use test_runner_tool::TestRunnerTool;

use async_trait::async_trait;
use serde_json::Value;

/// One side-effect-capable operation an agent may invoke. Implementations:
/// the `fs_tools`/`shell_tool`/`http_tool`/`test_runner_tool` modules.
///
/// **Interaction**: registered into a [`ToolRegistry`]; invoked by an agent
/// node's tool-calling loop (spec.md §4.3) via `ToolRegistry::call`.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON Schema describing this tool's arguments, offered to the LLM Gateway
    /// in tool-calling mode.
    fn parameters_schema(&self) -> Value;
    async fn call(&self, args: Value, ctx: &ToolCallContext) -> Result<String, ToolError>;
}
