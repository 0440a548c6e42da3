use thiserror::Error;

/// Failure taxonomy for tool execution (spec.md §4.3, §7).
#[derive(Debug, Error, Clone)]
pub enum ToolError {
    #[error("path escapes workspace root: {0}")]
    OutsideWorkspace(String),
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("response too large: {0} bytes")]
    ResponseTooLarge(usize),
}
