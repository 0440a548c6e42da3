//! Top-level engine error. Each layer owns its own `thiserror` enum
//! (`GatewayError`, `ToolError`, `RouterError`, `CompilationError`, `CheckpointError`);
//! `ExecutorError` is the one every HTTP handler ultimately matches on.

use thiserror::Error;

use crate::graph::CompilationError;
use crate::llm::GatewayError;
use crate::memory::CheckpointError;
use crate::tools::ToolError;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("graph compilation failed: {0}")]
    Compilation(#[from] CompilationError),

    #[error("checkpoint store error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("llm gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("thread busy")]
    ThreadBusy,

    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    #[error("safety envelope tripped: {0}")]
    SafetyTripped(String),

    #[error("node execution failed: {0}")]
    NodeFailed(String),
}
