use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent already registered: {0}")]
    DuplicateName(String),
    #[error("unknown agent: {0}")]
    UnknownAgent(String),
    #[error("failed to load plugin manifest {path}: {message}")]
    PluginLoad { path: String, message: String },
}
