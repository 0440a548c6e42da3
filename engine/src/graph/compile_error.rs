use thiserror::Error;

/// Errors raised building a [`super::CompiledStateGraph`] from a
/// [`super::StateGraph`], trimmed to the variants this engine's fixed
/// node/edge table can actually produce.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompilationError {
    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("graph has no edge from START")]
    MissingStart,

    #[error("graph has no path to END")]
    MissingEnd,

    #[error("invalid chain: {0}")]
    InvalidChain(String),

    #[error("node `{0}` has both an unconditional edge and a conditional edge")]
    NodeHasBothEdgeAndConditional(String),

    #[error("conditional path map for `{0}` has an invalid target")]
    InvalidConditionalPathMap(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_name_the_offending_node() {
        assert_eq!(
            CompilationError::NodeNotFound("Ghost".into()).to_string(),
            "node not found: Ghost"
        );
        assert_eq!(CompilationError::MissingStart.to_string(), "graph has no edge from START");
    }
}
