use std::collections::HashMap;
use std::sync::Arc;

use super::compile_error::CompilationError;
use super::compiled::CompiledStateGraph;
use super::conditional::{ConditionalRouter, ConditionalRouterFn, NextEntry};
use super::node::Node;
use super::retry::RetryPolicy;
use crate::memory::Checkpointer;

pub const START: &str = "__start__";
pub const END: &str = "__end__";

/// Builds the fixed node/edge table this engine always compiles: Router plus
/// one node per registered agent, wired per spec.md §4.6 (every agent edges
/// back to Router; Router's own edge is conditional on `state.next`; Builder's
/// edge is conditional on `needs_retry`, looping to itself or falling through
/// to Router).
///
/// spec.md §9 treats the graph as static data rather than a reusable builder
/// abstraction, so this type exists only to produce one [`CompiledStateGraph`]
/// per process (constructed once by the executor), still going through a
/// validate-then-compile step so a wiring mistake is caught as a
/// [`CompilationError`] rather than a panic deep in a super-step.
pub struct StateGraph {
    nodes: HashMap<String, Arc<dyn Node>>,
    edges: Vec<(String, String)>,
    conditional_edges: HashMap<String, ConditionalRouter>,
    start_target: Option<String>,
    checkpointer: Option<Arc<dyn Checkpointer>>,
    retry_policy: RetryPolicy,
}

impl Default for StateGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl StateGraph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: Vec::new(),
            conditional_edges: HashMap::new(),
            start_target: None,
            checkpointer: None,
            retry_policy: RetryPolicy::None,
        }
    }

    pub fn add_node(mut self, node: Arc<dyn Node>) -> Self {
        self.nodes.insert(node.id().to_string(), node);
        self
    }

    pub fn set_start(mut self, node_id: impl Into<String>) -> Self {
        self.start_target = Some(node_id.into());
        self
    }

    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push((from.into(), to.into()));
        self
    }

    pub fn add_conditional_edge(
        mut self,
        from: impl Into<String>,
        path: ConditionalRouterFn,
        path_map: Option<HashMap<String, String>>,
    ) -> Self {
        self.conditional_edges.insert(from.into(), ConditionalRouter::new(path, path_map));
        self
    }

    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn Checkpointer>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    fn node_exists_or_end(&self, id: &str) -> bool {
        id == END || self.nodes.contains_key(id)
    }

    pub fn compile(self) -> Result<CompiledStateGraph, CompilationError> {
        let first_node_id = self.start_target.clone().ok_or(CompilationError::MissingStart)?;
        if !self.nodes.contains_key(&first_node_id) {
            return Err(CompilationError::NodeNotFound(first_node_id));
        }

        for (from, to) in &self.edges {
            if from != START && !self.nodes.contains_key(from) {
                return Err(CompilationError::NodeNotFound(from.clone()));
            }
            if !self.node_exists_or_end(to) {
                return Err(CompilationError::NodeNotFound(to.clone()));
            }
            if self.conditional_edges.contains_key(from) {
                return Err(CompilationError::NodeHasBothEdgeAndConditional(from.clone()));
            }
        }

        for (from, router) in &self.conditional_edges {
            if !self.nodes.contains_key(from) {
                return Err(CompilationError::NodeNotFound(from.clone()));
            }
            if let Some(map) = router.path_map() {
                for target in map.values() {
                    if !self.node_exists_or_end(target) {
                        return Err(CompilationError::InvalidConditionalPathMap(from.clone()));
                    }
                }
            }
        }

        let reaches_end = self.edges.iter().any(|(_, to)| to == END) || !self.conditional_edges.is_empty();
        if !reaches_end {
            return Err(CompilationError::MissingEnd);
        }

        let mut next_map: HashMap<String, NextEntry> = HashMap::new();
        for (from, to) in &self.edges {
            if from == START {
                continue;
            }
            next_map.insert(from.clone(), NextEntry::Unconditional(to.clone()));
        }
        for (from, router) in self.conditional_edges {
            next_map.insert(from, NextEntry::Conditional(router));
        }

        for id in self.nodes.keys() {
            if !next_map.contains_key(id) {
                return Err(CompilationError::InvalidChain(format!(
                    "node `{id}` has no outgoing edge"
                )));
            }
        }

        Ok(CompiledStateGraph::new(
            self.nodes,
            first_node_id,
            next_map,
            self.checkpointer,
            self.retry_policy,
        ))
    }
}
