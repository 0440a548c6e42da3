//! The checkpointed graph executor's static structure: nodes, edges, and the
//! validated, runnable form they compile into.
//!
//! One fixed node/edge table spec.md §4.6 describes: Router plus one node per
//! registered agent, compiled exactly once by [`crate::executor`].

mod compile_error;
mod compiled;
mod conditional;
mod node;
mod retry;
mod run_context;
mod state_graph;

pub use compile_error::CompilationError;
pub use compiled::CompiledStateGraph;
pub use conditional::{ConditionalRouter, ConditionalRouterFn, NextEntry};
pub use node::Node;
pub use retry::RetryPolicy;
pub use run_context::RunContext;
pub use state_graph::{StateGraph, END, START};
