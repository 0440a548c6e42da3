//! Multi-agent orchestration engine: Conversation State, Agent/Tool Registries,
//! the LLM Gateway, the Routing Engine, the Safety Envelope, the checkpointed
//! Graph Executor, and the Event Bus (spec.md §2).
//!
//! `server` is the only consumer of this crate; it owns the HTTP surface and
//! process wiring, while everything here is plain library code with no
//! network listener of its own.

pub mod agents;
pub mod artifact;
pub mod channels;
pub mod error;
pub mod executor;
pub mod graph;
pub mod llm;
pub mod memory;
pub mod message;
pub mod router;
pub mod safety;
pub mod state;
pub mod stream;
pub mod tools;

pub use error::ExecutorError;
pub use executor::{Executor, ExecutorConfig};
pub use message::Message;
pub use state::{ConversationDelta, ConversationState, Decision};
