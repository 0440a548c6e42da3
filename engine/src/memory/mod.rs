//! Checkpoint Store: durable key/value keyed by thread id, holding serialized
//! [`crate::state::ConversationState`] snapshots per super-step (spec.md §3, §6).
//!
//! One row per super-step: `(thread_id, step, created_at, state)` with composite
//! primary key `(thread_id, step)`. Latest checkpoint = row with maximum `step`.
//! No checkpoint namespaces or forking: this engine's graph has a single linear
//! history per thread, so a plain `(thread_id, step)` pair is enough.

mod checkpoint;
mod checkpointer;
mod memory_saver;
mod sqlite_saver;

pub use checkpoint::Checkpoint;
pub use checkpointer::{CheckpointError, Checkpointer};
pub use memory_saver::MemorySaver;
pub use sqlite_saver::SqliteSaver;
