//! Checkpointer trait: saves and loads checkpoints by `thread_id`.
//!
//! One concrete state type and a `(thread_id, step)` key — no generic state
//! parameter or checkpoint namespace, since this engine's graph state shape is
//! fixed.

use async_trait::async_trait;
use thiserror::Error;

use super::checkpoint::Checkpoint;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("thread_id required")]
    ThreadIdRequired,
    #[error("serialization: {0}")]
    Serialization(String),
    #[error("storage: {0}")]
    Storage(String),
    #[error("not found: {0}")]
    NotFound(String),
}

/// Persists and retrieves per-thread checkpoints. Implementations: [`super::MemorySaver`]
/// (in-memory, for tests), [`super::SqliteSaver`] (durable, the default).
///
/// **Interaction**: held by `engine::executor::Executor`; `put` is called once per
/// super-step, `latest` is called on resume (§4.6).
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Persists `checkpoint`. `(thread_id, step)` must be unique; implementations
    /// may overwrite an existing row with the same key (used by re-runs in tests).
    async fn put(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError>;

    /// Loads the checkpoint with the highest `step` for `thread_id`, or `None` if
    /// the thread has no checkpoints yet.
    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointError>;

    /// Loads every checkpoint for `thread_id` in ascending `step` order. Used by
    /// `GET /state/{id}` debugging and by resume-correctness tests (spec.md §8 property 6).
    async fn history(&self, thread_id: &str) -> Result<Vec<Checkpoint>, CheckpointError>;
}
