//! A single persisted snapshot of [`crate::state::ConversationState`].

use chrono::{DateTime, Utc};

use crate::state::ConversationState;

/// One row of the checkpoint table: `(thread_id, step, created_at, state)`.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub thread_id: String,
    pub step: u64,
    pub created_at: DateTime<Utc>,
    pub state: ConversationState,
}

impl Checkpoint {
    pub fn new(thread_id: impl Into<String>, step: u64, state: ConversationState) -> Self {
        Self {
            thread_id: thread_id.into(),
            step,
            created_at: Utc::now(),
            state,
        }
    }
}
