//! In-memory checkpointer: no persistence across process restarts. Used by
//! tests and by the deterministic scenarios in spec.md §8 that don't exercise
//! the SQLite backend directly.

use async_trait::async_trait;
use dashmap::DashMap;

use super::checkpoint::Checkpoint;
use super::checkpointer::{CheckpointError, Checkpointer};

#[derive(Default)]
pub struct MemorySaver {
    threads: DashMap<String, Vec<Checkpoint>>,
}

impl MemorySaver {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for MemorySaver {
    async fn put(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let mut entry = self.threads.entry(checkpoint.thread_id.clone()).or_default();
        if let Some(existing) = entry.iter_mut().find(|c| c.step == checkpoint.step) {
            *existing = checkpoint.clone();
        } else {
            entry.push(checkpoint.clone());
        }
        Ok(())
    }

    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        Ok(self
            .threads
            .get(thread_id)
            .and_then(|v| v.iter().max_by_key(|c| c.step).cloned()))
    }

    async fn history(&self, thread_id: &str) -> Result<Vec<Checkpoint>, CheckpointError> {
        let mut list = self
            .threads
            .get(thread_id)
            .map(|v| v.clone())
            .unwrap_or_default();
        list.sort_by_key(|c| c.step);
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use crate::state::ConversationState;

    fn state(step: u64) -> ConversationState {
        let mut s = ConversationState::new("t1", Message::user("hi"));
        s.turn_count = step as u32;
        s
    }

    #[tokio::test]
    async fn latest_returns_highest_step() {
        let saver = MemorySaver::new();
        saver.put(&Checkpoint::new("t1", 0, state(0))).await.unwrap();
        saver.put(&Checkpoint::new("t1", 1, state(1))).await.unwrap();
        let latest = saver.latest("t1").await.unwrap().unwrap();
        assert_eq!(latest.step, 1);
    }

    #[tokio::test]
    async fn latest_none_for_unknown_thread() {
        let saver = MemorySaver::new();
        assert!(saver.latest("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn history_is_step_ordered() {
        let saver = MemorySaver::new();
        saver.put(&Checkpoint::new("t1", 1, state(1))).await.unwrap();
        saver.put(&Checkpoint::new("t1", 0, state(0))).await.unwrap();
        let history = saver.history("t1").await.unwrap();
        assert_eq!(history.iter().map(|c| c.step).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[tokio::test]
    async fn put_same_step_overwrites() {
        let saver = MemorySaver::new();
        saver.put(&Checkpoint::new("t1", 0, state(0))).await.unwrap();
        saver.put(&Checkpoint::new("t1", 0, state(5))).await.unwrap();
        let latest = saver.latest("t1").await.unwrap().unwrap();
        assert_eq!(latest.state.turn_count, 5);
    }
}
