//! SQLite-backed checkpointer. Persistent across process restarts; the default
//! backend configured via `EngineConfig::checkpoint_db_path`.
//!
//! Every operation runs inside `spawn_blocking` since `rusqlite` is synchronous.
//! Schema: `(thread_id TEXT, step INTEGER, created_at TIMESTAMP, state BLOB)`
//! with composite primary key `(thread_id, step)` and an index on `thread_id`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::state::ConversationState;

use super::checkpoint::Checkpoint;
use super::checkpointer::{CheckpointError, Checkpointer};

pub struct SqliteSaver {
    db_path: PathBuf,
}

impl SqliteSaver {
    /// Opens (creating if absent) the checkpoint database at `path` and ensures
    /// the `checkpoints` table and its `thread_id` index exist.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        let db_path = path.as_ref().to_path_buf();
        let conn = rusqlite::Connection::open(&db_path)
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS checkpoints (
                thread_id  TEXT NOT NULL,
                step       INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                state      BLOB NOT NULL,
                PRIMARY KEY (thread_id, step)
            )
            "#,
            [],
        )
        .map_err(|e| CheckpointError::Storage(e.to_string()))?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_checkpoints_thread_id ON checkpoints(thread_id)",
            [],
        )
        .map_err(|e| CheckpointError::Storage(e.to_string()))?;
        Ok(Self { db_path })
    }

    fn row_to_checkpoint(
        thread_id: String,
        step: i64,
        created_at: String,
        state_blob: Vec<u8>,
    ) -> Result<Checkpoint, CheckpointError> {
        let state: ConversationState = serde_json::from_slice(&state_blob)
            .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
        let created_at: DateTime<Utc> = created_at
            .parse()
            .map_err(|e: chrono::ParseError| CheckpointError::Serialization(e.to_string()))?;
        Ok(Checkpoint {
            thread_id,
            step: step as u64,
            created_at,
            state,
        })
    }
}

#[async_trait]
impl Checkpointer for SqliteSaver {
    async fn put(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let db_path = self.db_path.clone();
        let thread_id = checkpoint.thread_id.clone();
        let step = checkpoint.step as i64;
        let created_at = checkpoint.created_at.to_rfc3339();
        let blob = serde_json::to_vec(&checkpoint.state)
            .map_err(|e| CheckpointError::Serialization(e.to_string()))?;

        tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path)
                .map_err(|e| CheckpointError::Storage(e.to_string()))?;
            conn.execute(
                "INSERT OR REPLACE INTO checkpoints (thread_id, step, created_at, state)
                 VALUES (?1, ?2, ?3, ?4)",
                params![thread_id, step, created_at, blob],
            )
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| CheckpointError::Storage(e.to_string()))?
    }

    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        let db_path = self.db_path.clone();
        let thread_id = thread_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path)
                .map_err(|e| CheckpointError::Storage(e.to_string()))?;
            let mut stmt = conn
                .prepare(
                    "SELECT thread_id, step, created_at, state FROM checkpoints
                     WHERE thread_id = ?1 ORDER BY step DESC LIMIT 1",
                )
                .map_err(|e| CheckpointError::Storage(e.to_string()))?;
            let mut rows = stmt
                .query(params![thread_id])
                .map_err(|e| CheckpointError::Storage(e.to_string()))?;
            match rows
                .next()
                .map_err(|e| CheckpointError::Storage(e.to_string()))?
            {
                Some(row) => {
                    let thread_id: String =
                        row.get(0).map_err(|e| CheckpointError::Storage(e.to_string()))?;
                    let step: i64 = row.get(1).map_err(|e| CheckpointError::Storage(e.to_string()))?;
                    let created_at: String =
                        row.get(2).map_err(|e| CheckpointError::Storage(e.to_string()))?;
                    let state: Vec<u8> =
                        row.get(3).map_err(|e| CheckpointError::Storage(e.to_string()))?;
                    Ok(Some(Self::row_to_checkpoint(thread_id, step, created_at, state)?))
                }
                None => Ok(None),
            }
        })
        .await
        .map_err(|e| CheckpointError::Storage(e.to_string()))?
    }

    async fn history(&self, thread_id: &str) -> Result<Vec<Checkpoint>, CheckpointError> {
        let db_path = self.db_path.clone();
        let thread_id = thread_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path)
                .map_err(|e| CheckpointError::Storage(e.to_string()))?;
            let mut stmt = conn
                .prepare(
                    "SELECT thread_id, step, created_at, state FROM checkpoints
                     WHERE thread_id = ?1 ORDER BY step ASC",
                )
                .map_err(|e| CheckpointError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map(params![thread_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                    ))
                })
                .map_err(|e| CheckpointError::Storage(e.to_string()))?;
            let mut out = Vec::new();
            for row in rows {
                let (thread_id, step, created_at, state) =
                    row.map_err(|e| CheckpointError::Storage(e.to_string()))?;
                out.push(Self::row_to_checkpoint(thread_id, step, created_at, state)?);
            }
            Ok(out)
        })
        .await
        .map_err(|e| CheckpointError::Storage(e.to_string()))?
    }
}
