//! Artifacts: typed structured outputs an agent emits (PRD, TechPlan, ...), and the
//! SubTask record used by the optional hierarchical dispatch mode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The closed set of artifact kinds a specialist agent may produce. Each kind's own
/// schema is carried inside `Artifact::data`; the kind tag is what lets a client (or a
/// later agent) discriminate without parsing the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Prd,
    TechPlan,
    SecurityReview,
    CodeReview,
    TestPlan,
}

/// A structured output emitted by an agent. Artifacts are append-only: once produced,
/// an artifact is never mutated or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub data: Value,
}

impl Artifact {
    pub fn new(kind: ArtifactKind, author: impl Into<String>, data: Value) -> Self {
        Self {
            kind,
            author: author.into(),
            created_at: Utc::now(),
            data,
        }
    }
}

/// Status of one SubTask in the hierarchical dispatch mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubTaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// One unit of work handed from a Supervisor to a named worker agent. Dispatched
/// strictly sequentially by the dispatcher node (see DESIGN.md Open Question #2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTask {
    pub id: String,
    pub worker: String,
    pub description: String,
    pub context: String,
    pub status: SubTaskStatus,
    pub result: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SubTask {
    pub fn new(id: impl Into<String>, worker: impl Into<String>, description: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            worker: worker.into(),
            description: description.into(),
            context: context.into(),
            status: SubTaskStatus::Pending,
            result: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn complete(&mut self, result: impl Into<String>) {
        self.status = SubTaskStatus::Completed;
        self.result = Some(result.into());
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, result: impl Into<String>) {
        self.status = SubTaskStatus::Failed;
        self.result = Some(result.into());
        self.completed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtask_starts_pending() {
        let t = SubTask::new("t1", "Builder", "implement login", "ctx");
        assert_eq!(t.status, SubTaskStatus::Pending);
        assert!(t.result.is_none());
    }

    #[test]
    fn complete_sets_status_and_timestamp() {
        let mut t = SubTask::new("t1", "Builder", "implement login", "ctx");
        t.complete("done");
        assert_eq!(t.status, SubTaskStatus::Completed);
        assert_eq!(t.result.as_deref(), Some("done"));
        assert!(t.completed_at.is_some());
    }
}
