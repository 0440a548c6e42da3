//! Conversation message: who said what, and when.
//!
//! Every message carries a role/author/content/payload/timestamp — attributed
//! to a specific agent or tool, not just a generic role — so the Conversation
//! State can answer "who contributed this" during routing and replay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Agent,
    Tool,
}

/// A single entry in the conversation. Messages are append-only within a thread: a node
/// must never rewrite or delete a prior message, only push new ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    /// Agent or tool name that authored this message. "User" for user messages,
    /// "System" for engine-level failures that have no owning agent.
    pub author: String,
    pub content: String,
    /// Optional structured payload (e.g. a tool call's argument record, or a tool
    /// result's parsed JSON) alongside the human-readable `content`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            author: "User".to_string(),
            content: content.into(),
            payload: None,
            timestamp: Utc::now(),
        }
    }

    pub fn agent(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            author: author.into(),
            content: content.into(),
            payload: None,
            timestamp: Utc::now(),
        }
    }

    pub fn tool(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            author: author.into(),
            content: content.into(),
            payload: None,
            timestamp: Utc::now(),
        }
    }

    /// An engine-level failure message, authored by "System" per the error-handling design:
    /// messages surfaced to the user are always text authored by the failing agent, or
    /// "System" for failures with no single owning agent.
    pub fn system_error(content: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            author: "System".to_string(),
            content: content.into(),
            payload: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_role_and_author() {
        let m = Message::user("hi");
        assert_eq!(m.role, Role::User);
        assert_eq!(m.author, "User");

        let m = Message::agent("Builder", "ok");
        assert_eq!(m.role, Role::Agent);
        assert_eq!(m.author, "Builder");

        let m = Message::tool("grep", "3 matches");
        assert_eq!(m.role, Role::Tool);
        assert_eq!(m.author, "grep");
    }

    #[test]
    fn system_error_is_authored_by_system() {
        let m = Message::system_error("provider unavailable");
        assert_eq!(m.author, "System");
        assert_eq!(m.role, Role::Agent);
    }

    #[test]
    fn round_trips_through_json() {
        let m = Message::agent("Security", "no issues found").with_payload(serde_json::json!({"score": 9}));
        let s = serde_json::to_string(&m).unwrap();
        let back: Message = serde_json::from_str(&s).unwrap();
        assert_eq!(back, m);
    }
}
