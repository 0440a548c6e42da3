//! `POST /chat` (run to completion, return the final state) and
//! `POST /chat/stream` (run concurrently, project lifecycle events as SSE),
//! spec.md §6.
//!
//! The run is spawned and its event channel drained into the transport as an
//! SSE `Event` per [`engine::stream::LifecycleEvent`].

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use engine::stream::{EventBus, LifecycleEvent, StreamWriter};
use serde::{Deserialize, Serialize};
use stream_event::Envelope;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub thread_id: Option<String>,
    pub message: String,
}

/// Shape of `POST /chat`'s response body (spec.md §6): `threadId`, `result`,
/// `contributors`, `history`, plus a few extra fields the spec doesn't name
/// but a client driving the state machine across turns still needs.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub thread_id: String,
    /// The turn's outcome message: the last entry in `history`. For a thread
    /// that finishes without any agent reply (spec.md §8 S1), `history`'s
    /// last entry is still the opening user message, so this echoes it.
    pub result: String,
    pub contributors: std::collections::BTreeSet<String>,
    pub history: Vec<engine::Message>,
    pub next: String,
    pub turn_count: u32,
    pub requires_approval: bool,
}

impl From<engine::ConversationState> for ChatResponse {
    fn from(state: engine::ConversationState) -> Self {
        let result = state.messages.last().map(|m| m.content.clone()).unwrap_or_default();
        Self {
            thread_id: state.thread_id,
            result,
            contributors: state.contributors,
            history: state.messages,
            next: state.next.to_string(),
            turn_count: state.turn_count,
            requires_approval: state.requires_approval,
        }
    }
}

/// Runs a thread to completion (or to its next suspension point) and returns
/// the resulting state in one response.
pub async fn chat(State(state): State<Arc<AppState>>, Json(req): Json<ChatRequest>) -> Result<impl IntoResponse, ApiError> {
    state.metrics.record_request();
    let result = state.executor.run(req.thread_id, Some(req.message), StreamWriter::noop()).await?;
    Ok(Json(ChatResponse::from(result)))
}

/// Same run, but streamed: spawns the run against a fresh [`EventBus`] and
/// projects every [`LifecycleEvent`] it emits as one SSE frame, closing the
/// stream on `done` or `error` (spec.md §4.7, §6).
pub async fn chat_stream(State(state): State<Arc<AppState>>, Json(req): Json<ChatRequest>) -> impl IntoResponse {
    state.metrics.record_request();
    let bus = Arc::new(EventBus::default());
    let writer = StreamWriter::new(bus.clone());

    let executor = state.executor.clone();
    tokio::spawn(async move {
        let _ = executor.run(req.thread_id, Some(req.message), writer).await;
    });

    let stream = async_stream::stream! {
        let mut envelope = Envelope::new();
        let mut event_id = 0u64;
        loop {
            let event = bus.next().await;
            let done = matches!(event, LifecycleEvent::Done | LifecycleEvent::Error { .. });
            let name = event_name(&event);
            let mut payload = serde_json::to_value(&event).unwrap_or(serde_json::Value::Null);
            event_id += 1;
            envelope = std::mem::take(&mut envelope).with_event_id(event_id);
            envelope.inject_into(&mut payload);
            yield Ok::<Event, Infallible>(Event::default().event(name).json_data(payload).unwrap_or_default());
            if done {
                break;
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

fn event_name(event: &LifecycleEvent) -> &'static str {
    match event {
        LifecycleEvent::Thread { .. } => "thread",
        LifecycleEvent::AgentStart { .. } => "agent_start",
        LifecycleEvent::Chunk { .. } => "chunk",
        LifecycleEvent::AgentEnd { .. } => "agent_end",
        LifecycleEvent::Handoff { .. } => "handoff",
        LifecycleEvent::Tool { .. } => "tool",
        LifecycleEvent::Error { .. } => "error",
        LifecycleEvent::Done => "done",
    }
}
