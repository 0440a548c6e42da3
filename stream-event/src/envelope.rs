//! A monotonic `event_id` injected into every SSE frame, so a reconnecting
//! client can resume from the last id it saw.

use serde_json::Value;

/// Envelope fields merged into an outgoing event payload.
#[derive(Clone, Debug, Default)]
pub struct Envelope {
    pub event_id: Option<u64>,
}

impl Envelope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event_id(mut self, id: u64) -> Self {
        self.event_id = Some(id);
        self
    }

    /// Merges envelope fields into the given JSON object (top-level only).
    /// Does not overwrite existing keys.
    pub fn inject_into(&self, obj: &mut Value) {
        let Some(obj) = obj.as_object_mut() else {
            return;
        };
        if let Some(id) = self.event_id {
            obj.entry("event_id").or_insert_with(|| Value::Number(serde_json::Number::from(id)));
        }
    }
}
