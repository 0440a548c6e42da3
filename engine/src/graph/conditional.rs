use std::collections::HashMap;
use std::sync::Arc;

use crate::state::ConversationState;

/// A closure deciding the next node id by reading the merged state, specialized
/// to this engine's one concrete state type.
pub type ConditionalRouterFn = Arc<dyn Fn(&ConversationState) -> String + Send + Sync>;

/// Resolves a conditional edge's target. `path` produces a key from the state;
/// when `path_map` is present the key is translated through it, otherwise the
/// key itself is used as the next node id directly — the shape this engine's
/// Router node needs, since the set of agent node ids is only fully known at
/// runtime (built-in team plus loaded plugins).
#[derive(Clone)]
pub struct ConditionalRouter {
    path: ConditionalRouterFn,
    path_map: Option<HashMap<String, String>>,
}

impl ConditionalRouter {
    pub fn new(path: ConditionalRouterFn, path_map: Option<HashMap<String, String>>) -> Self {
        Self { path, path_map }
    }

    pub fn resolve_next(&self, state: &ConversationState) -> String {
        let key = (self.path)(state);
        match &self.path_map {
            Some(map) => map.get(&key).cloned().unwrap_or(key),
            None => key,
        }
    }

    pub fn path_map(&self) -> Option<&HashMap<String, String>> {
        self.path_map.as_ref()
    }
}

/// A node's single outgoing route: either fixed, or resolved from state at
/// every super-step.
#[derive(Clone)]
pub enum NextEntry {
    Unconditional(String),
    Conditional(ConditionalRouter),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    fn state() -> ConversationState {
        ConversationState::new("t1", Message::user("hi"))
    }

    #[test]
    fn resolves_key_directly_with_no_path_map() {
        let router = ConditionalRouter::new(Arc::new(|s: &ConversationState| s.next.to_string()), None);
        assert_eq!(router.resolve_next(&state()), "FINISH");
    }

    #[test]
    fn resolves_through_path_map_when_present() {
        let mut map = HashMap::new();
        map.insert("retry".to_string(), "Builder".to_string());
        map.insert("done".to_string(), "Router".to_string());
        let router = ConditionalRouter::new(
            Arc::new(|s: &ConversationState| if s.needs_retry { "retry".into() } else { "done".into() }),
            Some(map),
        );
        assert_eq!(router.resolve_next(&state()), "Router");
    }

    #[test]
    fn unmatched_key_falls_back_to_itself() {
        let map = HashMap::new();
        let router = ConditionalRouter::new(Arc::new(|_: &ConversationState| "Mystery".into()), Some(map));
        assert_eq!(router.resolve_next(&state()), "Mystery");
    }
}
