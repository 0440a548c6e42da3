use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};

use super::event::LifecycleEvent;

const DEFAULT_CAPACITY: usize = 256;

/// Bounded per-thread event queue with selective eviction: when full, the
/// oldest droppable (`chunk`) event is discarded to make room before any
/// lifecycle event is ever dropped (spec.md §5).
pub struct EventBus {
    queue: Mutex<VecDeque<LifecycleEvent>>,
    notify: Notify,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            notify: Notify::new(),
            capacity,
        }
    }

    pub async fn publish(&self, event: LifecycleEvent) {
        let mut queue = self.queue.lock().await;
        if queue.len() >= self.capacity {
            if let Some(pos) = queue.iter().position(LifecycleEvent::is_droppable) {
                queue.remove(pos);
            } else if !event.is_droppable() {
                // Queue is saturated with undroppable lifecycle events; still
                // bounded memory wins over an unbounded queue, so the oldest
                // lifecycle event yields to the newest one.
                queue.pop_front();
            } else {
                // Incoming event is itself droppable and there's no room: drop it.
                return;
            }
        }
        queue.push_back(event);
        self.notify.notify_waiters();
    }

    /// Awaits and removes the next queued event (FIFO).
    pub async fn next(&self) -> LifecycleEvent {
        loop {
            {
                let mut queue = self.queue.lock().await;
                if let Some(event) = queue.pop_front() {
                    return event;
                }
            }
            self.notify.notified().await;
        }
    }

    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }
}
