//! Event Bus / SSE Projector: converts executor lifecycle events into a
//! client-visible stream (spec.md §4.7).
//!
//! The eight event kinds spec.md §4.7 names, always emitted (no opt-in
//! stream modes — this orchestrator has exactly one kind of client). The
//! bounded queue drops the oldest `chunk` event first and keeps lifecycle
//! events, with a drop counter, since spec.md §5/§4.7 requires it explicitly,
//! which a plain bounded channel cannot express.

mod bus;
mod event;
mod writer;

pub use bus::EventBus;
pub use event::LifecycleEvent;
pub use writer::StreamWriter;
