//! Route handlers, one module per spec.md §6 route group.

pub mod agents;
pub mod chat;
pub mod health;
pub mod thread;
pub mod workflow;
