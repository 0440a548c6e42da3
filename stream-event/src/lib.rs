//! SSE envelope injection: a tiny crate shared by the server's streaming
//! routes, kept separate from `engine` since it only knows about JSON
//! payloads, never about [`engine::stream::LifecycleEvent`] itself.

pub mod envelope;

pub use envelope::Envelope;
