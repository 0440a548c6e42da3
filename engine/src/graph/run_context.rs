use crate::stream::StreamWriter;

/// Run context passed into nodes for streaming-aware execution.
///
/// This graph has exactly one state type, emits every lifecycle event
/// unconditionally (no mode selection), and has no long-term store or
/// managed-value concept, so only the two fields every node actually needs
/// are carried: the thread id (for attributing emitted events) and the
/// stream writer itself.
#[derive(Clone)]
pub struct RunContext {
    pub thread_id: String,
    pub stream: StreamWriter,
}

impl RunContext {
    pub fn new(thread_id: impl Into<String>, stream: StreamWriter) -> Self {
        Self { thread_id: thread_id.into(), stream }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carries_thread_id_and_writer() {
        let ctx = RunContext::new("t1", StreamWriter::noop());
        assert_eq!(ctx.thread_id, "t1");
    }
}
