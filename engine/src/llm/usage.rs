//! Usage accounting: every Gateway invocation records one sample (spec.md §4.2).

use async_trait::async_trait;

/// One Gateway invocation's accounting record.
#[derive(Debug, Clone)]
pub struct UsageSample {
    pub agent: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub latency_ms: u64,
    pub thread_id: String,
}

/// Sink for usage samples. The default `NoopUsageRecorder` discards them; a
/// deployment wanting a cost dashboard (explicitly out of scope, spec.md §1)
/// would plug a recorder in here without touching the Gateway itself.
#[async_trait]
pub trait UsageRecorder: Send + Sync {
    async fn record(&self, sample: UsageSample);
}

#[derive(Default)]
pub struct NoopUsageRecorder;

#[async_trait]
impl UsageRecorder for NoopUsageRecorder {
    async fn record(&self, _sample: UsageSample) {}
}
