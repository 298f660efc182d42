use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing analysis activity.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_analyzed: AtomicU64,
    chunks_summarized: AtomicU64,
    capability_fallbacks: AtomicU64,
    last_chunk_count: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a processed document and the number of chunks produced for it.
    pub fn record_document(&self, chunk_count: u64) {
        self.documents_analyzed.fetch_add(1, Ordering::Relaxed);
        self.chunks_summarized
            .fetch_add(chunk_count, Ordering::Relaxed);
        self.last_chunk_count.store(chunk_count, Ordering::Relaxed);
    }

    /// Record a capability invocation that degraded to its fallback value.
    pub fn record_fallback(&self) {
        self.capability_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let documents_analyzed = self.documents_analyzed.load(Ordering::Relaxed);
        MetricsSnapshot {
            documents_analyzed,
            chunks_summarized: self.chunks_summarized.load(Ordering::Relaxed),
            capability_fallbacks: self.capability_fallbacks.load(Ordering::Relaxed),
            last_chunk_count: (documents_analyzed > 0)
                .then(|| self.last_chunk_count.load(Ordering::Relaxed)),
        }
    }
}

/// Immutable view of analysis counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of documents analyzed since startup.
    pub documents_analyzed: u64,
    /// Total chunk count summarized across all analyzed documents.
    pub chunks_summarized: u64,
    /// Capability invocations that failed and degraded to their fallback.
    pub capability_fallbacks: u64,
    /// Chunk count of the most recently analyzed document, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_chunk_count: Option<u64>,
}
