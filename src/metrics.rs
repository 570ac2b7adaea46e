use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingest and question activity.
#[derive(Default)]
pub struct RagMetrics {
    ingest_runs: AtomicU64,
    documents_indexed: AtomicU64,
    chunks_indexed: AtomicU64,
    questions_answered: AtomicU64,
}

impl RagMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed ingest of `documents` files producing `chunks` vectors.
    pub fn record_ingest(&self, documents: u64, chunks: u64) {
        self.ingest_runs.fetch_add(1, Ordering::Relaxed);
        self.documents_indexed
            .fetch_add(documents, Ordering::Relaxed);
        self.chunks_indexed.fetch_add(chunks, Ordering::Relaxed);
    }

    /// Record an answered question.
    pub fn record_question(&self) {
        self.questions_answered.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ingest_runs: self.ingest_runs.load(Ordering::Relaxed),
            documents_indexed: self.documents_indexed.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
            questions_answered: self.questions_answered.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of the counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Ingest runs that wrote to the vector store since startup.
    pub ingest_runs: u64,
    /// PDF files indexed since startup.
    pub documents_indexed: u64,
    /// Chunks written since startup.
    pub chunks_indexed: u64,
    /// Questions answered since startup.
    pub questions_answered: u64,
}
