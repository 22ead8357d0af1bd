use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing summarization activity.
#[derive(Default)]
pub struct PipelineMetrics {
    runs_completed: AtomicU64,
    chunks_processed: AtomicU64,
    generation_calls: AtomicU64,
    last_chunk_size: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed run with its chunk and generation-call counts.
    pub fn record_run(&self, chunk_count: u64, generation_calls: u64) {
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
        self.chunks_processed
            .fetch_add(chunk_count, Ordering::Relaxed);
        self.generation_calls
            .fetch_add(generation_calls, Ordering::Relaxed);
    }

    /// Remember the chunk size (in words) used by the most recent run.
    pub fn record_chunk_size(&self, chunk_size: u64) {
        self.last_chunk_size.store(chunk_size, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let last_chunk_size = self.last_chunk_size.load(Ordering::Relaxed);
        MetricsSnapshot {
            runs_completed: self.runs_completed.load(Ordering::Relaxed),
            chunks_processed: self.chunks_processed.load(Ordering::Relaxed),
            generation_calls: self.generation_calls.load(Ordering::Relaxed),
            last_chunk_size: (last_chunk_size > 0).then_some(last_chunk_size),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of runs that produced both summaries.
    pub runs_completed: u64,
    /// Total chunks produced across completed runs.
    pub chunks_processed: u64,
    /// Total generation calls issued by completed runs.
    pub generation_calls: u64,
    /// Chunk size of the most recent run, if any.
    pub last_chunk_size: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_runs_chunks_and_calls() {
        let metrics = PipelineMetrics::new();
        metrics.record_run(1, 3);
        metrics.record_run(3, 5);
        metrics.record_chunk_size(3000);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.runs_completed, 2);
        assert_eq!(snapshot.chunks_processed, 4);
        assert_eq!(snapshot.generation_calls, 8);
        assert_eq!(snapshot.last_chunk_size, Some(3000));
    }

    #[test]
    fn fresh_snapshot_is_empty() {
        let snapshot = PipelineMetrics::new().snapshot();
        assert_eq!(snapshot.runs_completed, 0);
        assert_eq!(snapshot.last_chunk_size, None);
        assert_eq!(
            serde_json::to_value(snapshot).unwrap()["last_chunk_size"],
            serde_json::Value::Null
        );
    }
}
