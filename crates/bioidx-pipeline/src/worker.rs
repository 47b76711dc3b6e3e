use indicatif::ProgressBar;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bioidx_core::traits::IndexSink;
use bioidx_core::{Document, WorkQueue};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// Saw end of stream.
    Drained,
    /// The sink rejected a document; the worker stopped.
    Failed(String),
    Panicked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub processed: u64,
    pub outcome: WorkerOutcome,
}

/// Doubling log threshold: fires at `initial`, `2*initial`, `4*initial`, ...
#[derive(Debug, Clone)]
pub struct ProgressThreshold {
    next: u64,
}

impl ProgressThreshold {
    pub fn new(initial: u64) -> Self {
        Self { next: initial.max(1) }
    }

    pub fn hit(&mut self, count: u64) -> bool {
        if count < self.next {
            return false;
        }
        self.next = self.next.saturating_mul(2);
        true
    }
}

/// Drains the queue into the sink until end of stream or the first sink error.
pub struct Worker<S> {
    id: usize,
    queue: Arc<WorkQueue<Document>>,
    sink: Arc<S>,
    progress: ProgressBar,
    threshold: ProgressThreshold,
    processed: Arc<AtomicU64>,
}

impl<S: IndexSink> Worker<S> {
    pub fn new(id: usize, queue: Arc<WorkQueue<Document>>, sink: Arc<S>, progress: ProgressBar, progress_log_initial: u64) -> Self {
        Self { id, queue, sink, progress, threshold: ProgressThreshold::new(progress_log_initial), processed: Arc::new(AtomicU64::new(0)) }
    }

    /// Live count of documents this worker has handed to the sink. Outlives a panicking worker.
    pub fn processed(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.processed)
    }

    pub fn run(mut self) -> WorkerReport {
        let mut processed = 0u64;
        tracing::debug!(worker = self.id, "worker started");
        while let Some(doc) = self.queue.pop() {
            let id = doc.id().to_string();
            if let Err(e) = self.sink.add(doc) {
                tracing::error!(worker = self.id, doc = %id, processed, error = %format!("{e:#}"), "index write failed; worker exiting");
                return WorkerReport { worker_id: self.id, processed, outcome: WorkerOutcome::Failed(format!("{e:#}")) };
            }
            processed += 1;
            self.processed.store(processed, Ordering::Release);
            self.progress.inc(1);
            if self.threshold.hit(processed) {
                tracing::info!(worker = self.id, processed, queued = self.queue.len(), "progress");
            }
        }
        tracing::debug!(worker = self.id, processed, "worker drained");
        WorkerReport { worker_id: self.id, processed, outcome: WorkerOutcome::Drained }
    }
}
