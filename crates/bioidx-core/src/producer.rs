use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::queue::WorkQueue;
use crate::types::Document;

/// Producer-side handle on the shared queue.
///
/// `emit` throttles on the advisory cap before pushing. Completion is tied to
/// the handle's lifetime: `finish` marks the queue complete, and so does
/// dropping the handle, including during a panic unwind. A gatherer that fails
/// halfway therefore cannot leave consumers waiting forever.
pub struct DocumentProducer {
    queue: Arc<WorkQueue<Document>>,
    cap: usize,
    emitted: AtomicU64,
    throttled: AtomicUsize,
}

impl DocumentProducer {
    pub fn new(queue: Arc<WorkQueue<Document>>, cap: usize) -> Self {
        Self { queue, cap, emitted: AtomicU64::new(0), throttled: AtomicUsize::new(0) }
    }

    pub fn emit(&self, doc: Document) {
        let waits = self.queue.wait_below(self.cap);
        if waits > 0 {
            self.throttled.fetch_add(1, Ordering::Relaxed);
        }
        self.queue.push(doc);
        self.emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    /// Number of `emit` calls that had to wait for consumers to catch up.
    pub fn throttled(&self) -> usize {
        self.throttled.load(Ordering::Relaxed)
    }

    /// Marks the run complete and returns the number of documents emitted.
    pub fn finish(self) -> u64 {
        // Drop sets the flag.
        self.emitted()
    }
}

impl Drop for DocumentProducer {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::error!(emitted = self.emitted(), "producer panicked; completing queue");
        }
        self.queue.set_complete();
    }
}

impl std::fmt::Debug for DocumentProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentProducer")
            .field("cap", &self.cap)
            .field("emitted", &self.emitted())
            .finish()
    }
}
