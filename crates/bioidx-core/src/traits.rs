use crate::producer::DocumentProducer;
use crate::types::Document;

/// Outcome of one gatherer run. Failures are counted here, never propagated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatherReport {
    pub subtasks: usize,
    pub failed_subtasks: usize,
    pub emitted: u64,
    pub skipped_records: u64,
    /// Emits that had to wait for the queue to drop below its cap.
    pub throttled: usize,
}

/// Extracts source records and emits them as documents.
pub trait Gatherer: Send {
    fn name(&self) -> &str;

    /// Runs every extraction subtask, emitting through `out`.
    ///
    /// Completion of the queue is owned by the producer handle, not by the gatherer.
    fn run(&self, out: &DocumentProducer) -> GatherReport;
}

/// Destination of indexed documents.
///
/// `add` is called concurrently by every worker. `optimize` and `close` are
/// called once, after all workers have exited.
pub trait IndexSink: Send + Sync {
    fn add(&self, doc: Document) -> anyhow::Result<()>;
    fn optimize(&self) -> anyhow::Result<()>;
    fn close(self) -> anyhow::Result<()>
    where
        Self: Sized;
}
