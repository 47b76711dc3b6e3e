use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bioidx_core::config::PipelineSettings;
use bioidx_core::error::Error;
use bioidx_core::traits::{GatherReport, Gatherer, IndexSink};
use bioidx_core::{Backoff, Document, DocumentProducer, EntityKind, WorkQueue};
use bioidx_pipeline::worker::WorkerOutcome;
use bioidx_pipeline::{run_with, Controller, ControllerState};

/// Records what reaches the index and how it was finalized.
#[derive(Default)]
struct Journal {
    docs: Mutex<Vec<(String, String)>>,
    optimized: AtomicBool,
    closed: AtomicBool,
    adds_after_optimize: AtomicUsize,
}

struct RecordingSink {
    journal: Arc<Journal>,
    delay: Duration,
    fail_on: Option<String>,
    panic_on: Option<String>,
}

impl RecordingSink {
    fn new(journal: &Arc<Journal>) -> Self {
        Self { journal: Arc::clone(journal), delay: Duration::ZERO, fail_on: None, panic_on: None }
    }
}

impl IndexSink for RecordingSink {
    fn add(&self, doc: Document) -> anyhow::Result<()> {
        if self.fail_on.as_deref() == Some(doc.id()) {
            anyhow::bail!("corrupt document {}", doc.id());
        }
        if self.panic_on.as_deref() == Some(doc.id()) {
            panic!("writer crashed on {}", doc.id());
        }
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if self.journal.optimized.load(Ordering::SeqCst) {
            self.journal.adds_after_optimize.fetch_add(1, Ordering::SeqCst);
        }
        let worker = thread::current().name().unwrap_or("?").to_string();
        self.journal.docs.lock().push((doc.id().to_string(), worker));
        Ok(())
    }

    fn optimize(&self) -> anyhow::Result<()> {
        self.journal.optimized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close(self) -> anyhow::Result<()> {
        assert!(self.journal.optimized.load(Ordering::SeqCst), "close after optimize");
        self.journal.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct FailingOptimize;

impl IndexSink for FailingOptimize {
    fn add(&self, _doc: Document) -> anyhow::Result<()> { Ok(()) }
    fn optimize(&self) -> anyhow::Result<()> { anyhow::bail!("disk full") }
    fn close(self) -> anyhow::Result<()> { Ok(()) }
}

fn doc(i: usize) -> Document {
    Document::builder(EntityKind::Protein).id(format!("P{i:05}")).name(format!("protein {i}")).build().unwrap()
}

fn settings(workers: usize) -> PipelineSettings {
    PipelineSettings { workers, queue_cap: 16, backoff_initial_ms: 1, backoff_max_ms: 8, progress_log_initial: 10, progress_bar: false }
}

fn queue() -> Arc<WorkQueue<Document>> {
    Arc::new(WorkQueue::new(Backoff::from_millis(1, 8)))
}

#[test]
fn three_documents_one_worker() {
    let journal = Arc::new(Journal::default());
    let q = queue();
    for i in 0..3 { q.push(doc(i)); }
    q.set_complete();

    let report = Controller::new(Arc::clone(&q), RecordingSink::new(&journal), &settings(1)).run().expect("run");
    assert_eq!(report.documents(), 3);
    assert_eq!(report.final_state, ControllerState::Closed);
    assert!(journal.closed.load(Ordering::SeqCst));
    assert_eq!(journal.docs.lock().len(), 3);
}

#[test]
fn empty_complete_queue_closes_without_documents() {
    let journal = Arc::new(Journal::default());
    let q = queue();
    q.set_complete();
    let report = Controller::new(q, RecordingSink::new(&journal), &settings(4)).run().expect("run");
    assert_eq!(report.workers.len(), 4);
    assert_eq!(report.documents(), 0);
    assert!(report.workers.iter().all(|w| w.outcome == WorkerOutcome::Drained));
    assert!(journal.closed.load(Ordering::SeqCst));
}

#[test]
fn single_document_reaches_exactly_one_of_four_workers() {
    let journal = Arc::new(Journal::default());
    let q = queue();
    let controller = Controller::new(Arc::clone(&q), RecordingSink::new(&journal), &settings(4));
    assert_eq!(controller.state(), ControllerState::Idle);
    let handle = thread::spawn(move || controller.run());

    thread::sleep(Duration::from_millis(30));
    q.push(doc(1));
    q.set_complete();
    let report = handle.join().expect("controller").expect("run");

    assert_eq!(report.workers.iter().filter(|w| w.processed == 1).count(), 1);
    assert_eq!(report.workers.iter().filter(|w| w.processed == 0).count(), 3);
    let docs = journal.docs.lock();
    assert_eq!(docs.len(), 1);
    assert!(docs[0].1.starts_with("index-worker-"));
}

#[test]
fn concurrent_producer_all_documents_indexed_once_before_finalize() {
    let journal = Arc::new(Journal::default());
    let q = queue();
    let mut sink = RecordingSink::new(&journal);
    sink.delay = Duration::from_micros(50);
    let controller = Controller::new(Arc::clone(&q), sink, &settings(5));
    let handle = thread::spawn(move || controller.run());

    let out = DocumentProducer::new(Arc::clone(&q), 16);
    for i in 0..500 {
        out.emit(doc(i));
        assert!(q.len() <= 17);
    }
    assert_eq!(out.finish(), 500);

    let report = handle.join().expect("controller").expect("run");
    assert_eq!(report.documents(), 500);
    let ids: HashSet<String> = journal.docs.lock().iter().map(|(id, _)| id.clone()).collect();
    assert_eq!(ids.len(), 500);
    assert_eq!(journal.adds_after_optimize.load(Ordering::SeqCst), 0);
}

#[test]
fn failing_worker_does_not_stop_siblings() {
    let journal = Arc::new(Journal::default());
    let q = queue();
    for i in 0..50 { q.push(doc(i)); }
    q.set_complete();
    let mut sink = RecordingSink::new(&journal);
    sink.fail_on = Some("P00007".into());

    let report = Controller::new(q, sink, &settings(3)).run().expect("run");
    assert_eq!(report.failed_workers(), 1);
    assert!(matches!(report.workers.iter().find(|w| w.outcome != WorkerOutcome::Drained).map(|w| &w.outcome), Some(WorkerOutcome::Failed(_))));
    // The rejected document is lost; everything else lands.
    assert_eq!(report.documents(), 49);
    assert!(journal.closed.load(Ordering::SeqCst));
}

#[test]
fn panicked_worker_keeps_its_count() {
    let journal = Arc::new(Journal::default());
    let q = queue();
    for i in 0..10 { q.push(doc(i)); }
    q.set_complete();
    let mut sink = RecordingSink::new(&journal);
    sink.panic_on = Some("P00005".into());

    let report = Controller::new(q, sink, &settings(1)).run().expect("run");
    assert_eq!(report.workers[0].outcome, WorkerOutcome::Panicked);
    assert_eq!(report.workers[0].processed, 5);
    assert_eq!(report.documents(), 5);
    assert_eq!(report.documents(), journal.docs.lock().len() as u64);
    assert!(journal.closed.load(Ordering::SeqCst));
}

#[test]
fn finalize_failure_is_fatal() {
    let q = queue();
    q.set_complete();
    let err = Controller::new(q, FailingOptimize, &settings(2)).run().unwrap_err();
    assert!(matches!(err, Error::Finalize(_)));
    assert_eq!(err.exit_code(), 4);
}

struct ListGatherer {
    count: usize,
    fail_second_half: bool,
}

impl Gatherer for ListGatherer {
    fn name(&self) -> &str { "list" }

    fn run(&self, out: &DocumentProducer) -> GatherReport {
        let mut report = GatherReport { subtasks: 2, ..GatherReport::default() };
        for i in 0..self.count / 2 { out.emit(doc(i)); }
        if self.fail_second_half {
            report.failed_subtasks += 1;
            return report;
        }
        for i in self.count / 2..self.count { out.emit(doc(i)); }
        report
    }
}

struct PanickingGatherer;

impl Gatherer for PanickingGatherer {
    fn name(&self) -> &str { "panics" }

    fn run(&self, out: &DocumentProducer) -> GatherReport {
        out.emit(doc(1));
        panic!("upstream connection dropped");
    }
}

#[test]
fn run_with_reports_gathered_and_indexed_counts() {
    let journal = Arc::new(Journal::default());
    let summary = run_with(Box::new(ListGatherer { count: 120, fail_second_half: false }), RecordingSink::new(&journal), &settings(3)).expect("run");
    assert_eq!(summary.gather.emitted, 120);
    assert_eq!(summary.documents_indexed, 120);
    assert_eq!(summary.failed_workers, 0);
    assert_eq!(summary.mode, "list");
    assert!(summary.to_string().contains("indexed 120 of 120"));
}

#[test]
fn partial_gather_still_finalizes() {
    let journal = Arc::new(Journal::default());
    let summary = run_with(Box::new(ListGatherer { count: 40, fail_second_half: true }), RecordingSink::new(&journal), &settings(2)).expect("run");
    assert_eq!(summary.gather.failed_subtasks, 1);
    assert_eq!(summary.documents_indexed, 20);
    assert!(journal.closed.load(Ordering::SeqCst));
}

#[test]
fn panicking_producer_is_fatal_but_index_is_closed() {
    let journal = Arc::new(Journal::default());
    let err = run_with(Box::new(PanickingGatherer), RecordingSink::new(&journal), &settings(2)).unwrap_err();
    assert!(matches!(err, Error::Join(_)));
    assert!(journal.closed.load(Ordering::SeqCst), "workers drained and sink finalized");
    assert_eq!(journal.docs.lock().len(), 1);
}

#[test]
fn run_finishes_when_every_worker_failed_early() {
    let journal = Arc::new(Journal::default());
    let mut sink = RecordingSink::new(&journal);
    sink.fail_on = Some("P00000".into());

    // One worker, rejected on the first document; nothing else consumes.
    let summary = run_with(Box::new(ListGatherer { count: 200, fail_second_half: false }), sink, &settings(1)).expect("run");
    assert_eq!(summary.gather.emitted, 200);
    assert_eq!(summary.failed_workers, 1);
    assert_eq!(summary.documents_indexed, 0);
    assert!(journal.closed.load(Ordering::SeqCst));
}
