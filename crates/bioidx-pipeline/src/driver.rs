use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bioidx_core::config::{PipelineSettings, Settings};
use bioidx_core::error::{Error, Result};
use bioidx_core::traits::{GatherReport, Gatherer, IndexSink};
use bioidx_core::{Document, DocumentProducer, WorkQueue};
use bioidx_text::TantivySink;

use crate::controller::{Controller, ControllerReport};
use crate::modes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub mode: String,
    pub gather: GatherReport,
    pub documents_indexed: u64,
    pub failed_workers: usize,
    pub elapsed: Duration,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "mode '{}': indexed {} of {} documents in {:.2?} ({} failed subtasks, {} skipped records, {} failed workers)",
            self.mode,
            self.documents_indexed,
            self.gather.emitted,
            self.elapsed,
            self.gather.failed_subtasks,
            self.gather.skipped_records,
            self.failed_workers
        )
    }
}

/// One indexing run: resolve `mode_code`, build a fresh index at `index_dir`,
/// gather into it and finalize.
pub fn run(index_dir: &Path, mode_code: &str, settings: &Settings) -> Result<RunSummary> {
    let mode = modes::resolve(mode_code)?;
    tracing::info!(mode = mode.code, description = mode.description, index = %index_dir.display(), "starting indexing run");
    let gatherer = mode.gatherer(settings);
    let sink = TantivySink::create(index_dir, mode.analyzer, &settings.writer).map_err(|e| Error::Index(format!("{e:#}")))?;
    let mut summary = run_with(gatherer, sink, &settings.pipeline)?;
    summary.mode = mode.code.to_string();
    Ok(summary)
}

/// Wires an explicit gatherer and sink around one shared queue.
///
/// The controller thread starts first so that a producer which fails to
/// start still completes the queue (its handle is dropped) and the workers exit.
/// The controller is joined first; whatever is still queued after that is
/// drained and discarded here so the producer can run to completion.
pub fn run_with<S: IndexSink + 'static>(gatherer: Box<dyn Gatherer>, sink: S, settings: &PipelineSettings) -> Result<RunSummary> {
    let start = Instant::now();
    let queue = Arc::new(WorkQueue::new(settings.backoff()));
    let progress = progress_bar(settings.progress_bar);
    let name = gatherer.name().to_string();

    let controller = Controller::new(Arc::clone(&queue), sink, settings).with_progress(progress.clone());
    let controller = thread::Builder::new()
        .name("index-controller".into())
        .spawn(move || controller.run())
        .map_err(|e| Error::Operation(format!("could not start controller: {e}")))?;

    let out = DocumentProducer::new(Arc::clone(&queue), settings.queue_cap);
    let producer = thread::Builder::new().name(format!("producer-{name}")).spawn(move || {
        let mut report = gatherer.run(&out);
        report.throttled = out.throttled();
        report.emitted = out.finish();
        report
    });

    let controlled: Result<ControllerReport> = controller.join().map_err(|_| Error::Join("index-controller".into())).and_then(|r| r);
    // No consumer is left; keep a producer that outlived the workers from parking on the cap.
    let discarded = discard_remaining(&queue);
    if discarded > 0 {
        tracing::error!(discarded, ok = controlled.is_ok(), "index workers stopped before the queue drained; documents discarded");
    }

    let gathered = match producer {
        Ok(handle) => handle.join().map_err(|_| Error::Join(format!("producer-{name}"))),
        Err(e) => Err(Error::Operation(format!("could not start producer: {e}"))),
    };
    if let Ok(report) = &gathered {
        tracing::info!(emitted = report.emitted, failed_subtasks = report.failed_subtasks, throttled = report.throttled, queue_cap = settings.queue_cap, "producer finished");
    }
    progress.finish_and_clear();

    let gather = gathered?;
    let controlled = controlled?;
    let summary = RunSummary {
        mode: name,
        documents_indexed: controlled.documents(),
        failed_workers: controlled.failed_workers(),
        gather,
        elapsed: start.elapsed(),
    };
    tracing::info!(%summary, "indexing run complete");
    Ok(summary)
}

/// Pops until end of stream, dropping everything. Returns how many documents were dropped.
fn discard_remaining(queue: &WorkQueue<Document>) -> u64 {
    let mut discarded = 0;
    while queue.pop().is_some() {
        discarded += 1;
    }
    discarded
}

fn progress_bar(enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {pos} documents indexed ({per_sec}) {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
