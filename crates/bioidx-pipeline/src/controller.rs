//! Owns the worker pool and the sink's finalization.
//!
//! `Idle → Spawning → Running → Draining → Finalizing → Closed`. The sink is
//! optimized and closed only after every worker thread has been joined, and a
//! controller reaches `Closed` at most once because `run` consumes it.

use indicatif::ProgressBar;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use bioidx_core::config::PipelineSettings;
use bioidx_core::error::{Error, Result};
use bioidx_core::traits::IndexSink;
use bioidx_core::{Document, WorkQueue};

use crate::worker::{Worker, WorkerOutcome, WorkerReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ControllerState {
    Idle,
    Spawning,
    Running,
    Draining,
    Finalizing,
    Closed,
}

impl ControllerState {
    fn advance(&mut self, next: ControllerState) {
        debug_assert!(next > *self, "controller cannot move from {self:?} to {next:?}");
        tracing::debug!(from = ?*self, to = ?next, "controller state");
        *self = next;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerReport {
    pub workers: Vec<WorkerReport>,
    pub final_state: ControllerState,
}

impl ControllerReport {
    pub fn documents(&self) -> u64 {
        self.workers.iter().map(|w| w.processed).sum()
    }

    pub fn failed_workers(&self) -> usize {
        self.workers.iter().filter(|w| w.outcome != WorkerOutcome::Drained).count()
    }
}

pub struct Controller<S> {
    queue: Arc<WorkQueue<Document>>,
    sink: Arc<S>,
    workers: usize,
    progress_log_initial: u64,
    progress: ProgressBar,
    state: ControllerState,
}

impl<S: IndexSink + 'static> Controller<S> {
    pub fn new(queue: Arc<WorkQueue<Document>>, sink: S, settings: &PipelineSettings) -> Self {
        Self {
            queue,
            sink: Arc::new(sink),
            workers: settings.workers.max(1),
            progress_log_initial: settings.progress_log_initial,
            progress: ProgressBar::hidden(),
            state: ControllerState::Idle,
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn run(mut self) -> Result<ControllerReport> {
        self.state.advance(ControllerState::Spawning);
        let mut handles = Vec::with_capacity(self.workers);
        for id in 0..self.workers {
            let worker = Worker::new(id, Arc::clone(&self.queue), Arc::clone(&self.sink), self.progress.clone(), self.progress_log_initial);
            let counter = worker.processed();
            let spawned = thread::Builder::new().name(format!("index-worker-{id}")).spawn(move || worker.run());
            match spawned {
                Ok(handle) => handles.push((id, counter, handle)),
                Err(e) if handles.is_empty() => {
                    return Err(Error::Operation(format!("could not start any index worker: {e}")));
                }
                Err(e) => {
                    tracing::error!(worker = id, error = %e, "failed to spawn worker; continuing with fewer");
                    break;
                }
            }
        }
        self.state.advance(ControllerState::Running);
        tracing::info!(workers = handles.len(), "index workers running");

        self.state.advance(ControllerState::Draining);
        let mut reports = Vec::with_capacity(handles.len());
        for (id, counter, handle) in handles {
            match handle.join() {
                Ok(report) => reports.push(report),
                Err(_) => {
                    let processed = counter.load(Ordering::Acquire);
                    tracing::error!(worker = id, processed, "index worker panicked");
                    reports.push(WorkerReport { worker_id: id, processed, outcome: WorkerOutcome::Panicked });
                }
            }
        }
        let documents: u64 = reports.iter().map(|r| r.processed).sum();
        tracing::info!(documents, "all index workers finished");

        self.state.advance(ControllerState::Finalizing);
        let sink = Arc::try_unwrap(self.sink).map_err(|_| Error::Finalize("index sink still shared after workers exited".into()))?;
        sink.optimize().map_err(|e| Error::Finalize(format!("optimize: {e:#}")))?;
        sink.close().map_err(|e| Error::Finalize(format!("close: {e:#}")))?;
        self.state.advance(ControllerState::Closed);

        Ok(ControllerReport { workers: reports, final_state: self.state })
    }
}
