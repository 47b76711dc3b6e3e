//! bioidx-pipeline
//!
//! Producer/consumer indexing run: one gatherer feeds a shared [`WorkQueue`],
//! a pool of [`worker::Worker`]s drains it into an index sink, and the
//! [`controller::Controller`] finalizes the index once every worker is done.
//!
//! [`WorkQueue`]: bioidx_core::WorkQueue

pub mod controller;
pub mod driver;
pub mod modes;
pub mod worker;

pub use controller::{Controller, ControllerReport, ControllerState};
pub use driver::{run, run_with, RunSummary};
pub use modes::{Mode, MODES};
