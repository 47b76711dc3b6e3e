//! bioidx-gather
//!
//! Gatherers that turn exported source records into documents. Each entity is
//! read from tab-separated files; see `mapping` for the per-entity column layout.

pub mod delimited;
pub mod mapping;

pub use delimited::DelimitedGatherer;
pub use mapping::EntityMapping;
