//! bioidx-text
//!
//! Tantivy index writer used as the pipeline's document sink: schema, analyzer
//! profiles, writer tuning and the optimize/close finalization.

pub mod index;
pub mod tantivy_utils;

pub use index::TantivySink;
pub use tantivy_utils::AnalyzerProfile;
