#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod error;
pub mod producer;
pub mod queue;
pub mod traits;
pub mod types;

pub use producer::DocumentProducer;
pub use queue::{Backoff, WorkQueue};
pub use types::{Document, DocumentBuilder, EntityKind};
