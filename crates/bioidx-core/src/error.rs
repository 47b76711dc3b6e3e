use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Usage: {0}")]
    Usage(String),

    #[error("Unknown mode '{code}' (expected one of: {expected})")]
    UnknownMode { code: String, expected: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Finalize failed: {0}")]
    Finalize(String),

    #[error("Task '{0}' panicked")]
    Join(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    /// Process exit status for this failure, as reported by the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Usage(_) => 1,
            Error::UnknownMode { .. } => 2,
            Error::InvalidConfig(_) => 3,
            Error::InvalidDocument(_)
            | Error::Index(_)
            | Error::Finalize(_)
            | Error::Join(_)
            | Error::Operation(_) => 4,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
