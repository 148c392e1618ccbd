//! Error types shared across the engine
//!
//! - [`EnsembleError`]: returned by generation and scheduling operations
//! - [`PersistenceError`]: failures of a persistence adapter
//! - [`DataIntegrityError`]: malformed persisted fields; collected into a
//!   load report and never returned as `Err`

use thiserror::Error;

/// Errors raised while configuring or generating an ensemble
#[derive(Debug, Error)]
pub enum EnsembleError {
    /// Run count or batch size missing or non-positive. Raised before any
    /// state is touched.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Period count below one or empty historical sample
    #[error("Validation error: {0}")]
    Validation(String),

    /// The job belongs to a generation that has since been superseded
    #[error("Stale generation: job epoch {job_epoch}, current epoch {current_epoch}")]
    StaleGeneration { job_epoch: u64, current_epoch: u64 },

    /// `run_batch` was called on a job that already finished
    #[error("Generation {epoch} already complete")]
    GenerationComplete { epoch: u64 },

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Errors raised by a [`PersistenceAdapter`](crate::persistence::PersistenceAdapter)
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed for key '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Store file {path} is not a JSON object")]
    CorruptStore { path: String },
}

/// A persisted field that could not be restored
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Discarded persisted field '{key}': {reason}")]
pub struct DataIntegrityError {
    pub key: String,
    pub reason: String,
}

impl DataIntegrityError {
    pub fn new(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
