//! Error types for the gazeline pipeline

use thiserror::Error;

/// Errors surfaced across the public pipeline boundary.
///
/// Row-level decode failures are recovered where they occur (the offending
/// row is skipped with a warning) and never reach the caller; everything
/// here is returned as a value, not thrown.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A payload or header row did not match any declared record shape
    #[error("failed to decode record: {0}")]
    Decode(String),

    /// Folder-level mismatch between the trial log and the gaze exports
    #[error("{0}")]
    Structure(String),

    /// A requested test or trial does not exist in the current selection
    #[error("no such {0} \"{1}\"")]
    NotFound(&'static str, String),

    /// Persistence layer read/write failure
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persistence layer (de)serialization failure
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
