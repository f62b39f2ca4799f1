//! Stage-level errors.
//!
//! Writing to a closed link is not represented here; it is a normal
//! shutdown signal carried by `SendOutcome::RejectedClosed`.

use thiserror::Error;

/// An unrecoverable failure inside one stage.
///
/// Returning one of these from a stage cancels the whole run. The runner
/// reports the first one it sees to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    #[error("{0}")]
    Failure(String),
    #[error("{path}: {message}")]
    Io { path: String, message: String },
    #[error("malformed record: {0}")]
    MalformedRecord(String),
    #[error("nested pipeline failed: {0}")]
    Nested(String),
}

impl StageError {
    /// Create a generic failure.
    pub fn failure(message: impl Into<String>) -> Self {
        StageError::Failure(message.into())
    }

    /// Wrap an I/O error for a named resource.
    pub fn io(path: impl Into<String>, err: &std::io::Error) -> Self {
        StageError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Result type returned by stage bodies.
pub type StageResult = Result<(), StageError>;
