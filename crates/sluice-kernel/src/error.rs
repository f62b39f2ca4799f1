//! Run-level errors.

use std::time::Duration;

use sluice_types::StageError;
use thiserror::Error;

/// Why a pipeline run did not succeed.
///
/// Early-stop (a consumer closing its input once satisfied) and cooperative
/// cancellation are not errors and never show up here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("empty pipeline")]
    EmptyPipeline,

    #[error("stage {position} ({stage}): {reason}")]
    InvalidAdjacency {
        stage: String,
        position: usize,
        reason: &'static str,
    },

    #[error("{stage}: {source}")]
    Stage {
        stage: String,
        #[source]
        source: StageError,
    },

    #[error("{stage}: stage panicked")]
    Panicked { stage: String },

    #[error("pipeline timed out after {after:?}")]
    TimedOut { after: Duration },
}

impl PipelineError {
    /// Name of the stage responsible, if any.
    pub fn stage_name(&self) -> Option<&str> {
        match self {
            PipelineError::InvalidAdjacency { stage, .. }
            | PipelineError::Stage { stage, .. }
            | PipelineError::Panicked { stage } => Some(stage),
            PipelineError::EmptyPipeline | PipelineError::TimedOut { .. } => None,
        }
    }
}
