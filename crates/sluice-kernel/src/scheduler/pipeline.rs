//! Pipeline assembly.

use sluice_types::{Record, StageRole};

use crate::error::PipelineError;
use crate::stage::{Composite, Stage, StageKind};

use super::runner::PipelineRunner;

/// An ordered list of stages, ready to run.
///
/// ```ignore
/// use sluice_kernel::{builtins::*, pipeline};
///
/// let out = pipeline![seq(1, 20), head(5), grep("3")].collect().await?;
/// assert_eq!(out, vec![Record::new("3")]);
/// ```
#[derive(Debug, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage.
    pub fn stage(mut self, stage: impl Into<Stage>) -> Self {
        self.stages.push(stage.into());
        self
    }

    /// Append a stage in place.
    pub fn push(&mut self, stage: impl Into<Stage>) {
        self.stages.push(stage.into());
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in order.
    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(Stage::name).collect()
    }

    /// Whether the first stage reads input.
    pub fn consumes(&self) -> bool {
        self.stages.first().is_some_and(|s| s.role().consumes())
    }

    /// Whether the last stage emits output.
    pub fn produces(&self) -> bool {
        self.stages.last().is_some_and(|s| s.role().produces())
    }

    /// Check stage adjacency.
    ///
    /// A source must come first and cannot take external input; a sink must
    /// come last. Wrapped pipelines are checked recursively.
    pub fn validate(&self, has_input: bool) -> Result<(), PipelineError> {
        if self.stages.is_empty() {
            return Err(PipelineError::EmptyPipeline);
        }

        let last = self.stages.len() - 1;
        for (position, stage) in self.stages.iter().enumerate() {
            let invalid = |reason| PipelineError::InvalidAdjacency {
                stage: stage.name().to_string(),
                position,
                reason,
            };
            match stage.role() {
                StageRole::Source if position > 0 => {
                    return Err(invalid("source stage must come first"));
                }
                StageRole::Source if has_input => {
                    return Err(invalid("source stage cannot accept input"));
                }
                StageRole::Sink if position < last => {
                    return Err(invalid("sink stage must come last"));
                }
                _ => {}
            }
            if let StageKind::Composite(Composite::Pipeline(nested)) = stage.kind() {
                nested.validate(stage.role().consumes() && (position > 0 || has_input))?;
            }
        }
        Ok(())
    }

    /// Run with the default runner, writing the output to stdout.
    pub async fn run(self) -> Result<(), PipelineError> {
        PipelineRunner::default().run(self).await
    }

    /// Run with the default runner, collecting the output.
    pub async fn collect(self) -> Result<Vec<Record>, PipelineError> {
        PipelineRunner::default().collect(self).await
    }

    pub(crate) fn into_stages(self) -> Vec<Stage> {
        self.stages
    }
}

impl From<Stage> for Pipeline {
    /// A single stage; a wrapped pipeline is unwrapped.
    fn from(stage: Stage) -> Self {
        let (name, kind) = stage.into_parts();
        match kind {
            StageKind::Composite(Composite::Pipeline(pipeline)) => pipeline,
            kind => Pipeline {
                stages: vec![Stage::from_parts(name, kind)],
            },
        }
    }
}

impl From<Vec<Stage>> for Pipeline {
    fn from(stages: Vec<Stage>) -> Self {
        Self { stages }
    }
}

impl From<Pipeline> for Stage {
    fn from(pipeline: Pipeline) -> Self {
        let name = pipeline.names().join(" | ");
        Stage::pipeline(name, pipeline)
    }
}

/// Build a [`Pipeline`] from stage expressions.
#[macro_export]
macro_rules! pipeline {
    ($($stage:expr),* $(,)?) => {
        $crate::Pipeline::new()$(.stage($stage))*
    };
}
