//! Loop stages that run a nested pipeline per inbound record.
//!
//! ```text
//!   inbound ──▶ ForEach ──record──▶ body(record) ──▶ Some(stage)
//!                  │                                    │
//!                  │           nested run (child scope) ▼
//!                  │◀──────── link ◀──────── [ stage ... ]
//!                  ▼
//!               outbound
//! ```
//!
//! Nested output is forwarded in order. A nested early-stop is a normal
//! finish; a nested failure fails the loop stage.

use std::fmt;

use sluice_types::{Record, RecvOutcome, StageError, StageResult};

use crate::link::link;
use crate::scope::Scope;
use crate::stage::{Inbound, Outbound, Stage};

use super::pipeline::Pipeline;
use super::runner::PipelineRunner;

type Body = Box<dyn FnMut(Record) -> Option<Stage> + Send>;

/// Per-record loop body.
///
/// The callback receives each inbound record (split into fields when a
/// separator is set) and returns `None` to skip it, or a stage to run for it.
pub struct ForEach {
    body: Body,
    separator: Option<String>,
}

impl ForEach {
    pub fn new<F>(body: F) -> Self
    where
        F: FnMut(Record) -> Option<Stage> + Send + 'static,
    {
        Self {
            body: Box::new(body),
            separator: None,
        }
    }

    /// Split each record on `separator` before handing it to the body.
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    fn prepare(&self, record: Record) -> Record {
        match &self.separator {
            Some(separator) => record.split(separator),
            None => record,
        }
    }
}

impl fmt::Debug for ForEach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForEach")
            .field("separator", &self.separator)
            .finish_non_exhaustive()
    }
}

impl From<ForEach> for Stage {
    fn from(body: ForEach) -> Self {
        Stage::for_each("for_each", body)
    }
}

/// Shorthand for [`ForEach::new`].
pub fn for_each<F>(body: F) -> ForEach
where
    F: FnMut(Record) -> Option<Stage> + Send + 'static,
{
    ForEach::new(body)
}

impl PipelineRunner {
    pub(super) async fn run_for_each(
        &self,
        mut body: ForEach,
        scope: &Scope,
        inbound: &mut Inbound,
        outbound: &mut Outbound,
    ) -> StageResult {
        while let Some(record) = inbound.next().await {
            let record = body.prepare(record);
            let Some(stage) = (body.body)(record) else {
                continue;
            };

            let child = scope.child_scope();
            let (tx, rx) = link(self.config().link_capacity);
            let nested = self.execute(Pipeline::from(stage), &child, None, Some(tx));

            let forward = async {
                while let RecvOutcome::Record(record) = rx.receive().await {
                    if outbound.emit(record).await.is_closed() {
                        rx.close();
                        child.cancel();
                        return false;
                    }
                }
                true
            };

            let (result, downstream_open) = tokio::join!(nested, forward);
            result.map_err(|e| StageError::Nested(e.to_string()))?;

            if !downstream_open {
                tracing::trace!("downstream closed, leaving loop");
                inbound.stop();
                return Ok(());
            }
        }
        Ok(())
    }
}
