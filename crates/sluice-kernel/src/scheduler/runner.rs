//! Pipeline execution.
//!
//! Every stage of a run is spawned as its own task. Adjacent stages are
//! connected by bounded links; each stage gets its own cancellation scope,
//! nested so that a stage cancelling its scope stops only what is upstream
//! of it. The run scope sits above all stage scopes and is cancelled when
//! any stage fails, before that stage's links are closed, so stages below a
//! failure see cancellation rather than a clean end of input.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use sluice_types::{Record, RecvOutcome, StageError, StageResult};
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::builtins::{collect_into, stdout};
use crate::config::RunnerConfig;
use crate::error::PipelineError;
use crate::link::{link, LinkReceiver, LinkSender};
use crate::scope::Scope;
use crate::stage::{Composite, Inbound, Outbound, Stage, StageKind};

use super::pipeline::Pipeline;

/// Runs pipelines by spawning one task per stage and joining them.
///
/// Cheap to clone; clones share configuration.
#[derive(Debug, Clone, Default)]
pub struct PipelineRunner {
    config: Arc<RunnerConfig>,
}

impl PipelineRunner {
    /// Create a runner with the given configuration.
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run a pipeline, writing its output (if any) to stdout.
    pub async fn run(&self, pipeline: Pipeline) -> Result<(), PipelineError> {
        self.run_scoped(pipeline, &Scope::new()).await
    }

    /// Run a pipeline under a caller-owned scope.
    ///
    /// Cancelling `scope` stops the run cooperatively; that is reported as
    /// success unless some stage failed.
    #[tracing::instrument(level = "info", skip(self, pipeline, scope), fields(stages = pipeline.len()))]
    pub async fn run_scoped(&self, mut pipeline: Pipeline, scope: &Scope) -> Result<(), PipelineError> {
        if pipeline.produces() {
            pipeline.push(stdout());
        }
        self.run_top_level(pipeline, scope).await
    }

    /// Run a pipeline and return every record its last stage emits.
    #[tracing::instrument(level = "debug", skip(self, pipeline), fields(stages = pipeline.len()))]
    pub async fn collect(&self, mut pipeline: Pipeline) -> Result<Vec<Record>, PipelineError> {
        let (records, sink) = collect_into();
        if pipeline.produces() {
            pipeline.push(sink);
        }
        self.run_top_level(pipeline, &Scope::new()).await?;
        let mut records = records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(std::mem::take(&mut *records))
    }

    /// Apply the configured deadline, if any, around a run.
    async fn run_top_level(&self, pipeline: Pipeline, scope: &Scope) -> Result<(), PipelineError> {
        let top = scope.child_scope();
        let mut run = self.execute(pipeline, &top, None, None);

        let Some(limit) = self.config.timeout() else {
            return run.await;
        };

        let outcome = tokio::time::timeout(limit, &mut run).await;
        match outcome {
            Ok(result) => result,
            Err(_elapsed) => {
                tracing::warn!(?limit, "pipeline deadline expired, cancelling");
                top.cancel();
                // A stage that failed before noticing the deadline wins.
                run.await?;
                Err(PipelineError::TimedOut { after: limit })
            }
        }
    }

    /// Execute a pipeline as a child of `parent`.
    ///
    /// `input` feeds the first stage, `output` receives what the last stage
    /// emits. Without `output` the last stage's records are dropped. The
    /// future is boxed because composite stages call back into here.
    pub fn execute(
        &self,
        pipeline: Pipeline,
        parent: &Scope,
        input: Option<LinkReceiver>,
        output: Option<LinkSender>,
    ) -> BoxFuture<'static, Result<(), PipelineError>> {
        let runner = self.clone();
        let parent = parent.clone();
        Box::pin(async move { runner.execute_inner(pipeline, parent, input, output).await })
    }

    async fn execute_inner(
        self,
        pipeline: Pipeline,
        parent: Scope,
        input: Option<LinkReceiver>,
        mut output: Option<LinkSender>,
    ) -> Result<(), PipelineError> {
        pipeline.validate(input.is_some())?;

        let run_scope = parent.child_scope();
        let stages = pipeline.into_stages();
        let count = stages.len();

        // Stage scopes, built downstream first: scopes[i] is a child of scopes[i + 1].
        let mut scopes = Vec::with_capacity(count);
        let mut below = run_scope.clone();
        for _ in 0..count {
            below = below.child_scope();
            scopes.push(below.clone());
        }
        scopes.reverse();

        tracing::debug!(stages = count, capacity = self.config.link_capacity, "pipeline started");

        let mut tasks = JoinSet::new();
        let mut names = HashMap::with_capacity(count);
        let mut inbound = input;

        for (index, (stage, scope)) in stages.into_iter().zip(scopes).enumerate() {
            let (outbound, next_inbound) = if index + 1 < count {
                let (tx, rx) = link(self.config.link_capacity);
                (Some(tx), Some(rx))
            } else {
                (output.take(), None)
            };
            let receiver = std::mem::replace(&mut inbound, next_inbound);
            let receiver = if stage.role().consumes() { receiver } else { None };

            let name = stage.name().to_string();
            let span = tracing::debug_span!("stage", stage = %name, index, role = %stage.role());
            let runner = self.clone();
            let task_name = name.clone();
            let stage_run_scope = run_scope.clone();
            let handle = tasks.spawn(
                async move {
                    tracing::debug!("stage started");
                    let result = runner
                        .run_stage(stage, scope, stage_run_scope, receiver, outbound)
                        .await;
                    (task_name, result)
                }
                .instrument(span),
            );
            names.insert(handle.id(), name);
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(()))) => {
                    tracing::debug!(stage = %name, "stage finished");
                }
                Ok((name, Err(StageFailure { source, during_shutdown: true }))) => {
                    // The run was already stopping: a caller cancel, a deadline,
                    // or a sibling's failure that is reported on its own.
                    tracing::warn!(stage = %name, error = %source, "stage failed during shutdown");
                }
                Ok((name, Err(StageFailure { source, during_shutdown: false }))) => {
                    tracing::warn!(stage = %name, error = %source, "stage failed");
                    if first_error.is_none() {
                        first_error = Some(PipelineError::Stage { stage: name, source });
                    }
                }
                Err(join_error) => {
                    let stage = names
                        .get(&join_error.id())
                        .cloned()
                        .unwrap_or_else(|| "<unknown>".to_string());
                    tracing::warn!(stage = %stage, error = %join_error, "stage task aborted");
                    if first_error.is_none() {
                        run_scope.cancel();
                        first_error = Some(PipelineError::Panicked { stage });
                    }
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => {
                run_scope.mark_done();
                tracing::debug!("pipeline finished");
                Ok(())
            }
        }
    }

    /// Drive one stage, then close both of its ends.
    ///
    /// A failing or panicking stage cancels the run scope before its links
    /// close, so nothing downstream mistakes the failure for end of input.
    async fn run_stage(
        self,
        stage: Stage,
        scope: Scope,
        run_scope: Scope,
        receiver: Option<LinkReceiver>,
        sender: Option<LinkSender>,
    ) -> Result<(), StageFailure> {
        let (_name, kind) = stage.into_parts();
        let mut inbound = Inbound::new(receiver, scope.clone());
        let mut outbound = match sender {
            Some(sender) => Outbound::new(sender, scope.clone()),
            None => Outbound::discard(scope.clone()),
        };

        let body = async {
            match kind {
                StageKind::Source(mut body) => body.produce(&mut outbound).await,
                StageKind::Transform(mut body) => body.transform(&mut inbound, &mut outbound).await,
                StageKind::Sink(mut body) => body.consume(&mut inbound).await,
                StageKind::Composite(Composite::Pipeline(nested)) => {
                    self.run_nested(nested, &scope, &mut inbound, &mut outbound).await
                }
                StageKind::Composite(Composite::ForEach(body)) => {
                    self.run_for_each(body, &scope, &mut inbound, &mut outbound).await
                }
            }
        };
        let outcome = AssertUnwindSafe(body).catch_unwind().await;
        let result = match outcome {
            Ok(result) => result,
            Err(panic) => {
                run_scope.cancel();
                outbound.close();
                inbound.stop();
                std::panic::resume_unwind(panic);
            }
        };

        let during_shutdown = run_scope.is_cancelled();
        if result.is_err() {
            run_scope.cancel();
        }

        // EOF downstream first, then stop everything upstream.
        outbound.close();
        inbound.stop();
        result.map_err(|source| StageFailure {
            source,
            during_shutdown,
        })
    }

    /// A wrapped pipeline reads the composite's inbound link directly. Its
    /// output is relayed through a private link, so the composite's outbound
    /// only closes from `run_stage`, after a nested failure has cancelled the
    /// run.
    async fn run_nested(
        &self,
        nested: Pipeline,
        scope: &Scope,
        inbound: &mut Inbound,
        outbound: &mut Outbound,
    ) -> StageResult {
        let input = inbound.take_receiver();
        if !nested.produces() {
            return self
                .execute(nested, scope, input, None)
                .await
                .map_err(|e| StageError::Nested(e.to_string()));
        }

        let (tx, rx) = link(self.config.link_capacity);
        let run = self.execute(nested, scope, input, Some(tx));
        let forward = async {
            while let RecvOutcome::Record(record) = rx.receive().await {
                if outbound.emit(record).await.is_closed() {
                    rx.close();
                    break;
                }
            }
        };

        let (result, ()) = tokio::join!(run, forward);
        result.map_err(|e| StageError::Nested(e.to_string()))
    }
}

/// A stage error, tagged with whether the run was already being cancelled
/// when it happened.
#[derive(Debug)]
struct StageFailure {
    source: StageError,
    during_shutdown: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::{echo, grep, head, seq, tail, yes};
    use crate::pipeline;
    use async_trait::async_trait;
    use std::time::Duration;

    fn lines(records: Vec<Record>) -> Vec<String> {
        records.into_iter().map(Record::into_line).collect()
    }

    struct Fails;

    #[async_trait]
    impl crate::stage::Transform for Fails {
        async fn transform(&mut self, input: &mut Inbound, _out: &mut Outbound) -> StageResult {
            input.next().await;
            Err(StageError::failure("resource unavailable"))
        }
    }

    struct Panics;

    #[async_trait]
    impl crate::stage::Sink for Panics {
        async fn consume(&mut self, _input: &mut Inbound) -> StageResult {
            panic!("sink exploded");
        }
    }

    struct Stuck;

    #[async_trait]
    impl crate::stage::Source for Stuck {
        async fn produce(&mut self, out: &mut Outbound) -> StageResult {
            out.scope().cancelled().await;
            Ok(())
        }
    }

    /// Drains its input, then fails if it was stopped rather than reaching EOF.
    struct FailsOnShutdown;

    #[async_trait]
    impl crate::stage::Sink for FailsOnShutdown {
        async fn consume(&mut self, input: &mut Inbound) -> StageResult {
            while input.next().await.is_some() {}
            if input.is_cancelled() {
                return Err(StageError::failure("flush failed during shutdown"));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_single_source() {
        let out = PipelineRunner::default().collect(pipeline![echo("hello")]).await.unwrap();
        assert_eq!(lines(out), vec!["hello"]);
    }

    #[tokio::test]
    async fn test_head_limits_output() {
        let out = PipelineRunner::default()
            .collect(pipeline![seq(1, 10), head(3)])
            .await
            .unwrap();
        assert_eq!(lines(out), vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_stage_failure_is_reported_once() {
        let p = pipeline![yes("y"), Stage::transform("fails", Fails), head(10)];
        let err = PipelineRunner::default().collect(p).await.unwrap_err();
        match err {
            PipelineError::Stage { stage, source } => {
                assert_eq!(stage, "fails");
                assert_eq!(source, StageError::failure("resource unavailable"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_panicking_stage_is_reported() {
        let p = pipeline![seq(1, 3), Stage::sink("boom", Panics)];
        let err = PipelineRunner::default().collect(p).await.unwrap_err();
        assert!(matches!(err, PipelineError::Panicked { ref stage } if stage == "boom"));
    }

    #[tokio::test]
    async fn test_invalid_pipeline_is_rejected_before_start() {
        let err = PipelineRunner::default()
            .collect(pipeline![head(1), seq(1, 2)])
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidAdjacency { .. }));
    }

    #[tokio::test]
    async fn test_external_cancel_is_success() {
        let scope = Scope::new();
        let runner = PipelineRunner::default();
        let handle = {
            let scope = scope.clone();
            tokio::spawn(async move {
                runner
                    .run_scoped(pipeline![Stage::source("stuck", Stuck)], &scope)
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        scope.cancel();

        let result = tokio::time::timeout(Duration::from_secs(2), handle).await;
        assert!(result.expect("run did not stop").unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_error_after_external_cancel_is_not_reported() {
        let scope = Scope::new();
        scope.cancel();
        let p = pipeline![yes("y"), Stage::sink("flush", FailsOnShutdown)];
        let result = tokio::time::timeout(
            Duration::from_secs(2),
            PipelineRunner::default().run_scoped(p, &scope),
        )
        .await
        .expect("run did not stop");
        assert!(result.is_ok(), "{result:?}");
    }

    #[tokio::test]
    async fn test_error_after_deadline_still_times_out() {
        let runner = PipelineRunner::new(RunnerConfig::default().with_timeout(Duration::from_millis(20)));
        let p = pipeline![Stage::source("stuck", Stuck), Stage::sink("flush", FailsOnShutdown)];
        let err = runner.run(p).await.unwrap_err();
        assert!(matches!(err, PipelineError::TimedOut { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_failure_cancels_downstream_before_eof() {
        let (records, sink) = collect_into();
        let p = pipeline![seq(1, 10), Stage::transform("fails", Fails), tail(3), sink];
        let err = PipelineRunner::default().run(p).await.unwrap_err();
        assert!(matches!(err, PipelineError::Stage { ref stage, .. } if stage == "fails"));
        assert!(records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_panic_cancels_downstream_before_eof() {
        struct PanicsAfterOne;

        #[async_trait]
        impl crate::stage::Transform for PanicsAfterOne {
            async fn transform(&mut self, input: &mut Inbound, out: &mut Outbound) -> StageResult {
                if let Some(record) = input.next().await {
                    let _ = out.emit(record).await;
                }
                panic!("transform exploded");
            }
        }

        let (records, sink) = collect_into();
        let p = pipeline![seq(1, 10), Stage::transform("boom", PanicsAfterOne), tail(3), sink];
        let err = PipelineRunner::default().run(p).await.unwrap_err();
        assert!(matches!(err, PipelineError::Panicked { ref stage } if stage == "boom"));
        assert!(records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deadline_reports_timeout() {
        let runner = PipelineRunner::new(RunnerConfig::default().with_timeout(Duration::from_millis(20)));
        let err = runner
            .collect(pipeline![Stage::source("stuck", Stuck)])
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::TimedOut { .. }));
    }

    #[tokio::test]
    async fn test_transform_first_reads_nothing() {
        let out = PipelineRunner::default().collect(pipeline![tail(3)]).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_head_in_middle_does_not_cancel_downstream() {
        let out = PipelineRunner::default()
            .collect(pipeline![seq(1, 20), head(5), grep("3")])
            .await
            .unwrap();
        assert_eq!(lines(out), vec!["3"]);
    }
}
