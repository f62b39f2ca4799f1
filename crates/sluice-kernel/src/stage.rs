//! Stage descriptors and the handles stages use to move records.
//!
//! A stage is one of a closed set of kinds. The runner matches on the kind
//! to decide which links to wire and which entry point to call:
//!
//! | kind        | inbound | outbound | entry point                       |
//! |-------------|---------|----------|-----------------------------------|
//! | `Source`    | no      | yes      | [`Source::produce`]               |
//! | `Transform` | yes     | yes      | [`Transform::transform`]          |
//! | `Sink`      | yes     | no       | [`Sink::consume`]                 |
//! | `Composite` | yes     | yes      | nested runs driven by the runner  |

use async_trait::async_trait;
use sluice_types::{Record, SendOutcome, StageResult, StageRole};

use crate::link::{LinkReceiver, LinkSender};
use crate::scheduler::{ForEach, Pipeline};
use crate::scope::Scope;

/// A stage that produces records and reads nothing.
#[async_trait]
pub trait Source: Send {
    /// Emit records until exhausted, or until `out` reports closed.
    async fn produce(&mut self, out: &mut Outbound) -> StageResult;
}

/// A stage that reads records and emits records.
#[async_trait]
pub trait Transform: Send {
    /// Read from `input`, emit to `out`. Returning early is an early-stop.
    async fn transform(&mut self, input: &mut Inbound, out: &mut Outbound) -> StageResult;
}

/// A stage that reads records and emits nothing.
#[async_trait]
pub trait Sink: Send {
    /// Read from `input` until it reports closed.
    async fn consume(&mut self, input: &mut Inbound) -> StageResult;
}

/// Body of a composite stage.
pub enum Composite {
    /// A fixed pipeline run once, wired to the composite's own links.
    Pipeline(Pipeline),
    /// A per-record callback that may spawn a nested pipeline.
    ForEach(ForEach),
}

/// What a stage does.
pub enum StageKind {
    Source(Box<dyn Source>),
    Transform(Box<dyn Transform>),
    Sink(Box<dyn Sink>),
    Composite(Composite),
}

/// A named, immutable stage descriptor.
pub struct Stage {
    name: String,
    kind: StageKind,
}

impl Stage {
    pub fn source(name: impl Into<String>, body: impl Source + 'static) -> Self {
        Self {
            name: name.into(),
            kind: StageKind::Source(Box::new(body)),
        }
    }

    pub fn transform(name: impl Into<String>, body: impl Transform + 'static) -> Self {
        Self {
            name: name.into(),
            kind: StageKind::Transform(Box::new(body)),
        }
    }

    pub fn sink(name: impl Into<String>, body: impl Sink + 'static) -> Self {
        Self {
            name: name.into(),
            kind: StageKind::Sink(Box::new(body)),
        }
    }

    /// Wrap a whole pipeline as a single stage.
    pub fn pipeline(name: impl Into<String>, pipeline: Pipeline) -> Self {
        Self {
            name: name.into(),
            kind: StageKind::Composite(Composite::Pipeline(pipeline)),
        }
    }

    /// A loop stage running `body` once per inbound record.
    pub fn for_each(name: impl Into<String>, body: ForEach) -> Self {
        Self {
            name: name.into(),
            kind: StageKind::Composite(Composite::ForEach(body)),
        }
    }

    /// Human-readable name for diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capability set of this stage.
    ///
    /// A wrapped pipeline takes its capabilities from its ends: one that
    /// starts with a source cannot accept input, one that ends with a sink
    /// produces nothing.
    pub fn role(&self) -> StageRole {
        match &self.kind {
            StageKind::Source(_) => StageRole::Source,
            StageKind::Transform(_) => StageRole::Transform,
            StageKind::Sink(_) => StageRole::Sink,
            StageKind::Composite(Composite::ForEach(_)) => StageRole::Composite,
            StageKind::Composite(Composite::Pipeline(p)) => {
                match (p.consumes(), p.produces()) {
                    (false, _) => StageRole::Source,
                    (true, false) => StageRole::Sink,
                    (true, true) => StageRole::Composite,
                }
            }
        }
    }

    pub(crate) fn kind(&self) -> &StageKind {
        &self.kind
    }

    pub(crate) fn into_parts(self) -> (String, StageKind) {
        (self.name, self.kind)
    }

    pub(crate) fn from_parts(name: String, kind: StageKind) -> Self {
        Self { name, kind }
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("role", &self.role())
            .finish()
    }
}

/// Read side of a stage: its inbound link plus its scope.
pub struct Inbound {
    receiver: Option<LinkReceiver>,
    scope: Scope,
}

impl Inbound {
    pub(crate) fn new(receiver: Option<LinkReceiver>, scope: Scope) -> Self {
        Self { receiver, scope }
    }

    /// Next record, or `None` once the link is closed or the scope cancelled.
    pub async fn next(&mut self) -> Option<Record> {
        if self.scope.is_cancelled() {
            return None;
        }
        let receiver = self.receiver.as_ref()?;
        tokio::select! {
            biased;
            _ = self.scope.cancelled() => None,
            outcome = receiver.receive() => outcome.into_record(),
        }
    }

    /// Early-stop: close the inbound link and cancel this stage's scope,
    /// which stops every stage upstream. Idempotent.
    pub fn stop(&mut self) {
        if let Some(receiver) = self.receiver.take() {
            receiver.close();
            tracing::trace!("inbound closed early");
        }
        self.scope.cancel();
    }

    /// Whether this stage has been asked to stop.
    pub fn is_cancelled(&self) -> bool {
        self.scope.is_cancelled()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub(crate) fn take_receiver(&mut self) -> Option<LinkReceiver> {
        self.receiver.take()
    }
}

enum Target {
    Link(LinkSender),
    Discard,
    Closed,
}

/// Write side of a stage: its outbound link plus its scope.
pub struct Outbound {
    target: Target,
    scope: Scope,
    sent: u64,
}

impl Outbound {
    pub(crate) fn new(sender: LinkSender, scope: Scope) -> Self {
        Self {
            target: Target::Link(sender),
            scope,
            sent: 0,
        }
    }

    /// An outbound that accepts and drops everything (stage output unused).
    pub(crate) fn discard(scope: Scope) -> Self {
        Self {
            target: Target::Discard,
            scope,
            sent: 0,
        }
    }

    /// Emit a record downstream.
    ///
    /// `RejectedClosed` means downstream stopped reading or the scope was
    /// cancelled; the stage should return `Ok(())`.
    pub async fn emit(&mut self, record: Record) -> SendOutcome {
        if self.scope.is_cancelled() {
            return SendOutcome::RejectedClosed;
        }
        let outcome = match &self.target {
            Target::Link(sender) => {
                // A hand-off that already completed counts even if the scope
                // was cancelled meanwhile.
                tokio::select! {
                    biased;
                    outcome = sender.send(record) => outcome,
                    _ = self.scope.cancelled() => SendOutcome::RejectedClosed,
                }
            }
            Target::Discard => {
                // Never blocks otherwise, so give cancellation a chance to land.
                tokio::task::yield_now().await;
                SendOutcome::Accepted
            }
            Target::Closed => SendOutcome::RejectedClosed,
        };
        match outcome {
            SendOutcome::Accepted => self.sent += 1,
            SendOutcome::RejectedClosed => tracing::trace!(sent = self.sent, "outbound closed"),
        }
        outcome
    }

    /// Emit a line as a record.
    pub async fn emit_line(&mut self, line: impl Into<String>) -> SendOutcome {
        self.emit(Record::new(line)).await
    }

    /// Whether producing more is pointless: scope cancelled or receiver gone.
    pub fn is_cancelled(&self) -> bool {
        self.scope.is_cancelled()
            || match &self.target {
                Target::Link(sender) => sender.is_receiver_closed(),
                Target::Discard => false,
                Target::Closed => true,
            }
    }

    /// Records accepted so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Signal end of data downstream. Idempotent.
    pub fn close(&mut self) {
        if let Target::Link(sender) = std::mem::replace(&mut self.target, Target::Closed) {
            sender.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::link;
    use sluice_types::RecvOutcome;

    #[tokio::test]
    async fn test_emit_counts_accepted() {
        let (tx, rx) = link(4);
        let mut out = Outbound::new(tx, Scope::new());

        assert!(out.emit_line("a").await.is_accepted());
        assert!(out.emit_line("b").await.is_accepted());
        assert_eq!(out.sent(), 2);

        drop(rx);
        assert!(out.emit_line("c").await.is_closed());
        assert_eq!(out.sent(), 2);
        assert!(out.is_cancelled());
    }

    #[tokio::test]
    async fn test_emit_after_scope_cancel_is_rejected() {
        let (tx, _rx) = link(4);
        let scope = Scope::new();
        let mut out = Outbound::new(tx, scope.clone());

        scope.cancel();
        assert!(out.emit_line("x").await.is_closed());
    }

    #[tokio::test]
    async fn test_close_signals_eof() {
        let (tx, rx) = link(4);
        let mut out = Outbound::new(tx, Scope::new());
        out.emit_line("only").await.is_accepted();
        out.close();
        out.close();

        assert_eq!(rx.receive().await, RecvOutcome::Record(Record::new("only")));
        assert_eq!(rx.receive().await, RecvOutcome::Closed);
    }

    #[tokio::test]
    async fn test_inbound_stop_closes_link_and_cancels_scope() {
        let (tx, rx) = link(4);
        let scope = Scope::new();
        let upstream = scope.child_scope();
        let mut input = Inbound::new(Some(rx), scope);

        input.stop();
        assert!(upstream.is_cancelled());
        assert!(tx.send(Record::new("late")).await.is_closed());
        assert_eq!(input.next().await, None);
    }

    #[tokio::test]
    async fn test_inbound_without_link_is_empty() {
        let mut input = Inbound::new(None, Scope::new());
        assert_eq!(input.next().await, None);
    }

    #[tokio::test]
    async fn test_discard_accepts_everything() {
        let mut out = Outbound::discard(Scope::new());
        assert!(out.emit_line("gone").await.is_accepted());
        assert_eq!(out.sent(), 1);
    }
}
