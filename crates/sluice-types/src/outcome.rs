//! Outcomes of link operations and stage roles.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Result of sending a record into a link.
///
/// `RejectedClosed` is not an error: it tells the producer that nobody is
/// reading any more and it should stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum SendOutcome {
    /// The record was queued (or handed off, for a rendezvous link).
    Accepted,
    /// The receiving end is closed; the record was dropped.
    RejectedClosed,
}

impl SendOutcome {
    pub fn is_accepted(self) -> bool {
        matches!(self, SendOutcome::Accepted)
    }

    pub fn is_closed(self) -> bool {
        matches!(self, SendOutcome::RejectedClosed)
    }
}

/// Result of receiving from a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecvOutcome {
    /// The next record in FIFO order.
    Record(Record),
    /// The sender closed and the queue is drained.
    Closed,
}

impl RecvOutcome {
    /// Convert into an `Option`, mapping `Closed` to `None`.
    pub fn into_record(self) -> Option<Record> {
        match self {
            RecvOutcome::Record(r) => Some(r),
            RecvOutcome::Closed => None,
        }
    }
}

/// The capability set of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageRole {
    /// Produces records, consumes none.
    Source,
    /// Consumes and produces records.
    Transform,
    /// Consumes records, produces none.
    Sink,
    /// Consumes and produces records by running nested pipelines.
    Composite,
}

impl StageRole {
    /// Whether a stage of this role reads an inbound link.
    pub fn consumes(self) -> bool {
        !matches!(self, StageRole::Source)
    }

    /// Whether a stage of this role writes an outbound link.
    pub fn produces(self) -> bool {
        !matches!(self, StageRole::Sink)
    }
}

impl fmt::Display for StageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageRole::Source => write!(f, "source"),
            StageRole::Transform => write!(f, "transform"),
            StageRole::Sink => write!(f, "sink"),
            StageRole::Composite => write!(f, "composite"),
        }
    }
}
