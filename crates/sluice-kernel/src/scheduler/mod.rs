//! Scheduler: wiring stages into a run and driving it to completion.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       PipelineRunner                         │
//! │  ┌─────────┐   link    ┌─────────┐   link    ┌─────────┐     │
//! │  │ stage 0 │──────────▶│ stage 1 │──────────▶│ stage 2 │──▶ output
//! │  │ (spawn) │◀ ─ ─ ─ ─ ─│ (spawn) │◀ ─ ─ ─ ─ ─│ (spawn) │     │
//! │  └─────────┘  close /  └─────────┘  close /  └─────────┘     │
//! │               cancel                cancel                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Records flow downstream through bounded links. Stop signals flow
//! upstream: a consumer closes its inbound link (unblocking a sender stuck
//! in `send`) and cancels its own scope (stopping producers that are not
//! currently sending).
//!
//! Composite stages ([`ForEach`], [`Stage::pipeline`](crate::Stage::pipeline))
//! re-enter the runner with a child scope.

mod composite;
mod pipeline;
mod runner;

pub use composite::{ForEach, for_each};
pub use pipeline::Pipeline;
pub use runner::PipelineRunner;
