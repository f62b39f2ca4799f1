//! sluice-kernel: the streaming pipeline engine.
//!
//! This crate provides:
//!
//! - **Link**: bounded single-producer/single-consumer record queue with
//!   independently closable ends
//! - **Scope**: hierarchical cooperative cancellation
//! - **Stage**: stage traits and the inbound/outbound handles they use
//! - **Scheduler**: the pipeline runner, pipeline assembly, and loop stages
//! - **Builtins**: shell-style stages (`seq`, `head`, `tail`, `grep`, ...)
//! - **Config**: runner tunables loaded from the user config directory
//!
//! ```ignore
//! use sluice_kernel::{builtins::*, pipeline};
//!
//! // yes never ends on its own; head closes the pipe after three records.
//! let out = pipeline![yes("hello"), head(3)].collect().await?;
//! assert_eq!(out.len(), 3);
//! ```

pub mod builtins;
pub mod config;
pub mod error;
pub mod link;
pub mod scheduler;
pub mod scope;
pub mod stage;

pub use config::RunnerConfig;
pub use error::PipelineError;
pub use link::{link, LinkReceiver, LinkSender, DEFAULT_LINK_CAPACITY};
pub use scheduler::{for_each, ForEach, Pipeline, PipelineRunner};
pub use scope::{Scope, ScopeState};
pub use stage::{Inbound, Outbound, Sink, Source, Stage, Transform};

// Data types, so stage authors only need this crate.
pub use sluice_types::*;
