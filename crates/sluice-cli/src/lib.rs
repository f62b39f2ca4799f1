//! sluice CLI library: the demo programs behind the `sluice` binary.
//!
//! Each demo builds ordinary [`Pipeline`](sluice_kernel::Pipeline)s out of
//! builtin stages, so the pipelines themselves are testable without going
//! through stdout.

pub mod demos;

pub use demos::{file_stats, log_processor, pipe_closure};
