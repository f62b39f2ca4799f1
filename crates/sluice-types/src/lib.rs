//! Pure data types for sluice: records, link outcomes, stage errors.
//!
//! This crate is a leaf dependency with no async runtime and no I/O.
//! Stage implementations that live outside `sluice-kernel` can depend on it
//! alone to speak the engine's vocabulary.

pub mod error;
pub mod outcome;
pub mod record;

// Flat re-exports for convenience
pub use error::*;
pub use outcome::*;
pub use record::*;
