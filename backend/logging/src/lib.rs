//! Structured logging for Plugsmith.
//!
//! Sets up the global `tracing` subscriber and records the human-readable
//! progress log emitted after every scaffold phase.

pub mod logger;
pub mod progress;

pub use logger::{init_logger, init_stderr_logger};
pub use progress::{PhaseOutcome, ProgressEvent, ProgressLog};
