//! Error types shared across the runtime's crates.

use thiserror::Error;

/// Errors raised by the core data-model types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("task {0} is not pending")]
    NotPending(u64),

    #[error("run id mismatch: expected {expected}, got {got}")]
    RunMismatch { expected: u32, got: u32 },

    #[error("metric {0} is not numeric")]
    NotNumeric(String),
}
