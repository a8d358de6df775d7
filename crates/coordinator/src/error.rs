//! Coordinator-level error taxonomy: wraps the lower crates' errors
//! and adds the "fatal startup" cases that only the coordinator's own
//! lifecycle produces.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("protocol error: {0}")]
    Protocol(#[from] spits_wire::ProtocolError),

    #[error("native job library error: {0}")]
    Ffi(#[from] spits_ffi::FfiError),

    #[error("discovery error: {0}")]
    Discovery(#[from] spits_discovery::DiscoveryError),

    #[error("core error: {0}")]
    Core(#[from] spits_core::CoreError),

    #[error("job binary not found at {0}")]
    JobBinaryNotFound(String),

    #[error("final commit_job context mismatch: expected {expected:#x}, got {got:#x}")]
    FinalCommitContextMismatch { expected: u64, got: u64 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoordinatorError {
    /// Fatal-startup errors exit the process with status 1; anything
    /// else is handled within the loop that produced it and never reaches
    /// the top level.
    pub fn is_fatal_startup(&self) -> bool {
        matches!(self, CoordinatorError::JobBinaryNotFound(_) | CoordinatorError::Io(_))
    }
}
