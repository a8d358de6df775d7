//! Worker-level error taxonomy: wraps the lower crates' errors and
//! adds the "fatal startup" cases only the worker's own lifecycle produces.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("protocol error: {0}")]
    Protocol(#[from] spits_wire::ProtocolError),

    #[error("native job library error: {0}")]
    Ffi(#[from] spits_ffi::FfiError),

    #[error("discovery error: {0}")]
    Discovery(#[from] spits_discovery::DiscoveryError),

    #[error("job binary not found at {0}")]
    JobBinaryNotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
