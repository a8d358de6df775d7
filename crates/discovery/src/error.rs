//! Discovery-subsystem errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("io error at {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
}

pub(crate) fn io_err(path: impl Into<String>, source: std::io::Error) -> DiscoveryError {
    DiscoveryError::Io { path: path.into(), source }
}
