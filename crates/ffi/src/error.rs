//! Errors from loading and invoking the native job library.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FfiError {
    #[error("failed to load shared library {path}: {source}")]
    Load { path: String, #[source] source: libloading::Error },

    #[error("native call returned non-zero status {0}")]
    NonZeroStatus(i64),

    #[error("push callback context mismatch: expected {expected}, got {got}")]
    ContextMismatch { expected: u64, got: u64 },

    #[error("required symbol `{0}` is not exported by this job library")]
    MissingSymbol(&'static str),

    #[error("native string was not valid utf-8")]
    InvalidUtf8,
}
