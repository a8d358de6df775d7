//! Native job-library binding: dynamic loading, the five
//! entry-point groups, and the metrics capability passed to each of them.

pub mod abi;
pub mod error;
pub mod library;
pub mod metrics_bridge;
pub mod push_sink;

pub use error::FfiError;
pub use library::{CommitterHandle, JobLibrary, JobManagerHandle, NextTaskOutcome, WorkerHandle};
pub use metrics_bridge::{MetricsBridge, MetricsVTable};
