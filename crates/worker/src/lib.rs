//! Worker ("Task Manager"): execution-routine thread pool, task server,
//! and idle timer built on the wire protocol, discovery, and native job
//! library crates.

pub mod config;
pub mod error;
pub mod executor;
pub mod idle;
pub mod lifecycle;
pub mod pool;
pub mod server;

pub use config::Config;
pub use error::WorkerError;
