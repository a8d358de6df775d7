//! Coordinator configuration. Every timeout is expressed as a
//! [`Duration`] at this layer; the CLI crate is responsible for parsing
//! the raw `--flag seconds` strings into this struct.

use std::path::PathBuf;
use std::time::Duration;

use spits_core::JobId;

#[derive(Debug, Clone)]
pub struct Config {
    pub jobid: JobId,
    pub name: String,
    pub working_dir: Option<PathBuf>,
    pub job_binary: PathBuf,
    pub job_args: Vec<String>,

    /// Discovery directory root (parent of `nodes/` / `nodes.txt`).
    pub announce_dir: PathBuf,
    /// `file` (per-worker files, preferred) or `cat` (single shared file,
    /// deprecated).
    pub announce_style: AnnounceStyle,

    /// `tmmode=static` (`tmmode/tmaddr/tmport`): bypass discovery
    /// entirely and dispatch to this one fixed worker endpoint. `None`
    /// means `tmmode=discovery`, the default.
    pub tm_static: Option<(String, u16)>,

    pub control_port: u16,
    pub kill_tms_on_shutdown: bool,

    pub connect_timeout: Duration,
    pub recv_timeout: Duration,
    pub send_timeout: Duration,
    pub heartbeat_response_timeout: Duration,

    pub send_backoff: Duration,
    pub recv_backoff: Duration,
    pub heartbeat_interval: Duration,

    pub metric_buffer: usize,
    pub metrics_file: Option<PathBuf>,

    pub log: LogTarget,
    pub verbosity: Verbosity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceStyle {
    File,
    Cat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Error,
    Info,
    Debug,
}

impl Verbosity {
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Verbosity::Error,
            1 => Verbosity::Info,
            _ => Verbosity::Debug,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jobid: JobId::new("unnamed-job"),
            name: "jm".to_string(),
            working_dir: None,
            job_binary: PathBuf::new(),
            job_args: Vec::new(),
            announce_dir: PathBuf::from("."),
            announce_style: AnnounceStyle::File,
            tm_static: None,
            control_port: 0,
            kill_tms_on_shutdown: false,
            connect_timeout: Duration::from_secs(5),
            recv_timeout: Duration::from_secs(30),
            send_timeout: Duration::from_secs(30),
            heartbeat_response_timeout: Duration::from_secs(5),
            send_backoff: Duration::from_millis(500),
            recv_backoff: Duration::from_millis(500),
            heartbeat_interval: Duration::from_secs(10),
            metric_buffer: 256,
            metrics_file: None,
            log: LogTarget::Stderr,
            verbosity: Verbosity::Info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels_map_as_specified() {
        assert_eq!(Verbosity::from_level(0), Verbosity::Error);
        assert_eq!(Verbosity::from_level(1), Verbosity::Info);
        assert_eq!(Verbosity::from_level(2), Verbosity::Debug);
        assert_eq!(Verbosity::from_level(9), Verbosity::Debug);
    }
}
