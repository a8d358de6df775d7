//! Command-line argument definitions for every `spits-cli` binary,
//! covering every role's configuration options. Each `*Args` struct is
//! translated into the corresponding role's `Config` by its `src/bin/`
//! entry point.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

fn parse_secs(raw: &str) -> Result<Duration, String> {
    raw.parse::<u64>().map(Duration::from_secs).map_err(|e| e.to_string())
}

fn parse_millis(raw: &str) -> Result<Duration, String> {
    raw.parse::<u64>().map(Duration::from_millis).map_err(|e| e.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AnnounceStyleArg {
    File,
    Cat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TmModeArg {
    Discovery,
    Static,
}

/// `spits-job-manager`: starts the coordinator.
#[derive(Debug, Parser)]
#[command(name = "spits-job-manager", about = "SPITS coordinator (job manager)")]
pub struct JobManagerArgs {
    /// Path to the shared native job library.
    pub job_binary: PathBuf,
    /// Arguments forwarded to the job library's argv.
    pub job_args: Vec<String>,

    #[arg(long)]
    pub jobid: String,
    #[arg(long, default_value = "jm")]
    pub name: String,
    /// `cwd`: change directory before loading the binary.
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Coordinator control port; `0` lets the OS choose.
    #[arg(long, default_value_t = 0)]
    pub port: u16,
    /// Broadcast `TERMINATE` to every known worker on shutdown.
    #[arg(long)]
    pub killtms: bool,

    #[arg(long, default_value = ".")]
    pub announce_dir: PathBuf,
    #[arg(long, value_enum, default_value_t = AnnounceStyleArg::File)]
    pub announce: AnnounceStyleArg,
    /// Path read by the discovery layer when `--announce cat` is used.
    #[arg(long)]
    pub announce_file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = TmModeArg::Discovery)]
    pub tmmode: TmModeArg,
    #[arg(long)]
    pub tmaddr: Option<String>,
    #[arg(long)]
    pub tmport: Option<u16>,

    #[arg(long, default_value = "5", value_parser = parse_secs)]
    pub ctimeout: Duration,
    #[arg(long, default_value = "30", value_parser = parse_secs)]
    pub rtimeout: Duration,
    #[arg(long, default_value = "30", value_parser = parse_secs)]
    pub stimeout: Duration,
    #[arg(long, default_value = "5", value_parser = parse_secs)]
    pub htimeout: Duration,
    #[arg(long, default_value = "500", value_parser = parse_millis)]
    pub rbackoff: Duration,
    #[arg(long, default_value = "500", value_parser = parse_millis)]
    pub sbackoff: Duration,
    #[arg(long, default_value = "10", value_parser = parse_secs)]
    pub heartbeat_interval: Duration,

    #[arg(long, default_value_t = 256)]
    pub metric_buffer: usize,
    #[arg(long)]
    pub metrics_file: Option<PathBuf>,

    #[arg(long)]
    pub log: Option<PathBuf>,
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// `spits-task-manager`: starts a worker.
#[derive(Debug, Parser)]
#[command(name = "spits-task-manager", about = "SPITS worker (task manager)")]
pub struct TaskManagerArgs {
    /// Path to the shared native job library.
    pub job_binary: PathBuf,
    /// Arguments forwarded to the job library's argv.
    pub job_args: Vec<String>,

    #[arg(long)]
    pub jobid: String,
    #[arg(long, default_value = "tm")]
    pub name: String,
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// `hostname`: override the self-advertised host.
    #[arg(long, default_value = "127.0.0.1")]
    pub hostname: String,
    /// Task-server listening port; `0` lets the OS choose.
    #[arg(long, default_value_t = 0)]
    pub port: u16,

    #[arg(long, default_value = ".")]
    pub announce_dir: PathBuf,
    #[arg(long, value_enum, default_value_t = AnnounceStyleArg::File)]
    pub announce: AnnounceStyleArg,
    #[arg(long)]
    pub announce_file: Option<PathBuf>,

    /// `nw`: number of execution routines; defaults to host CPU count.
    #[arg(long)]
    pub nw: Option<usize>,
    #[arg(long, default_value_t = 0)]
    pub tm_overfill: usize,

    #[arg(long, default_value = "30", value_parser = parse_secs)]
    pub rtimeout: Duration,
    #[arg(long, default_value = "30", value_parser = parse_secs)]
    pub stimeout: Duration,
    #[arg(long, default_value = "300", value_parser = parse_secs)]
    pub idle_timeout: Duration,

    #[arg(long, default_value_t = 256)]
    pub metric_buffer: usize,

    #[arg(long)]
    pub log: Option<PathBuf>,
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// `spits-metric-values`: the control CLI surface — metrics query
/// and discovery membership mutation against a running coordinator or
/// worker's control endpoint.
#[derive(Debug, Parser)]
#[command(name = "spits-metric-values", about = "SPITS control CLI (metrics + node membership)")]
pub struct MetricValuesArgs {
    #[command(subcommand)]
    pub command: ControlCommand,

    #[arg(long)]
    pub jobid: String,
    #[arg(long)]
    pub host: String,
    #[arg(long)]
    pub port: u16,
    #[arg(long, default_value = "5", value_parser = parse_secs)]
    pub ctimeout: Duration,
    #[arg(long, default_value = "30", value_parser = parse_secs)]
    pub rtimeout: Duration,

    #[arg(long)]
    pub log: Option<PathBuf>,
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum ControlCommand {
    /// List metric names and sample counts (`QUERY_METRICS_LIST`).
    MetricsList,
    /// Fetch a metric's most recent value (`QUERY_METRICS_LAST`).
    MetricsLast { name: String },
    /// Fetch a metric's full ring-buffer history (`QUERY_METRICS_HISTORY`).
    MetricsHistory { name: String },
    /// Fetch coordinator run state (`QUERY_STATE`).
    State,
    /// List announced workers (`NODES_LIST`).
    NodesList,
    /// Announce a worker endpoint (`NODES_APPEND`).
    NodesAppend { name: String, host: String, port: u16 },
    /// Remove a worker's announce file (`NODES_REMOVE`).
    NodesRemove { name: String },
}

/// `spits-create-job`: lays out a new job directory.
#[derive(Debug, Parser)]
#[command(name = "spits-create-job", about = "Lays out a new SPITS job directory")]
pub struct CreateJobArgs {
    /// Directory to create the job layout in.
    pub dir: PathBuf,
    /// Command line recorded in the `job` file.
    pub command_line: String,

    #[arg(long)]
    pub log: Option<PathBuf>,
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
