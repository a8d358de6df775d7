//! `spits-task-manager` command: assembles a worker [`Config`], records
//! its `TM-*.pid` lifecycle file, and runs the worker to
//! completion (the worker lifecycle only ever exits via `TERMINATE` or
//! the idle timer).

use spits_core::JobId;
use spits_discovery::jobdir::{JobDir, ProcessDescriptor};
use spits_worker::config::{AnnounceStyle, Config, LogTarget, Verbosity};

use crate::args::{AnnounceStyleArg, TaskManagerArgs};

pub async fn run(args: TaskManagerArgs) -> i32 {
    if let Some(cwd) = &args.cwd {
        if let Err(error) = std::env::set_current_dir(cwd) {
            tracing::error!(%error, dir = %cwd.display(), "failed to change working directory");
            return 1;
        }
    }

    let config = build_config(&args);

    let job_dir = JobDir::new(&config.announce_dir);
    if let Err(error) = job_dir.ensure_layout() {
        tracing::error!(%error, "failed to create job directory layout");
        return 1;
    }
    let descriptor = ProcessDescriptor {
        pid: std::process::id(),
        command_line: format!("{} {}", config.job_binary.display(), config.job_args.join(" ")),
        announce_file: config.announce_dir.join("nodes").join(format!("{}.node", config.name)),
    };
    if let Err(error) = job_dir.write_pid_file(&format!("TM-{}.pid", config.name), &descriptor) {
        tracing::error!(%error, "failed to write TM pid file");
    }

    spits_worker::lifecycle::run(config).await
}

fn build_config(args: &TaskManagerArgs) -> Config {
    Config {
        jobid: JobId::new(args.jobid.clone()),
        name: args.name.clone(),
        job_binary: args.job_binary.clone(),
        job_args: args.job_args.clone(),
        hostname: args.hostname.clone(),
        listen_port: args.port,
        announce_dir: args
        .announce_file
        .as_ref()
        .and_then(|f| f.parent())
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| args.announce_dir.clone()),
        announce_style: match args.announce {
            AnnounceStyleArg::File => AnnounceStyle::File,
            AnnounceStyleArg::Cat => AnnounceStyle::Cat,
        },
        workers: args.nw,
        overfill: args.tm_overfill,
        idle_timeout: args.idle_timeout,
        recv_timeout: args.rtimeout,
        send_timeout: args.stimeout,
        metric_buffer: args.metric_buffer,
        log: args.log.clone().map(LogTarget::File).unwrap_or(LogTarget::Stderr),
        verbosity: Verbosity::from_level(args.verbose),
    }
}
