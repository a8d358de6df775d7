//! `spits-job-manager` command: assembles a coordinator [`Config`] from
//! parsed args, records the job's lifecycle files, and runs the
//! coordinator to completion.

use anyhow::{bail, Context};
use spits_coordinator::config::{AnnounceStyle, Config, LogTarget, Verbosity};
use spits_core::JobId;
use spits_discovery::jobdir::{FinishedStatus, JobDir, ProcessDescriptor};

use crate::args::{AnnounceStyleArg, JobManagerArgs, TmModeArg};
use crate::commands::unix_timestamp;

pub async fn run(args: JobManagerArgs) -> anyhow::Result<i32> {
    if let Some(cwd) = &args.cwd {
        std::env::set_current_dir(cwd)
        .with_context(|| format!("failed to change working directory to {}", cwd.display()))?;
    }

    let config = build_config(&args)?;

    let job_dir = JobDir::new(&config.announce_dir);
    job_dir.ensure_layout().context("failed to create job directory layout")?;

    let command_line = format!("{} {}", config.job_binary.display(), config.job_args.join(" "));
    let descriptor = ProcessDescriptor {
        pid: std::process::id(),
        command_line: command_line.clone(),
        announce_file: config.announce_dir.join("nodes"),
    };
    if let Err(error) = job_dir.write_pid_file("jm.pid", &descriptor) {
        tracing::error!(%error, "failed to write jm.pid");
    }
    let _ = job_dir.write_job(&command_line);
    let _ = job_dir.write_finished(FinishedStatus::Running);

    let exit_code = spits_coordinator::lifecycle::run(config).await;

    let _ = job_dir.write_finished(FinishedStatus::CompletedAt(unix_timestamp()));
    Ok(exit_code)
}

fn build_config(args: &JobManagerArgs) -> anyhow::Result<Config> {
    let tm_static = match args.tmmode {
        TmModeArg::Discovery => None,
        TmModeArg::Static => match args.tmaddr.clone().zip(args.tmport) {
            Some(pair) => Some(pair),
            None => bail!("--tmmode static requires both --tmaddr and --tmport"),
        },
    };

    Ok(Config {
            jobid: JobId::new(args.jobid.clone()),
            name: args.name.clone(),
            working_dir: args.cwd.clone(),
            job_binary: args.job_binary.clone(),
            job_args: args.job_args.clone(),
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
            tm_static,
            control_port: args.port,
            kill_tms_on_shutdown: args.killtms,
            connect_timeout: args.ctimeout,
            recv_timeout: args.rtimeout,
            send_timeout: args.stimeout,
            heartbeat_response_timeout: args.htimeout,
            send_backoff: args.sbackoff,
            recv_backoff: args.rbackoff,
            heartbeat_interval: args.heartbeat_interval,
            metric_buffer: args.metric_buffer,
            metrics_file: args.metrics_file.clone(),
            log: args.log.clone().map(LogTarget::File).unwrap_or(LogTarget::Stderr),
            verbosity: Verbosity::from_level(args.verbose),
        })
}
