//! Coordinator process lifecycle: loads the native job library,
//! runs the optional `main` entry point, spawns the generator/collector/
//! heartbeat/control-server tasks, and drives the final
//! `INIT → RUNNING → DRAINING → DONE` transition through to the job-wide
//! commit and process exit code.

use std::ffi::CString;
use std::sync::Arc;

use spits_core::metrics::MetricsStore;
use spits_ffi::{CommitterHandle, JobLibrary, JobManagerHandle, MetricsBridge};
use spits_wire::FramedEndpoint;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::CoordinatorError;
use crate::session;
use crate::state::CoordinatorState;

/// Runs a job to completion and returns the user-visible process exit
/// code: the native committer's status on success, 1 on fatal startup.
pub async fn run(config: Config) -> i32 {
    let config = Arc::new(config);

    match run_inner(Arc::clone(&config)).await {
        Ok(exit_code) => exit_code,
        Err(error) => {
            error!(%error, "fatal startup error");
            1
        }
    }
}

async fn run_inner(config: Arc<Config>) -> Result<i32, CoordinatorError> {
    if !config.job_binary.is_file() {
        return Err(CoordinatorError::JobBinaryNotFound(config.job_binary.display().to_string()));
    }

    let lib = Arc::new(JobLibrary::load(&config.job_binary)?);
    let argv = CString::new(config.job_args.join(" ")).unwrap_or_default();

    let metrics_store = Arc::new(MetricsStore::new(config.metric_buffer));
    let metrics_bridge = MetricsBridge::new(Arc::clone(&metrics_store));

    let (status, jobinfo) = lib.run_main(&argv, |_argv| (0, Vec::new()))?.unwrap_or((0, Vec::new()));
    if status != 0 {
        warn!(status, "native main returned non-zero status");
    }

    let job_manager = JobManagerHandle::new(Arc::clone(&lib), &argv, &jobinfo, &metrics_bridge.vtable)?;
    let committer = Arc::new(CommitterHandle::new(
            Arc::clone(&lib),
            &argv,
            &jobinfo,
            &metrics_bridge.vtable,
        )?);

    let state = CoordinatorState::new(config.jobid.clone(), 1, Arc::clone(&metrics_store));
    info!(jobid = %state.jobid, "coordinator running");

    let generator = tokio::spawn(crate::generator::run(
            Arc::clone(&state),
            Arc::clone(&config),
            job_manager,
        ));
    let collector = tokio::spawn(crate::collector::run(
            Arc::clone(&state),
            Arc::clone(&config),
            Arc::clone(&committer),
        ));
    let heartbeat = tokio::spawn(crate::heartbeat::run(Arc::clone(&state), Arc::clone(&config)));
    let control = tokio::spawn(crate::control::serve(Arc::clone(&state), Arc::clone(&config)));

    wait_for_completion_or_signal(&state).await;
    state.stop();

    if config.kill_tms_on_shutdown {
        broadcast_terminate(&state, &config).await;
    }

    let _ = generator.await;
    let _ = collector.await;
    heartbeat.abort();
    control.abort();

    // `commit_job` itself verifies the pushed context equals the magic
    // value ; an `Err` here already means that check failed.
    let (final_status, _jobinfo) = committer.commit_job()?;
    info!(final_status, "committer_commit_job completed");

    Ok(final_status as i32)
}

async fn wait_for_completion_or_signal(state: &CoordinatorState) {
    loop {
        if state.is_job_complete() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(std::time::Duration::from_millis(200)) => {}
            _ = tokio::signal::ctrl_c() => {
                warn!("received shutdown signal, draining");
                return;
            }
        }
    }
}

async fn broadcast_terminate(state: &CoordinatorState, config: &Config) {
    let mut cache = crate::discovery_refresh::EndpointCache::new();
    let targets = cache.refresh(config).to_vec();
    for endpoint in targets {
        let Ok(addr) = endpoint.resolve() else { continue };
        let connected: Result<FramedEndpoint, _> =
        session::connect(addr, &state.jobid, config.connect_timeout, config.recv_timeout).await;
        match connected {
            Ok(mut conn) => {
                if let Err(error) = session::send_terminate(&mut conn).await {
                    warn!(%endpoint, %error, "failed to broadcast terminate");
                }
            }
            Err(error) => warn!(%endpoint, %error, "failed to connect while broadcasting terminate"),
        }
    }
}

