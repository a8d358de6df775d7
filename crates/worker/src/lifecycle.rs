//! Worker process lifecycle: loads the native job library, spawns
//! the execution-routine thread pool, announces the listening endpoint,
//! and runs the task server and idle timer through to process exit.

use std::ffi::CString;
use std::net::SocketAddr;
use std::sync::Arc;

use spits_core::metrics::MetricsStore;
use spits_ffi::{JobLibrary, MetricsBridge, WorkerHandle};
use spits_discovery::{NodesDir, WorkerEndpoint};
use spits_wire::Listener;
use tracing::info;

use crate::config::{AnnounceStyle, Config};
use crate::error::WorkerError;
use crate::executor;
use crate::idle::{self, IdleClock};
use crate::pool::TaskPool;
use crate::server::{self, ServerContext};

/// Runs a worker to completion. Only returns on fatal startup error; the
/// running process otherwise exits directly via `std::process::exit`
/// from the task server (`TERMINATE`) or the idle timer.
pub async fn run(config: Config) -> i32 {
    match run_inner(config).await {
        Ok(()) => 0,
        Err(error) => {
            tracing::error!(%error, "fatal startup error");
            1
        }
    }
}

async fn run_inner(config: Config) -> Result<(), WorkerError> {
    if !config.job_binary.is_file() {
        return Err(WorkerError::JobBinaryNotFound(config.job_binary.display().to_string()));
    }

    let lib = Arc::new(JobLibrary::load(&config.job_binary)?);
    let argv = Arc::new(CString::new(config.job_args.join(" ")).unwrap_or_default());

    let metrics_store = Arc::new(MetricsStore::new(config.metric_buffer));
    let metrics_bridge = Arc::new(MetricsBridge::new(Arc::clone(&metrics_store)));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));
    let listener = Listener::bind(addr).await?;
    let announced_port = listener.local_addr()?.port();
    info!(port = announced_port, "task server listening");

    announce(&config, announced_port)?;

    let pool = Arc::new(TaskPool::new(config.pool_capacity()));
    let idle = IdleClock::new();

    {
        let lib = Arc::clone(&lib);
        let argv = Arc::clone(&argv);
        let metrics_bridge = Arc::clone(&metrics_bridge);
        let make_handle = move || -> Result<WorkerHandle, spits_ffi::FfiError> {
            WorkerHandle::new(Arc::clone(&lib), &argv, &metrics_bridge.vtable)
        };
        executor::spawn_routines(
            config.worker_count(),
            make_handle,
            Arc::clone(&pool),
            Arc::clone(&metrics_store),
        );
    }

    let ctx = Arc::new(ServerContext {
            jobid: config.jobid.clone(),
            pool: Arc::clone(&pool),
            idle: Arc::clone(&idle),
            metrics: metrics_store,
            recv_timeout: config.recv_timeout,
            send_timeout: config.send_timeout,
        });

    tokio::select! {
        _ = server::serve(listener, ctx) => {}
        _ = idle::run(Arc::clone(&idle), Arc::clone(&pool), config.idle_timeout) => {}
    }

    Ok(())
}

/// Announces this worker's listening endpoint via the configured
/// discovery style.
fn announce(config: &Config, port: u16) -> Result<(), WorkerError> {
    let endpoint = WorkerEndpoint::new(config.hostname.clone(), port);
    match config.announce_style {
        AnnounceStyle::File => {
            NodesDir::new(config.announce_dir.join("nodes")).announce(&config.name, &endpoint)?;
        }
        AnnounceStyle::Cat => {
            let path = config.announce_dir.join("nodes.txt");
            use std::io::Write;
            let mut file = std::fs::OpenOptions::new().create(true).append(true).open(&path)?;
            writeln!(file, "{}", endpoint.to_line())?;
        }
    }
    info!(name = %config.name, %endpoint, "announced worker endpoint");
    Ok(())
}
