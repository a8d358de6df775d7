//! Execution routines: one OS thread per routine, blocking on
//! the task pool's receiver and calling into the native `worker_run` symbol.
//! Threads, not async tasks, since the native call is synchronous and may
//! run for an unbounded time.

use std::sync::Arc;
use std::time::Instant;

use spits_core::metrics::{MetricValue, MetricsStore};
use spits_ffi::WorkerHandle;
use tracing::error;

use crate::pool::TaskPool;

/// Spawns `count` execution-routine threads, each owning its own
/// `WorkerHandle` (a handle is never shared between threads).
pub fn spawn_routines<F>(
    count: usize,
    make_handle: F,
    pool: Arc<TaskPool>,
    metrics: Arc<MetricsStore>,
) -> Vec<std::thread::JoinHandle<()>>
where
    F: Fn() -> Result<WorkerHandle, spits_ffi::FfiError> + Send + Sync + 'static,
{
    let make_handle = Arc::new(make_handle);
    (0..count)
        .filter_map(|index| {
            let make_handle = Arc::clone(&make_handle);
            let pool = Arc::clone(&pool);
            let metrics = Arc::clone(&metrics);
            match std::thread::Builder::new()
                .name(format!("spits-exec-{index}"))
                .spawn(move || run_routine(index, make_handle(), pool, metrics))
            {
                Ok(join_handle) => Some(join_handle),
                Err(source) => {
                    error!(index, %source, "failed to spawn execution routine thread");
                    None
                }
            }
        })
        .collect()
}

fn run_routine(
    index: usize,
    handle: Result<WorkerHandle, spits_ffi::FfiError>,
    pool: Arc<TaskPool>,
    metrics: Arc<MetricsStore>,
) {
    let handle = match handle {
        Ok(handle) => handle,
        Err(error) => {
            error!(index, %error, "execution routine failed to construct its worker handle, exiting");
            return;
        }
    };

    while let Some((taskid, runid, payload)) = pool.recv_task() {
        let started = Instant::now();
        match handle.run(taskid, &payload) {
            Ok((status, result)) => {
                metrics.increment("tasks_processed", 1);
                metrics.set("task_time", MetricValue::Double(started.elapsed().as_secs_f64()));
                pool.complete((taskid, runid, status, result));
            }
            Err(error) => {
                error!(index, taskid, %error, "worker_run push context mismatch, dropping task");
                pool.drop_slot();
            }
        }
    }
}
