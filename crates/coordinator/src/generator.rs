//! Generator loop: pulls tasks from the native job library and
//! pushes them to workers, replaying uncommitted tasks from the
//! submission list once generation has completed.

use std::sync::Arc;
use std::time::Duration;

use spits_ffi::JobManagerHandle;
use tracing::{debug, error};

use crate::config::Config;
use crate::discovery_refresh::EndpointCache;
use crate::session::{self, push_session};
use crate::state::CoordinatorState;

pub async fn run(state: Arc<CoordinatorState>, config: Arc<Config>, job_manager: JobManagerHandle) {
    let mut endpoints = EndpointCache::new();

    while state.is_running() && !state.is_job_complete() {
        let targets = endpoints.refresh(&config).to_vec();

        for endpoint in &targets {
            if !state.is_running() {
                break;
            }
            let addr = match endpoint.resolve() {
                Ok(addr) => addr,
                Err(error) => {
                    debug!(%endpoint, %error, "could not resolve worker endpoint");
                    continue;
                }
            };

            let mut conn = match session::connect(
                addr,
                &state.jobid,
                config.connect_timeout,
                config.recv_timeout,
            )
            .await
            {
                Ok(conn) => conn,
                Err(error) => {
                    debug!(%endpoint, %error, "push session: transient connect/handshake failure");
                    continue;
                }
            };

            let outcome = if state.generation_done() {
                run_redispatch_session(&mut conn, &state, config.send_timeout).await
            } else {
                run_fresh_session(&mut conn, &state, &job_manager, config.send_timeout).await
            };

            match outcome {
                Ok(done) if done => state.mark_generation_done(),
                Ok(_) => {}
                Err(error) => debug!(%endpoint, %error, "push session ended with a transient error"),
            }

            state.submissions.gc_against(&state.pending);

            if state.generation_done() && !state.pending.is_empty() && state.submissions.is_empty() {
                error!("generation done, pending map non-empty, submission list empty: tasks lost");
            }
        }

        if !state.is_job_complete() {
            tokio::time::sleep(config.send_backoff).await;
        }
    }
}

async fn run_fresh_session(
    conn: &mut spits_wire::FramedEndpoint,
    state: &CoordinatorState,
    job_manager: &JobManagerHandle,
    deadline: Duration,
) -> Result<bool, spits_wire::ProtocolError> {
    let outcome = push_session(conn, state.runid(), deadline, || match job_manager.next_task() {
        Ok(next) => {
            let task = next.payload.map(|payload| {
                let taskid = state.next_taskid();
                state.metrics.increment("tasks_generated", 1);
                (taskid, payload)
            });
            (task, next.has_more)
        }
        Err(error) => {
            error!(%error, "job_manager_next_task failed, treating as exhausted for this call");
            (None, false)
        }
    })
    .await?;

    for (taskid, payload) in outcome.dispatched {
        state.pending.insert(taskid, payload.clone());
        state.submissions.push(taskid, payload);
        state.metrics.increment("tasks_sent", 1);
    }

    Ok(outcome.generation_done)
}

async fn run_redispatch_session(
    conn: &mut spits_wire::FramedEndpoint,
    state: &CoordinatorState,
    deadline: Duration,
) -> Result<bool, spits_wire::ProtocolError> {
    let outcome = push_session(conn, state.runid(), deadline, || {
        match state.submissions.pop_oldest_pending(&state.pending) {
            Some(task) => (Some(task), false),
            None => (None, false),
        }
    })
    .await?;

    if !outcome.dispatched.is_empty() {
        state.metrics.increment("tasks_redispatched", outcome.dispatched.len() as i64);
    } else {
        debug!("redispatch round found no replayable task");
    }

    Ok(true)
}
