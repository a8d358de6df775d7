//! Collector loop: pulls results from workers and feeds them to
//! the native committer, discarding stale, future-run, and duplicate
//! arrivals before they reach `committer_commit_pit`.

use std::sync::Arc;

use spits_core::pending::{is_stale_or_future_run, CompletionEntry};
use spits_ffi::CommitterHandle;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::discovery_refresh::EndpointCache;
use crate::session::{self, pull_session};
use crate::state::CoordinatorState;

pub async fn run(state: Arc<CoordinatorState>, config: Arc<Config>, committer: Arc<CommitterHandle>) {
    let mut endpoints = EndpointCache::new();

    while state.is_running() {
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
                    debug!(%endpoint, %error, "pull session: transient connect/handshake failure");
                    continue;
                }
            };

            let results = match pull_session(&mut conn, config.recv_timeout).await {
                Ok(results) => results,
                Err(error) => {
                    debug!(%endpoint, %error, "pull session ended with a transient error");
                    continue;
                }
            };

            for (taskid, taskrunid, status, payload) in results {
                process_result(&state, &committer, taskid, taskrunid, status, payload);
            }

            state.pending.purge_completed(&state.completed);
        }

        if state.is_running() {
            tokio::time::sleep(config.recv_backoff).await;
        }
    }
}

/// Applies the discard/commit decision tree to a single result.
fn process_result(
    state: &CoordinatorState,
    committer: &CommitterHandle,
    taskid: u64,
    taskrunid: u32,
    status: i64,
    payload: Vec<u8>,
) {
    if is_stale_or_future_run(taskrunid, state.runid()) {
        warn!(taskid, taskrunid, runid = state.runid(), "discarding result from a different run");
        state.metrics.increment("results_discarded", 1);
        return;
    }

    if state.completed.contains(taskid) {
        debug!(taskid, "discarding duplicate result");
        state.metrics.increment("results_discarded", 1);
        return;
    }

    let commit_status = match committer.commit_pit(&payload) {
        Ok(commit_status) => commit_status,
        Err(error) => {
            error!(taskid, %error, "committer_commit_pit failed");
            state.metrics.increment("results_error", 1);
            state.pending.remove(taskid);
            state.completed.insert(taskid, CompletionEntry { status, commit_status: -1 });
            return;
        }
    };

    state.pending.remove(taskid);
    state.completed.insert(taskid, CompletionEntry { status, commit_status });
    state.metrics.increment("tasks_committed", 1);
    if commit_status != 0 || status != 0 {
        state.metrics.increment("results_error", 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spits_core::JobId;
    use std::sync::Arc as StdArc;

    fn state_with_runid(runid: u32) -> StdArc<CoordinatorState> {
        CoordinatorState::new(JobId::new("job"), runid, StdArc::new(spits_core::metrics::MetricsStore::new(8)))
    }

    #[test]
    fn stale_run_is_discarded_without_mutating_pending() {
        let state = state_with_runid(4);
        state.pending.insert(1, vec![0xAA]);
        assert!(is_stale_or_future_run(3, state.runid()));
        assert!(state.pending.contains(1));
    }
}
