//! Coordinator-wide shared state. Every field here is
//! either a lock-protected structure from `spits-core` or a relaxed
//! atomic with a single writer, following a one-mutex-per-structure policy.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use spits_core::metrics::MetricsStore;
use spits_core::{CompletionMap, JobId, PendingMap, RunId, SubmissionList, TaskId};

/// Coordinator job lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Running,
    Draining,
    Done,
}

pub struct CoordinatorState {
    pub jobid: JobId,
    runid: AtomicU32,
    next_taskid: AtomicU64,
    generation_done: AtomicBool,
    running: AtomicBool,
    pub pending: PendingMap,
    pub submissions: SubmissionList,
    pub completed: CompletionMap,
    pub metrics: Arc<MetricsStore>,
}

impl CoordinatorState {
    pub fn new(jobid: JobId, runid: RunId, metrics: Arc<MetricsStore>) -> Arc<Self> {
        Arc::new(Self {
            jobid,
            runid: AtomicU32::new(runid),
            next_taskid: AtomicU64::new(1),
            generation_done: AtomicBool::new(false),
            running: AtomicBool::new(true),
            pending: PendingMap::new(),
            submissions: SubmissionList::new(),
            completed: CompletionMap::new(),
            metrics,
        })
    }

    pub fn runid(&self) -> RunId {
        self.runid.load(Ordering::Relaxed)
    }

    /// Allocates the next strictly increasing `taskid`.
    pub fn next_taskid(&self) -> TaskId {
        self.next_taskid.fetch_add(1, Ordering::Relaxed)
    }

    pub fn generation_done(&self) -> bool {
        self.generation_done.load(Ordering::Relaxed)
    }

    /// Monotonic: never cleared within a run.
    pub fn mark_generation_done(&self) {
        self.generation_done.store(true, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Job completion condition: generation done and the
    /// pending map empty.
    pub fn is_job_complete(&self) -> bool {
        self.generation_done() && self.pending.is_empty()
    }

    pub fn phase(&self) -> Phase {
        if !self.is_running() && self.is_job_complete() {
            Phase::Done
        } else if self.generation_done() {
            Phase::Draining
        } else {
            Phase::Running
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> Arc<CoordinatorState> {
        CoordinatorState::new(JobId::new("job-1"), 1, Arc::new(MetricsStore::new(8)))
    }

    #[test]
    fn taskids_are_strictly_increasing_from_one() {
        let s = state();
        assert_eq!(s.next_taskid(), 1);
        assert_eq!(s.next_taskid(), 2);
        assert_eq!(s.next_taskid(), 3);
    }

    #[test]
    fn completion_requires_generation_done_and_empty_pending() {
        let s = state();
        s.pending.insert(1, vec![]);
        assert!(!s.is_job_complete());
        s.mark_generation_done();
        assert!(!s.is_job_complete());
        s.pending.remove(1);
        assert!(s.is_job_complete());
    }

    #[test]
    fn phase_transitions_follow_the_state_machine() {
        let s = state();
        assert_eq!(s.phase(), Phase::Running);
        s.mark_generation_done();
        assert_eq!(s.phase(), Phase::Draining);
        s.stop();
        assert_eq!(s.phase(), Phase::Done);
    }
}
