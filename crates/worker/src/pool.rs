//! Bounded worker task pool: a capacity-gated admission queue of
//! incoming tasks and a completion queue drained by `READ_RESULT`
//! handlers. Backed by `crossbeam_channel`, since execution routines are
//! OS threads making blocking native-library calls ('s "parallel
//! threads" scheduling model), not async tasks.

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{Receiver, Sender};
use spits_core::{RunId, TaskId};

pub type IncomingTask = (TaskId, RunId, Vec<u8>);
pub type CompletedResult = (TaskId, RunId, i64, Vec<u8>);

/// Bounded MPMC queue of accepted tasks plus a completion queue of
/// finished results ("Worker task pool").
pub struct TaskPool {
    capacity: usize,
    in_flight: AtomicUsize,
    task_tx: Sender<IncomingTask>,
    task_rx: Receiver<IncomingTask>,
    completed_tx: Sender<CompletedResult>,
    completed_rx: Receiver<CompletedResult>,
}

impl TaskPool {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (task_tx, task_rx) = crossbeam_channel::bounded(capacity);
        let (completed_tx, completed_rx) = crossbeam_channel::unbounded();
        Self { capacity, in_flight: AtomicUsize::new(0), task_tx, task_rx, completed_tx, completed_rx }
    }

    /// True iff the in-flight count (queued + currently executing) meets
    /// capacity. The admission predicate used by the task server.
    pub fn full(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) >= self.capacity
    }

    /// Attempts to admit a task. Returns `false` if the pool is full —
    /// the caller replies `SEND_RJCT` in that case.
    pub fn try_admit(&self, taskid: TaskId, runid: RunId, payload: Vec<u8>) -> bool {
        loop {
            let current = self.in_flight.load(Ordering::Acquire);
            if current >= self.capacity {
                return false;
            }
            if self
                .in_flight
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                break;
            }
        }
        // A bounded send can't block here: admission above reserved the
        // one slot this push consumes. The channel only closes once this
        // `TaskPool` (which holds both ends) is dropped, so a send error
        // here means the pool itself is gone; release the slot and report
        // the admission as having failed.
        if self.task_tx.send((taskid, runid, payload)).is_err() {
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            return false;
        }
        true
    }

    /// Blocks the calling (execution-routine) thread until a task is
    /// available, or returns `None` once every sender has been dropped
    /// (process shutdown).
    pub fn recv_task(&self) -> Option<IncomingTask> {
        self.task_rx.recv().ok()
    }

    /// Records one task's completion, releasing its admission slot and
    /// placing the result on the completion queue (-4).
    pub fn complete(&self, result: CompletedResult) {
        let _ = self.completed_tx.send(result);
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }

    /// Releases a task's admission slot without producing a result
    /// (push context mismatch, "drop with ERROR"). The task
    /// is never acknowledged to the coordinator, so it is redelivered by
    /// submission-list replay once generation finishes.
    pub fn drop_slot(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }

    /// Non-blocking drain of one completed result ("non-blocking
    /// drain of completion queue").
    pub fn try_drain_one(&self) -> Option<CompletedResult> {
        self.completed_rx.try_recv().ok()
    }

    /// Re-queues a result whose delivery failed (I/O error or missing ACK).
    /// Does not reoccupy an admission slot — the task already finished
    /// executing.
    pub fn requeue(&self, result: CompletedResult) {
        let _ = self.completed_tx.send(result);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_one_admits_one_and_rejects_the_next() {
        let pool = TaskPool::new(1);
        assert!(!pool.full());
        assert!(pool.try_admit(1, 1, vec![]));
        assert!(pool.full());
        assert!(!pool.try_admit(2, 1, vec![]));
    }

    #[test]
    fn completing_a_task_frees_its_slot() {
        let pool = TaskPool::new(1);
        pool.try_admit(1, 1, vec![0xAA]);
        let (taskid, runid, payload) = pool.recv_task().expect("task");
        pool.complete((taskid, runid, 0, payload));
        assert!(!pool.full());
        assert!(pool.try_admit(2, 1, vec![]));
    }

    #[test]
    fn drain_then_requeue_round_trips() {
        let pool = TaskPool::new(2);
        pool.complete((7, 1, 0, vec![0x02]));
        let drained = pool.try_drain_one().expect("result");
        assert_eq!(drained, (7, 1, 0, vec![0x02]));
        assert!(pool.try_drain_one().is_none());
        pool.requeue(drained.clone());
        assert_eq!(pool.try_drain_one(), Some(drained));
    }

    #[test]
    fn never_exceeds_capacity_under_repeated_admission() {
        let pool = TaskPool::new(3);
        for i in 0..3 {
            assert!(pool.try_admit(i, 1, vec![]));
        }
        assert!(!pool.try_admit(99, 1, vec![]));
        assert_eq!(pool.in_flight(), pool.capacity());
    }
}
