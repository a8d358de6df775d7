//! Coordinator-owned bookkeeping: pending map, submission list, completion
//! map. Each type owns its own lock since the generator
//! and collector loops mutate them from separate tasks ("Shared-resource
//! policy": one mutex per structure is sufficient, contention is low
//! relative to network latency).

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::task::{RunId, TaskId};

/// Commit-state recorded for a completed task (Completion map).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionEntry {
    /// Status returned by the worker that executed the task.
    pub status: i64,
    /// Status returned by `committer_commit_pit` for this task.
    pub commit_status: i64,
}

/// Tasks that have been generated but not yet committed.
///
/// Emptiness combined with the generation-done flag is the job completion
/// condition (invariant).
#[derive(Default)]
pub struct PendingMap {
    inner: Mutex<HashMap<TaskId, Vec<u8>>>,
}

impl PendingMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, taskid: TaskId, payload: Vec<u8>) {
        self.inner.lock().insert(taskid, payload);
    }

    /// Removes a task, returning its payload if it was still pending.
    pub fn remove(&self, taskid: TaskId) -> Option<Vec<u8>> {
        self.inner.lock().remove(&taskid)
    }

    pub fn contains(&self, taskid: TaskId) -> bool {
        self.inner.lock().contains_key(&taskid)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Looks up the payload for a still-pending task, for re-dispatch.
    pub fn payload_of(&self, taskid: TaskId) -> Option<Vec<u8>> {
        self.inner.lock().get(&taskid).cloned()
    }

    /// Drops every taskid already present in `completed`. A redispatched
    /// copy of a task can commit through one worker's session while
    /// another copy is still in flight; this clears the entry so the
    /// in-flight copy's eventual result is caught by the completion-map
    /// duplicate check instead of lingering here.
    pub fn purge_completed(&self, completed: &CompletionMap) {
        self.inner.lock().retain(|taskid, _| !completed.contains(*taskid));
    }
}

/// Ordered replay log of dispatched-but-uncommitted tasks (Submission
/// record, GLOSSARY "Submission list").
///
/// Used by the generator to re-dispatch tasks after generation has
/// completed.
#[derive(Default)]
pub struct SubmissionList {
    inner: Mutex<VecDeque<(TaskId, Vec<u8>)>>,
}

impl SubmissionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, taskid: TaskId, payload: Vec<u8>) {
        self.inner.lock().push_back((taskid, payload));
    }

    /// Drops entries whose `taskid` is no longer in `pending`.
    pub fn gc_against(&self, pending: &PendingMap) {
        self.inner.lock().retain(|(taskid, _)| pending.contains(*taskid));
    }

    /// Pops the oldest entry still present in `pending`, for re-dispatch.
    /// Entries for tasks that committed in the meantime are discarded
    /// along the way rather than returned.
    pub fn pop_oldest_pending(&self, pending: &PendingMap) -> Option<(TaskId, Vec<u8>)> {
        let mut guard = self.inner.lock();
        while let Some((taskid, payload)) = guard.pop_front() {
            if pending.contains(taskid) {
                return Some((taskid, payload));
            }
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }
}

/// Record of every `taskid` the collector has already committed, used to
/// reject duplicate arrivals (invariant).
#[derive(Default)]
pub struct CompletionMap {
    inner: Mutex<HashMap<TaskId, CompletionEntry>>,
}

impl CompletionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, taskid: TaskId) -> bool {
        self.inner.lock().contains_key(&taskid)
    }

    pub fn insert(&self, taskid: TaskId, entry: CompletionEntry) {
        self.inner.lock().insert(taskid, entry);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }
}

/// Discards a task result that carries the wrong `RunId`. Returns `true`
/// if the result should be discarded.
pub fn is_stale_or_future_run(result_runid: RunId, current_runid: RunId) -> bool {
    result_runid != current_runid
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn pending_map_tracks_membership() {
        let map = PendingMap::new();
        assert!(map.is_empty());
        map.insert(1, vec![1, 2, 3]);
        assert!(map.contains(1));
        assert_eq!(map.len(), 1);
        assert_eq!(map.remove(1), Some(vec![1, 2, 3]));
        assert!(map.is_empty());
        assert_eq!(map.remove(1), None);
    }

    #[test]
    fn purge_completed_drops_only_committed_taskids() {
        let pending = PendingMap::new();
        let completed = CompletionMap::new();
        pending.insert(1, vec![0x01]);
        pending.insert(2, vec![0x02]);
        completed.insert(1, CompletionEntry { status: 0, commit_status: 0 });

        pending.purge_completed(&completed);

        assert!(!pending.contains(1));
        assert!(pending.contains(2));
    }

    #[test]
    fn submission_list_gc_drops_committed_entries() {
        let pending = PendingMap::new();
        let submissions = SubmissionList::new();
        pending.insert(1, vec![0x01]);
        pending.insert(2, vec![0x02]);
        submissions.push(1, vec![0x01]);
        submissions.push(2, vec![0x02]);

        pending.remove(1);
        submissions.gc_against(&pending);

        assert_eq!(submissions.len(), 1);
    }

    #[test]
    fn pop_oldest_pending_skips_already_committed() {
        let pending = PendingMap::new();
        let submissions = SubmissionList::new();
        pending.insert(2, vec![0x02]);
        submissions.push(1, vec![0x01]); // already committed, not in pending
        submissions.push(2, vec![0x02]);

        let popped = submissions.pop_oldest_pending(&pending);
        assert_eq!(popped, Some((2, vec![0x02])));
    }

    #[test]
    fn completion_map_rejects_duplicates_by_query() {
        let completed = CompletionMap::new();
        assert!(!completed.contains(5));
        completed.insert(5, CompletionEntry { status: 0, commit_status: 0 });
        assert!(completed.contains(5));
    }

    #[test]
    fn run_id_mismatch_detection() {
        assert!(is_stale_or_future_run(3, 4));
        assert!(is_stale_or_future_run(5, 4));
        assert!(!is_stale_or_future_run(4, 4));
    }

    proptest! {
        /// GC against an arbitrary surviving subset never leaves an entry
        /// whose taskid was removed from `pending`.
        #[test]
        fn gc_against_never_keeps_a_dropped_taskid(
            taskids in prop::collection::hash_set(0u64..64, 0..16),
            kept in prop::collection::hash_set(0u64..64, 0..16),
        ) {
            let pending = PendingMap::new();
            let submissions = SubmissionList::new();
            for &id in &taskids {
                submissions.push(id, vec![id as u8]);
                if kept.contains(&id) {
                    pending.insert(id, vec![id as u8]);
                }
            }

            submissions.gc_against(&pending);

            while let Some((id, _)) = submissions.pop_oldest_pending(&pending) {
                prop_assert!(kept.contains(&id));
            }
        }

        /// `pop_oldest_pending` always returns entries in the order they
        /// were pushed, skipping any whose taskid already committed.
        #[test]
        fn pop_oldest_pending_preserves_fifo_order(
            ids in prop::collection::vec(0u64..64, 1..16),
        ) {
            let pending = PendingMap::new();
            let submissions = SubmissionList::new();
            let mut expected = Vec::new();
            for &id in &ids {
                if !pending.contains(id) {
                    pending.insert(id, vec![]);
                    expected.push(id);
                }
                submissions.push(id, vec![]);
            }

            let mut popped = Vec::new();
            while let Some((id, _)) = submissions.pop_oldest_pending(&pending) {
                pending.remove(id);
                popped.push(id);
            }

            prop_assert_eq!(popped, expected);
        }

        /// A completion entry is visible immediately after insertion and
        /// for an arbitrary taskid never inserted, `contains` is false
        /// (duplicate suppression).
        #[test]
        fn completion_map_contains_matches_inserted_set(
            inserted in prop::collection::hash_set(0u64..128, 0..32),
            probe in 0u64..128,
        ) {
            let completed = CompletionMap::new();
            for &id in &inserted {
                completed.insert(id, CompletionEntry { status: 0, commit_status: 0 });
            }
            prop_assert_eq!(completed.contains(probe), inserted.contains(&probe));
            prop_assert_eq!(completed.len(), inserted.len());
        }
    }
}
