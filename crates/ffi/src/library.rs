//! Loads a native job library and exposes its five entry-point groups as
//! safe Rust wrappers.

use std::ffi::{c_void, CStr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use libloading::Library;
use tracing::debug;

use crate::abi::{self, COMMIT_JOB_MAGIC_CTX};
use crate::error::FfiError;
use crate::metrics_bridge::MetricsVTable;
use crate::push_sink;

/// A loaded native job library. Every symbol is optional: the
/// same binary may be deployed as both coordinator and worker, each
/// using only the symbols relevant to its role.
pub struct JobLibrary {
    // Kept alive for the lifetime of every function pointer below.
    _lib: Library,
    main: Option<abi::MainFn>,
    job_manager_new: Option<abi::JobManagerNewFn>,
    job_manager_next_task: Option<abi::JobManagerNextTaskFn>,
    job_manager_finalize: Option<abi::JobManagerFinalizeFn>,
    worker_new: Option<abi::WorkerNewFn>,
    worker_run: Option<abi::WorkerRunFn>,
    worker_finalize: Option<abi::WorkerFinalizeFn>,
    committer_new: Option<abi::CommitterNewFn>,
    committer_commit_pit: Option<abi::CommitterCommitPitFn>,
    committer_commit_job: Option<abi::CommitterCommitJobFn>,
    committer_finalize: Option<abi::CommitterFinalizeFn>,
}

macro_rules! optional_symbol {
    ($lib:expr, $ty:ty, $name:literal) => {{
            // SAFETY: `$ty` is an `unsafe extern "C" fn` pointer type matching
            // the ABI documented in `abi.rs`; a missing symbol is the expected,
            // handled case , not an error.
            unsafe { $lib.get::<$ty>(concat!($name, "\0").as_bytes()) }
            .ok()
            .map(|sym| *sym)
        }};
}

impl JobLibrary {
    pub fn load(path: &std::path::Path) -> Result<Self, FfiError> {
        // SAFETY: loading an arbitrary shared library is inherently
        // unsafe; the caller is trusted to point at a SPITS job binary
        // (out of scope: the library's own correctness).
        let lib = unsafe { Library::new(path) }
        .map_err(|source| FfiError::Load { path: path.display().to_string(), source })?;

        let main = optional_symbol!(lib, abi::MainFn, "main");
        let job_manager_new = optional_symbol!(lib, abi::JobManagerNewFn, "job_manager_new");
        let job_manager_next_task =
        optional_symbol!(lib, abi::JobManagerNextTaskFn, "job_manager_next_task");
        let job_manager_finalize =
        optional_symbol!(lib, abi::JobManagerFinalizeFn, "job_manager_finalize");
        let worker_new = optional_symbol!(lib, abi::WorkerNewFn, "worker_new");
        let worker_run = optional_symbol!(lib, abi::WorkerRunFn, "worker_run");
        let worker_finalize = optional_symbol!(lib, abi::WorkerFinalizeFn, "worker_finalize");
        let committer_new = optional_symbol!(lib, abi::CommitterNewFn, "committer_new");
        let committer_commit_pit =
        optional_symbol!(lib, abi::CommitterCommitPitFn, "committer_commit_pit");
        let committer_commit_job =
        optional_symbol!(lib, abi::CommitterCommitJobFn, "committer_commit_job");
        let committer_finalize =
        optional_symbol!(lib, abi::CommitterFinalizeFn, "committer_finalize");

        debug!(
            path = %path.display(),
            has_main = main.is_some(),
            has_job_manager = job_manager_new.is_some(),
            has_worker = worker_new.is_some(),
            has_committer = committer_new.is_some(),
            "loaded job library"
        );

        Ok(Self {
                _lib: lib,
                main,
                job_manager_new,
                job_manager_next_task,
                job_manager_finalize,
                worker_new,
                worker_run,
                worker_finalize,
                committer_new,
                committer_commit_pit,
                committer_commit_job,
                committer_finalize,
            })
    }

    /// Runs the job-wide `main` entry point, if present.
    /// `runner` receives `argv` and must return `(status, jobinfo_bytes)`;
    /// the returned bytes become the job info passed to every later
    /// `*_new` call. Returns `None` when the library has no `main`.
    pub fn run_main(
        &self,
        argv: &CStr,
        mut runner: impl FnMut(&CStr) -> (i64, Vec<u8>),
    ) -> Result<Option<(i64, Vec<u8>)>, FfiError> {
        let Some(main_fn) = self.main else { return Ok(None) };

        struct RunnerCtx<'a> {
            runner: &'a mut dyn FnMut(&CStr) -> (i64, Vec<u8>),
            jobinfo: Option<Vec<u8>>,
            status: i64,
        }

        unsafe extern "C" fn trampoline(
            argv: *const std::os::raw::c_char,
            push_cb: abi::PushCallback,
            ctx: *mut c_void,
        ) -> i64 {
            let runner_ctx = &mut *(ctx as *mut RunnerCtx);
            let argv = CStr::from_ptr(argv);
            let (status, jobinfo) = (runner_ctx.runner)(argv);
            runner_ctx.status = status;
            push_cb(jobinfo.as_ptr(), jobinfo.len(), std::ptr::null_mut());
            runner_ctx.jobinfo = Some(jobinfo);
            status
        }

        let mut runner_ctx = RunnerCtx { runner: &mut runner, jobinfo: None, status: 0 };
        let ctx_ptr = &mut runner_ctx as *mut RunnerCtx as *mut c_void;

        // SAFETY: `trampoline` matches `RunnerCallback`'s signature and
        // `ctx_ptr` outlives the call (it is a local on this stack frame).
        let status = unsafe { main_fn(argv.as_ptr(), trampoline, ctx_ptr) };
        Ok(Some((status, runner_ctx.jobinfo.unwrap_or_default())))
    }
}

/// Outcome of one `job_manager_next_task` call.
pub struct NextTaskOutcome {
    pub payload: Option<Vec<u8>>,
    pub has_more: bool,
}

/// Handle returned by `job_manager_new`, driving the generator loop.
pub struct JobManagerHandle {
    lib: Arc<JobLibrary>,
    handle: *mut c_void,
    call_counter: AtomicU64,
}

// SAFETY: at most one thread at a time invokes an operation on a given
// handle; the coordinator's generator loop owns this handle exclusively
// for the lifetime of the run.
unsafe impl Send for JobManagerHandle {}

impl JobManagerHandle {
    pub fn new(
        lib: Arc<JobLibrary>,
        argv: &CStr,
        jobinfo: &[u8],
        metrics: &MetricsVTable,
    ) -> Result<Self, FfiError> {
        let new_fn = lib.job_manager_new.ok_or(FfiError::MissingSymbol("job_manager_new"))?;
        // SAFETY: `metrics` outlives every call made through this handle
        // (caller keeps the `MetricsBridge` alive for the process lifetime,
        //); `jobinfo` is only borrowed for the duration of this call.
        let handle =
        unsafe { new_fn(argv.as_ptr(), jobinfo.as_ptr(), jobinfo.len(), metrics) };
        Ok(Self { lib, handle, call_counter: AtomicU64::new(1) })
    }

    pub fn next_task(&self) -> Result<NextTaskOutcome, FfiError> {
        let next_fn = self
        .lib
        .job_manager_next_task
        .ok_or(FfiError::MissingSymbol("job_manager_next_task"))?;
        let tag = self.call_counter.fetch_add(1, Ordering::Relaxed);
        let handle = self.handle;
        // SAFETY: `push_sink::trampoline` matches `PushCallback`'s ABI.
        let (has_more, pushed) =
        push_sink::with_sink(|cb| unsafe { next_fn(handle, cb, push_sink::tag_to_ctx(tag)) });
        let payload = match pushed {
            Some((bytes, ctx_seen)) if ctx_seen == tag => Some(bytes),
            Some((_, ctx_seen)) => {
                return Err(FfiError::ContextMismatch { expected: tag, got: ctx_seen })
            }
            None => None,
        };
        Ok(NextTaskOutcome { payload, has_more: has_more != 0 })
    }
}

impl Drop for JobManagerHandle {
    fn drop(&mut self) {
        if let Some(finalize) = self.lib.job_manager_finalize {
            // SAFETY: `self.handle` was produced by `job_manager_new` and
            // is not used again after this call.
            unsafe { finalize(self.handle) }
        }
    }
}

/// Handle returned by `worker_new`, owned by one worker-pool routine for
/// the process lifetime.
pub struct WorkerHandle {
    lib: Arc<JobLibrary>,
    handle: *mut c_void,
}

// SAFETY: each worker-pool routine owns exactly one `WorkerHandle` and
// never shares it with another thread .
unsafe impl Send for WorkerHandle {}

impl WorkerHandle {
    pub fn new(lib: Arc<JobLibrary>, argv: &CStr, metrics: &MetricsVTable) -> Result<Self, FfiError> {
        let new_fn = lib.worker_new.ok_or(FfiError::MissingSymbol("worker_new"))?;
        // SAFETY: see `JobManagerHandle::new`.
        let handle = unsafe { new_fn(argv.as_ptr(), metrics) };
        Ok(Self { lib, handle })
    }

    /// Executes one task, verifying the push callback's context equals
    /// `taskid` ("verify ctx == taskid, else drop with
    /// ERROR").
    pub fn run(&self, taskid: u64, payload: &[u8]) -> Result<(i64, Vec<u8>), FfiError> {
        let run_fn = self.lib.worker_run.ok_or(FfiError::MissingSymbol("worker_run"))?;
        let handle = self.handle;
        let (status, pushed) = push_sink::with_sink(|cb| unsafe {
                run_fn(handle, payload.as_ptr(), payload.len(), cb, push_sink::tag_to_ctx(taskid))
            });
        match pushed {
            Some((bytes, ctx_seen)) if ctx_seen == taskid => Ok((status, bytes)),
            Some((_, ctx_seen)) => {
                Err(FfiError::ContextMismatch { expected: taskid, got: ctx_seen })
            }
            None => Ok((status, Vec::new())),
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if let Some(finalize) = self.lib.worker_finalize {
            // SAFETY: see `JobManagerHandle::drop`.
            unsafe { finalize(self.handle) }
        }
    }
}

/// Handle returned by `committer_new`, driving the collector's commit
/// path and the final job-wide commit.
pub struct CommitterHandle {
    lib: Arc<JobLibrary>,
    handle: *mut c_void,
}

// SAFETY: at most one thread at a time invokes `committer_commit_pit`
// or `committer_commit_job` on a given handle; the collector loop owns it
// exclusively. The coordinator shares the handle across an `Arc` so the
// collector task can be moved onto the async runtime, but that sharing
// is never concurrent access: the same single-owner-thread invariant
// that justifies `Send` justifies `Sync` here too.
unsafe impl Send for CommitterHandle {}
unsafe impl Sync for CommitterHandle {}

impl CommitterHandle {
    pub fn new(
        lib: Arc<JobLibrary>,
        argv: &CStr,
        jobinfo: &[u8],
        metrics: &MetricsVTable,
    ) -> Result<Self, FfiError> {
        let new_fn = lib.committer_new.ok_or(FfiError::MissingSymbol("committer_new"))?;
        // SAFETY: see `JobManagerHandle::new`.
        let handle =
        unsafe { new_fn(argv.as_ptr(), jobinfo.as_ptr(), jobinfo.len(), metrics) };
        Ok(Self { lib, handle })
    }

    pub fn commit_pit(&self, result: &[u8]) -> Result<i64, FfiError> {
        let commit_fn =
        self.lib.committer_commit_pit.ok_or(FfiError::MissingSymbol("committer_commit_pit"))?;
        // SAFETY: `result` is only borrowed for the duration of this call.
        Ok(unsafe { commit_fn(self.handle, result.as_ptr(), result.len()) })
    }

    /// Final job-wide commit: pushes with the magic context
    /// `0x12345678` and verifies it round-trips unchanged.
    pub fn commit_job(&self) -> Result<(i64, Vec<u8>), FfiError> {
        let commit_fn =
        self.lib.committer_commit_job.ok_or(FfiError::MissingSymbol("committer_commit_job"))?;
        let handle = self.handle;
        let (status, pushed) = push_sink::with_sink(|cb| unsafe {
                commit_fn(handle, cb, push_sink::tag_to_ctx(COMMIT_JOB_MAGIC_CTX))
            });
        match pushed {
            Some((bytes, ctx_seen)) if ctx_seen == COMMIT_JOB_MAGIC_CTX => Ok((status, bytes)),
            Some((_, ctx_seen)) => {
                Err(FfiError::ContextMismatch { expected: COMMIT_JOB_MAGIC_CTX, got: ctx_seen })
            }
            None => Ok((status, Vec::new())),
        }
    }
}

impl Drop for CommitterHandle {
    fn drop(&mut self) {
        if let Some(finalize) = self.lib.committer_finalize {
            // SAFETY: see `JobManagerHandle::drop`.
            unsafe { finalize(self.handle) }
        }
    }
}
