//! Raw C-ABI function signatures exported by a native job library.
//! All five symbol groups are optional: the runtime detects missing
//! symbols at load time and never fails merely because one role's symbol
//! is absent, since the same binary is shared across coordinator and
//! worker deployments.

use std::ffi::{c_char, c_void};

use crate::metrics_bridge::MetricsVTable;

/// Invoked by the native library zero or one time per generator/committer
/// push call. `ctx` is opaque to the native side: it must be
/// forwarded unchanged to identify which outstanding call this push
/// answers ("Context-verification rule").
pub type PushCallback = unsafe extern "C" fn(data: *const u8, size: usize, ctx: *mut c_void);

/// `runner_callback(argv, jobinfo) -> (status, jobinfo_bytes)` (item
/// 1). The runner writes its job-info bytes through `push_cb` before
/// returning its status.
pub type RunnerCallback = unsafe extern "C" fn(
    argv: *const c_char,
    push_cb: PushCallback,
    ctx: *mut c_void,
) -> i64;

pub type MainFn = unsafe extern "C" fn(
    argv: *const c_char,
    runner: RunnerCallback,
    runner_ctx: *mut c_void,
) -> i64;

pub type JobManagerNewFn = unsafe extern "C" fn(
    argv: *const c_char,
    jobinfo: *const u8,
    jobinfo_len: usize,
    metrics: *const MetricsVTable,
) -> *mut c_void;

pub type JobManagerNextTaskFn =
unsafe extern "C" fn(handle: *mut c_void, push_cb: PushCallback, ctx: *mut c_void) -> i32;

pub type JobManagerFinalizeFn = unsafe extern "C" fn(handle: *mut c_void);

pub type WorkerNewFn =
unsafe extern "C" fn(argv: *const c_char, metrics: *const MetricsVTable) -> *mut c_void;

pub type WorkerRunFn = unsafe extern "C" fn(
    handle: *mut c_void,
    task: *const u8,
    task_len: usize,
    push_cb: PushCallback,
    ctx: *mut c_void,
) -> i64;

pub type WorkerFinalizeFn = unsafe extern "C" fn(handle: *mut c_void);

pub type CommitterNewFn = unsafe extern "C" fn(
    argv: *const c_char,
    jobinfo: *const u8,
    jobinfo_len: usize,
    metrics: *const MetricsVTable,
) -> *mut c_void;

pub type CommitterCommitPitFn =
unsafe extern "C" fn(handle: *mut c_void, result: *const u8, result_len: usize) -> i64;

pub type CommitterCommitJobFn =
unsafe extern "C" fn(handle: *mut c_void, push_cb: PushCallback, ctx: *mut c_void) -> i64;

pub type CommitterFinalizeFn = unsafe extern "C" fn(handle: *mut c_void);

/// Magic context value for the final `committer_commit_job` push.
pub const COMMIT_JOB_MAGIC_CTX: u64 = 0x1234_5678;
