//! The "explicit push channel": a thread-local, single-writer,
//! read-once-after-return sink standing in for the native library's
//! call-at-most-once callback contract, instead of a channel or mutex.

use std::cell::RefCell;
use std::ffi::c_void;

use crate::abi::PushCallback;

struct Pushed {
    bytes: Vec<u8>,
    ctx_seen: u64,
}

thread_local! {
    static SINK: RefCell<Option<Pushed>> = const { RefCell::new(None) };
}

/// Encodes a context tag (a task id, or the commit-job magic constant) as
/// the opaque pointer the native ABI expects. No real memory backs this
/// pointer — it is a plain integer carried through a `void*` slot, a
/// common C idiom for "user data" that is never dereferenced by us.
pub fn tag_to_ctx(tag: u64) -> *mut c_void {
    tag as usize as *mut c_void
}

/// The trampoline registered as `push_cb` for every generator/committer
/// push call. Copies the pushed bytes and records the `ctx` the native
/// side echoed back, for the caller to verify against what it passed in.
pub unsafe extern "C" fn trampoline(data: *const u8, size: usize, ctx: *mut c_void) {
    let bytes = if size == 0 || data.is_null() {
        Vec::new()
    } else {
        std::slice::from_raw_parts(data, size).to_vec()
    };
    let ctx_seen = ctx as usize as u64;
    SINK.with(|cell| *cell.borrow_mut() = Some(Pushed { bytes, ctx_seen }));
}

/// Runs `call`, which must invoke the native function taking
/// [`trampoline`] as its push callback, and returns whatever the
/// trampoline captured during that single call.
pub fn with_sink<T>(call: impl FnOnce(PushCallback) -> T) -> (T, Option<(Vec<u8>, u64)>) {
    SINK.with(|cell| *cell.borrow_mut() = None);
    let result = call(trampoline);
    let pushed = SINK.with(|cell| cell.borrow_mut().take()).map(|p| (p.bytes, p.ctx_seen));
    (result, pushed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_bytes_and_ctx_for_a_single_call() {
        let (status, pushed) = with_sink(|cb| {
                let payload = [1u8, 2, 3];
                unsafe { cb(payload.as_ptr(), payload.len(), tag_to_ctx(42)) };
                0i64
            });
        assert_eq!(status, 0);
        let (bytes, ctx) = pushed.expect("pushed");
        assert_eq!(bytes, vec![1, 2, 3]);
        assert_eq!(ctx, 42);
    }

    #[test]
    fn no_push_leaves_sink_empty() {
        let (_, pushed) = with_sink(|_cb| 0i64);
        assert!(pushed.is_none());
    }

    #[test]
    fn empty_payload_is_captured_not_skipped() {
        let (_, pushed) = with_sink(|cb| {
                unsafe { cb(std::ptr::null(), 0, tag_to_ctx(7)) };
            });
        let (bytes, ctx) = pushed.expect("pushed");
        assert!(bytes.is_empty());
        assert_eq!(ctx, 7);
    }
}
