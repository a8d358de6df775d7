//! Bridges [`spits_core::metrics::MetricsStore`] across the FFI boundary
//! as a vtable of scalar setters ("Metrics handle
//! lifecycle"). Created once per process before any role handle, and
//! outliving every handle it is passed to.

use std::ffi::{c_char, c_void, CStr};
use std::sync::Arc;

use spits_core::metrics::{MetricValue, MetricsStore};

/// C-ABI vtable passed as the `metrics` parameter to every `*_new` call
///. `ctx` carries the boxed [`Arc<MetricsStore>`] the setters
/// dereference; the native library must treat it as opaque.
#[repr(C)]
pub struct MetricsVTable {
    pub ctx: *mut c_void,
    pub set_int: unsafe extern "C" fn(*mut c_void, *const c_char, i64),
    pub set_float: unsafe extern "C" fn(*mut c_void, *const c_char, f32),
    pub set_double: unsafe extern "C" fn(*mut c_void, *const c_char, f64),
    pub set_string: unsafe extern "C" fn(*mut c_void, *const c_char, *const c_char),
    pub set_bytes: unsafe extern "C" fn(*mut c_void, *const c_char, *const u8, usize),
}

/// Owns the boxed `Arc<MetricsStore>` the vtable's `ctx` points at. Keep
/// this alive for exactly as long as any handle holding the vtable.
pub struct MetricsBridge {
    _store_box: Box<Arc<MetricsStore>>,
    pub vtable: MetricsVTable,
}

unsafe fn name_from_raw(name: *const c_char) -> Option<String> {
    if name.is_null() {
        return None;
    }
    CStr::from_ptr(name).to_str().ok().map(str::to_owned)
}

unsafe extern "C" fn set_int(ctx: *mut c_void, name: *const c_char, value: i64) {
    let Some(name) = name_from_raw(name) else { return };
    let store = &*(ctx as *const Arc<MetricsStore>);
    store.set(&name, MetricValue::Int(value));
}

unsafe extern "C" fn set_float(ctx: *mut c_void, name: *const c_char, value: f32) {
    let Some(name) = name_from_raw(name) else { return };
    let store = &*(ctx as *const Arc<MetricsStore>);
    store.set(&name, MetricValue::Float(value));
}

unsafe extern "C" fn set_double(ctx: *mut c_void, name: *const c_char, value: f64) {
    let Some(name) = name_from_raw(name) else { return };
    let store = &*(ctx as *const Arc<MetricsStore>);
    store.set(&name, MetricValue::Double(value));
}

unsafe extern "C" fn set_string(ctx: *mut c_void, name: *const c_char, value: *const c_char) {
    let Some(name) = name_from_raw(name) else { return };
    let Some(value) = name_from_raw(value) else { return };
    let store = &*(ctx as *const Arc<MetricsStore>);
    store.set(&name, MetricValue::Text(value));
}

unsafe extern "C" fn set_bytes(ctx: *mut c_void, name: *const c_char, data: *const u8, len: usize) {
    let Some(name) = name_from_raw(name) else { return };
    if data.is_null() {
        return;
    }
    let bytes = std::slice::from_raw_parts(data, len).to_vec();
    let store = &*(ctx as *const Arc<MetricsStore>);
    store.set(&name, MetricValue::Bytes(bytes));
}

impl MetricsBridge {
    pub fn new(store: Arc<MetricsStore>) -> Self {
        let mut store_box = Box::new(store);
        let ctx = store_box.as_mut() as *mut Arc<MetricsStore> as *mut c_void;
        let vtable = MetricsVTable { ctx, set_int, set_float, set_double, set_string, set_bytes };
        Self { _store_box: store_box, vtable }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn setters_reach_the_backing_store() {
        let store = Arc::new(MetricsStore::new(8));
        let bridge = MetricsBridge::new(Arc::clone(&store));
        let name = CString::new("tasks_committed").expect("cstring");
        unsafe {
            (bridge.vtable.set_int)(bridge.vtable.ctx, name.as_ptr(), 42);
        }
        assert_eq!(store.last("tasks_committed"), Some(MetricValue::Int(42)));
    }
}
