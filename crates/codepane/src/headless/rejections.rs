//! Unhandled promise rejections, observed through the QuickJS host tracker.
//!
//! QuickJS reports a rejection when it happens with no handler attached, and
//! again when a handler is attached later. Whatever is still unhandled after
//! the job queue drains is what a browser would announce with an
//! `unhandledrejection` event.

use std::cell::RefCell;
use std::ffi::{c_int, c_void};

use rquickjs::{qjs, Context, Ctx, Value};

struct Pending {
    promise: qjs::JSValue,
    reason: qjs::JSValue,
}

/// Owns one reference to every promise and reason it holds.
pub(super) struct RejectionTracker {
    runtime: *mut qjs::JSRuntime,
    pending: RefCell<Vec<Pending>>,
}

impl RejectionTracker {
    /// Register on the runtime behind `context`. The tracker must be
    /// [released](RejectionTracker::release) before that runtime is freed.
    pub(super) fn install(context: &Context) -> Box<Self> {
        // SAFETY: `context` is live, so its runtime is too.
        let runtime = unsafe { qjs::JS_GetRuntime(context.as_raw().as_ptr()) };
        let tracker = Box::new(Self {
            runtime,
            pending: RefCell::new(Vec::new()),
        });
        let opaque = &*tracker as *const Self as *mut c_void;
        // SAFETY: the box never moves and is unregistered in `release`.
        unsafe { qjs::JS_SetHostPromiseRejectionTracker(runtime, Some(track), opaque) };
        tracker
    }

    /// Rejections still unhandled, oldest first, as `(promise, reason)`.
    pub(super) fn take<'js>(&self, ctx: &Ctx<'js>) -> Vec<(Value<'js>, Value<'js>)> {
        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        pending
            .into_iter()
            .map(|Pending { promise, reason }| {
                // SAFETY: both references were duplicated by `track` and are
                // handed over exactly once.
                unsafe { (Value::from_raw(ctx.clone(), promise), Value::from_raw(ctx.clone(), reason)) }
            })
            .collect()
    }

    /// Unregister and drop every held reference.
    pub(super) fn release(&self) {
        // SAFETY: called while the runtime is still alive.
        unsafe {
            qjs::JS_SetHostPromiseRejectionTracker(self.runtime, None, std::ptr::null_mut());
            for Pending { promise, reason } in self.pending.borrow_mut().drain(..) {
                qjs::JS_FreeValueRT(self.runtime, promise);
                qjs::JS_FreeValueRT(self.runtime, reason);
            }
        }
    }
}

unsafe extern "C" fn track(
    _ctx: *mut qjs::JSContext,
    promise: qjs::JSValue,
    reason: qjs::JSValue,
    is_handled: c_int,
    opaque: *mut c_void,
) {
    // SAFETY: `opaque` is the tracker registered in `install`.
    let tracker = unsafe { &*(opaque as *const RejectionTracker) };
    let Ok(mut pending) = tracker.pending.try_borrow_mut() else {
        return;
    };
    // SAFETY: QuickJS passes live values; references taken here are owned by
    // the tracker until `take` or `release`.
    unsafe {
        if is_handled == 0 {
            pending.push(Pending {
                promise: qjs::JS_DupValue(promise),
                reason: qjs::JS_DupValue(reason),
            });
            return;
        }
        let handled = qjs::JS_VALUE_GET_PTR(promise);
        if let Some(index) = pending
            .iter()
            .position(|entry| qjs::JS_VALUE_GET_PTR(entry.promise) == handled)
        {
            let entry = pending.remove(index);
            qjs::JS_FreeValueRT(tracker.runtime, entry.promise);
            qjs::JS_FreeValueRT(tracker.runtime, entry.reason);
        }
    }
}
