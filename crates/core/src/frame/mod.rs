//! Per-frame scheduling primitives.
//!
//! The host only offers a one-shot registration (`register_once`) that fires on
//! the next display refresh. Anything that wants to run every frame builds a
//! [`FrameLoop`], which re-arms itself from inside each callback and can be
//! cancelled between or during frames.

use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    fmt,
    rc::Rc,
};

use serde::Serialize;

/// Callback invoked once with the frame timestamp in milliseconds.
pub type FrameCallback = Box<dyn FnOnce(f64)>;

/// Registration token returned by [`FrameScheduler::register_once`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FrameHandle(u64);

impl FrameHandle {
    /// Wraps a host-assigned registration id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FrameHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

/// Host capability that invokes a callback on the next display refresh.
pub trait FrameScheduler {
    /// Registers `callback` to run once on the next frame.
    fn register_once(&self, callback: FrameCallback) -> FrameHandle;

    /// Releases a registration. Unknown or already-fired handles are ignored.
    fn cancel(&self, handle: FrameHandle);

    /// Returns `true` while `handle` is still waiting to fire.
    fn is_pending(&self, handle: FrameHandle) -> bool;
}

/// Deterministic scheduler where the caller decides when a frame happens.
///
/// Registrations made while a frame is running are deferred to the next call
/// of [`ManualFrameScheduler::run_frame`], mirroring how browsers treat
/// `requestAnimationFrame` calls made from inside a frame callback.
#[derive(Default)]
pub struct ManualFrameScheduler {
    pending: RefCell<BTreeMap<FrameHandle, FrameCallback>>,
    next_id: Cell<u64>,
    frames_run: Cell<u64>,
}

impl ManualFrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires every registration pending at the start of the call and returns
    /// how many callbacks ran.
    pub fn run_frame(&self, timestamp_ms: f64) -> usize {
        let due: Vec<FrameHandle> = self.pending.borrow().keys().copied().collect();
        let mut fired = 0;

        for handle in due {
            // Cancelled by an earlier callback in this same frame.
            let Some(callback) = self.pending.borrow_mut().remove(&handle) else {
                continue;
            };
            callback(timestamp_ms);
            fired += 1;
        }

        self.frames_run.set(self.frames_run.get() + 1);
        tracing::trace!(timestamp_ms, fired, "frame dispatched");
        fired
    }

    /// Runs `count` frames spaced `step_ms` apart, starting at `start_ms`.
    /// Returns the timestamp of the last frame.
    pub fn run_frames(&self, start_ms: f64, step_ms: f64, count: usize) -> f64 {
        let mut now = start_ms;
        for index in 0..count {
            now = start_ms + step_ms * index as f64;
            self.run_frame(now);
        }
        now
    }

    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn pending_handles(&self) -> Vec<FrameHandle> {
        self.pending.borrow().keys().copied().collect()
    }

    pub fn frames_run(&self) -> u64 {
        self.frames_run.get()
    }
}

impl FrameScheduler for ManualFrameScheduler {
    fn register_once(&self, callback: FrameCallback) -> FrameHandle {
        let handle = FrameHandle::new(self.next_id.get());
        self.next_id.set(handle.id() + 1);
        self.pending.borrow_mut().insert(handle, callback);
        handle
    }

    fn cancel(&self, handle: FrameHandle) {
        self.pending.borrow_mut().remove(&handle);
    }

    fn is_pending(&self, handle: FrameHandle) -> bool {
        self.pending.borrow().contains_key(&handle)
    }
}

impl fmt::Debug for ManualFrameScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualFrameScheduler")
            .field("pending", &self.pending_handles())
            .field("frames_run", &self.frames_run.get())
            .finish()
    }
}

#[derive(Debug, Default)]
struct LoopSlot {
    handle: Cell<Option<FrameHandle>>,
    cancelled: Cell<bool>,
}

type SharedStep = Rc<RefCell<dyn FnMut(f64)>>;

/// Self-chaining per-frame recurrence.
///
/// Each callback runs the step and then registers the next callback. Cancelling
/// releases the outstanding registration and also stops a callback that is
/// currently running from re-arming. Dropping the loop cancels it.
pub struct FrameLoop {
    scheduler: Rc<dyn FrameScheduler>,
    slot: Rc<LoopSlot>,
}

impl FrameLoop {
    pub fn start<F>(scheduler: Rc<dyn FrameScheduler>, step: F) -> Self
    where
        F: FnMut(f64) + 'static,
    {
        let slot = Rc::new(LoopSlot::default());
        let step: SharedStep = Rc::new(RefCell::new(step));
        arm(scheduler.clone(), slot.clone(), step);
        Self { scheduler, slot }
    }

    /// Registration that will fire next, if the loop is still armed.
    pub fn handle(&self) -> Option<FrameHandle> {
        self.slot.handle.get()
    }

    pub fn is_active(&self) -> bool {
        !self.slot.cancelled.get()
    }

    pub fn cancel(&self) {
        if self.slot.cancelled.replace(true) {
            return;
        }
        if let Some(handle) = self.slot.handle.take() {
            self.scheduler.cancel(handle);
            tracing::trace!(%handle, "frame loop cancelled");
        }
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for FrameLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameLoop")
            .field("handle", &self.slot.handle.get())
            .field("active", &self.is_active())
            .finish()
    }
}

fn arm(scheduler: Rc<dyn FrameScheduler>, slot: Rc<LoopSlot>, step: SharedStep) {
    let next_scheduler = scheduler.clone();
    let next_slot = slot.clone();
    let handle = scheduler.register_once(Box::new(move |timestamp_ms| {
        next_slot.handle.set(None);
        if next_slot.cancelled.get() {
            return;
        }
        {
            let mut step = step.borrow_mut();
            (&mut *step)(timestamp_ms);
        }
        // The step itself may have cancelled the loop.
        if next_slot.cancelled.get() {
            return;
        }
        arm(next_scheduler, next_slot, step);
    }));
    slot.handle.set(Some(handle));
}
