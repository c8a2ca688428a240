//! Frame scheduler
//!
//! Single-threaded registry of per-frame callbacks, ticked once per rendered
//! frame. Registration returns a [`FrameGuard`]; dropping the guard cancels the
//! callback, so a subtree that owns its guards can never leave a dangling
//! frame callback behind when it unmounts.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

new_key_type! {
    pub struct FrameCallbackId;
}

/// Whether a frame callback wants to run again next frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Done,
}

type TickFn = Rc<RefCell<dyn FnMut(f64) -> TickControl>>;

struct SchedulerState {
    callbacks: SlotMap<FrameCallbackId, TickFn>,
    frame_count: u64,
    last_tick_ms: Option<f64>,
}

/// The scheduler that ticks all registered frame callbacks.
///
/// Cloning is cheap; clones share the same registry.
#[derive(Clone)]
pub struct FrameScheduler {
    inner: Rc<RefCell<SchedulerState>>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SchedulerState {
                callbacks: SlotMap::with_key(),
                frame_count: 0,
                last_tick_ms: None,
            })),
        }
    }

    /// Register a callback to run on every frame until it returns
    /// [`TickControl::Done`] or the returned guard is dropped.
    #[must_use = "dropping the guard cancels the callback"]
    pub fn request<F>(&self, callback: F) -> FrameGuard
    where
        F: FnMut(f64) -> TickControl + 'static,
    {
        let callback: TickFn = Rc::new(RefCell::new(callback));
        let id = self.inner.borrow_mut().callbacks.insert(callback);
        tracing::trace!(?id, "frame callback registered");
        FrameGuard {
            id,
            scheduler: Rc::downgrade(&self.inner),
        }
    }

    /// Cancel a callback. Returns `true` if it was still registered.
    pub fn cancel(&self, id: FrameCallbackId) -> bool {
        self.inner.borrow_mut().callbacks.remove(id).is_some()
    }

    /// Run every registered callback once.
    ///
    /// Callbacks may register or cancel other callbacks; one cancelled earlier
    /// in the same frame is skipped. Callbacks registered during the frame
    /// first run on the next one. Returns the number of callbacks run.
    pub fn tick(&self, now_ms: f64) -> usize {
        let pending: SmallVec<[(FrameCallbackId, TickFn); 8]> = {
            let mut state = self.inner.borrow_mut();
            state.frame_count += 1;
            state.last_tick_ms = Some(now_ms);
            state
                .callbacks
                .iter()
                .map(|(id, cb)| (id, Rc::clone(cb)))
                .collect()
        };

        let mut ran = 0;
        for (id, callback) in pending {
            if !self.inner.borrow().callbacks.contains_key(id) {
                continue;
            }
            let control = {
                let mut run = callback.borrow_mut();
                (&mut *run)(now_ms)
            };
            ran += 1;
            if control == TickControl::Done {
                self.inner.borrow_mut().callbacks.remove(id);
                tracing::trace!(?id, "frame callback finished");
            }
        }
        ran
    }

    /// Check if any callbacks are still registered
    pub fn has_pending(&self) -> bool {
        !self.inner.borrow().callbacks.is_empty()
    }

    /// Get the number of registered callbacks
    pub fn pending_count(&self) -> usize {
        self.inner.borrow().callbacks.len()
    }

    /// Number of frames ticked so far
    pub fn frame_count(&self) -> u64 {
        self.inner.borrow().frame_count
    }

    /// Timestamp passed to the most recent tick
    pub fn last_tick_ms(&self) -> Option<f64> {
        self.inner.borrow().last_tick_ms
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped registration of a frame callback; cancels it on drop.
pub struct FrameGuard {
    id: FrameCallbackId,
    scheduler: Weak<RefCell<SchedulerState>>,
}

impl FrameGuard {
    pub fn id(&self) -> FrameCallbackId {
        self.id
    }

    /// Whether the callback is still registered
    pub fn is_active(&self) -> bool {
        self.scheduler
            .upgrade()
            .is_some_and(|s| s.borrow().callbacks.contains_key(self.id))
    }
}

impl std::fmt::Debug for FrameGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameGuard").field("id", &self.id).finish()
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        if let Some(scheduler) = self.scheduler.upgrade() {
            if let Ok(mut state) = scheduler.try_borrow_mut() {
                if state.callbacks.remove(self.id).is_some() {
                    tracing::trace!(id = ?self.id, "frame callback cancelled");
                }
            }
        }
    }
}
