//! Eased numeric counter
//!
//! Counts from `from` to `to` over a fixed duration on the ease-out-quartic
//! curve, advanced by the frame scheduler rather than a CSS transition.
//!
//! [`CounterState`] holds the pure math and can be sampled directly;
//! [`EasedCounter`] binds a state to a [`FrameScheduler`] and a [`Clock`]
//! and owns the frame registration, so dropping the counter cancels any
//! pending tick.
//!
//! ```rust
//! use vigil_animation::counter::CounterState;
//!
//! let mut state = CounterState::new(0.0, 543.0, 2000.0);
//! assert!(state.start(0.0));
//! assert_eq!(state.tick(0.0), Some(0.0));
//! assert_eq!(state.tick(1000.0), Some(509.0));
//! assert_eq!(state.tick(2000.0), Some(543.0));
//! assert_eq!(state.tick(2016.0), None);
//! ```
//!
//! [`Clock`]: crate::clock::Clock

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use vigil_core::reveal::{AnimationTarget, RevealController, RevealOptions, RevealSubscription};

use crate::clock::SharedClock;
use crate::easing::ease_out_quart;
use crate::scheduler::{FrameGuard, FrameScheduler, TickControl};

/// Counter lifecycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CounterStatus {
    #[default]
    Idle,
    Running,
    Settled,
}

/// State of a single count-up (or count-down)
#[derive(Clone, Debug, PartialEq)]
pub struct CounterState {
    from: f64,
    to: f64,
    duration_ms: f64,
    current: f64,
    started_at: Option<f64>,
    status: CounterStatus,
}

impl CounterState {
    pub fn new(from: f64, to: f64, duration_ms: f64) -> Self {
        Self {
            from,
            to,
            duration_ms,
            current: from,
            started_at: None,
            status: CounterStatus::Idle,
        }
    }

    /// Begin counting at `now_ms`. Only an idle counter can start.
    pub fn start(&mut self, now_ms: f64) -> bool {
        if self.status != CounterStatus::Idle {
            return false;
        }
        self.started_at = Some(now_ms);
        self.status = CounterStatus::Running;
        self.current = self.value_at_progress(0.0);
        true
    }

    /// Advance to `now_ms`.
    ///
    /// Returns the new value while running, including the settling tick, and
    /// `None` once settled or before start.
    pub fn tick(&mut self, now_ms: f64) -> Option<f64> {
        if self.status != CounterStatus::Running {
            return None;
        }
        let started_at = self.started_at.unwrap_or(now_ms);
        let progress = self.progress_at(now_ms - started_at);

        if progress >= 1.0 {
            self.current = self.to;
            self.status = CounterStatus::Settled;
        } else {
            self.current = self.value_at_progress(progress);
        }
        Some(self.current)
    }

    /// Value `elapsed_ms` after start, without mutating the counter
    pub fn value_at(&self, elapsed_ms: f64) -> f64 {
        let progress = self.progress_at(elapsed_ms);
        if progress >= 1.0 {
            self.to
        } else {
            self.value_at_progress(progress)
        }
    }

    /// Lazily sample the full count at a fixed frame step.
    ///
    /// The sequence starts at the first displayed value (`from` rounded toward
    /// the count direction), ends with exactly `to`, and is finite.
    pub fn frames(&self, step_ms: f64) -> CounterFrames {
        CounterFrames {
            state: self.clone(),
            step_ms,
            elapsed_ms: 0.0,
            finished: false,
        }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn from(&self) -> f64 {
        self.from
    }

    pub fn to(&self) -> f64 {
        self.to
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    pub fn started_at(&self) -> Option<f64> {
        self.started_at
    }

    pub fn status(&self) -> CounterStatus {
        self.status
    }

    pub fn is_settled(&self) -> bool {
        self.status == CounterStatus::Settled
    }

    fn progress_at(&self, elapsed_ms: f64) -> f64 {
        // Zero, negative and non-finite durations settle on the first tick
        if !self.duration_ms.is_finite() || self.duration_ms <= 0.0 {
            return 1.0;
        }
        let progress = elapsed_ms / self.duration_ms;
        if progress.is_nan() {
            return 1.0;
        }
        progress.clamp(0.0, 1.0)
    }

    /// Displayed value before settling: the floor of the eased value, held at
    /// or above `to` when counting down so the count never overshoots.
    fn value_at_progress(&self, progress: f64) -> f64 {
        let eased = ease_out_quart(progress);
        let value = (self.from + (self.to - self.from) * eased).floor();
        if self.to < self.from {
            value.max(self.to)
        } else {
            value
        }
    }
}

/// Iterator over a counter's values at a fixed frame step
#[derive(Clone, Debug)]
pub struct CounterFrames {
    state: CounterState,
    step_ms: f64,
    elapsed_ms: f64,
    finished: bool,
}

impl Iterator for CounterFrames {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.finished {
            return None;
        }
        // A non-positive step can never reach the end; jump straight there
        if self.step_ms.is_nan() || self.step_ms <= 0.0 || self.state.progress_at(self.elapsed_ms) >= 1.0 {
            self.finished = true;
            return Some(self.state.to);
        }
        let value = self.state.value_at(self.elapsed_ms);
        self.elapsed_ms += self.step_ms;
        Some(value)
    }
}

/// Format a counter value for display, e.g. `543` with suffix `"+"` → `"543+"`
pub fn format_count(value: f64, suffix: &str) -> String {
    format!("{}{}", value as i64, suffix)
}

// ============================================================================
// Scheduler-driven counter
// ============================================================================

type ValueListener = Box<dyn FnMut(f64)>;

struct CounterShared {
    state: RefCell<CounterState>,
    frame: RefCell<Option<FrameGuard>>,
    listeners: RefCell<Vec<ValueListener>>,
    scheduler: FrameScheduler,
    clock: SharedClock,
}

impl CounterShared {
    fn notify(&self, value: f64) {
        for listener in self.listeners.borrow_mut().iter_mut() {
            listener(value);
        }
    }
}

/// A counter ticked by the frame scheduler.
///
/// The counter owns its frame registration: dropping it mid-count cancels the
/// pending tick and no further state changes happen.
pub struct EasedCounter {
    shared: Rc<CounterShared>,
}

impl EasedCounter {
    pub fn new(
        scheduler: &FrameScheduler,
        clock: SharedClock,
        from: f64,
        to: f64,
        duration_ms: f64,
    ) -> Self {
        Self {
            shared: Rc::new(CounterShared {
                state: RefCell::new(CounterState::new(from, to, duration_ms)),
                frame: RefCell::new(None),
                listeners: RefCell::new(Vec::new()),
                scheduler: scheduler.clone(),
                clock,
            }),
        }
    }

    /// Observe every value change, including the initial value on start
    pub fn on_change<F>(&self, listener: F)
    where
        F: FnMut(f64) + 'static,
    {
        self.shared.listeners.borrow_mut().push(Box::new(listener));
    }

    /// Start counting now. No-op unless idle.
    pub fn start(&self) -> bool {
        start_shared(&self.shared)
    }

    /// A weak handle that can start the counter from a reveal callback
    pub fn handle(&self) -> CounterHandle {
        CounterHandle {
            shared: Rc::downgrade(&self.shared),
        }
    }

    pub fn value(&self) -> f64 {
        self.shared.state.borrow().current()
    }

    pub fn status(&self) -> CounterStatus {
        self.shared.state.borrow().status()
    }

    pub fn state(&self) -> CounterState {
        self.shared.state.borrow().clone()
    }

    /// Whether a frame callback is currently registered
    pub fn is_ticking(&self) -> bool {
        self.shared
            .frame
            .borrow()
            .as_ref()
            .is_some_and(FrameGuard::is_active)
    }
}

impl std::fmt::Debug for EasedCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EasedCounter")
            .field("state", &*self.shared.state.borrow())
            .finish()
    }
}

/// Weak reference to an [`EasedCounter`]
#[derive(Clone)]
pub struct CounterHandle {
    shared: Weak<CounterShared>,
}

impl CounterHandle {
    /// Start the counter if it is still mounted and idle
    pub fn start(&self) -> bool {
        match self.shared.upgrade() {
            Some(shared) => start_shared(&shared),
            None => false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.shared.strong_count() > 0
    }
}

/// Start `counter` the first time `target` is revealed.
///
/// The subscription holds only a weak handle, so a counter unmounted before
/// its reveal is never started. Keep the returned subscription alive with the
/// counter.
pub fn start_on_reveal(
    controller: &RevealController,
    target: &AnimationTarget,
    options: RevealOptions,
    counter: &EasedCounter,
) -> RevealSubscription {
    let handle = counter.handle();
    controller.subscribe(target, options, move || {
        handle.start();
    })
}

fn start_shared(shared: &Rc<CounterShared>) -> bool {
    let now = shared.clock.now_ms();
    let value = {
        let mut state = shared.state.borrow_mut();
        if !state.start(now) {
            return false;
        }
        state.current()
    };
    tracing::debug!(now, value, "counter started");

    let weak = Rc::downgrade(shared);
    let guard = shared.scheduler.request(move |now_ms| {
        let Some(shared) = weak.upgrade() else {
            return TickControl::Done;
        };
        let ticked = shared.state.borrow_mut().tick(now_ms);
        match ticked {
            Some(value) => {
                shared.notify(value);
                if shared.state.borrow().is_settled() {
                    tracing::debug!(value, "counter settled");
                    TickControl::Done
                } else {
                    TickControl::Continue
                }
            }
            None => TickControl::Done,
        }
    });
    *shared.frame.borrow_mut() = Some(guard);
    shared.notify(value);
    true
}
