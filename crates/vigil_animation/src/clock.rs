//! Time sources
//!
//! Animations read time through [`Clock`] so the same code runs against the
//! wall clock in an app and against a [`ManualClock`] in tests and headless
//! scenarios.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Shared clock handle
pub type SharedClock = Rc<dyn Clock>;

/// A monotonic millisecond time source
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Wall clock measured from its creation
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Deterministic clock advanced by hand.
///
/// Time never goes backwards: `set` to an earlier value is ignored.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Rc<ManualClock> {
        Rc::new(Self::new())
    }

    /// Advance by `ms` milliseconds (negative values are ignored)
    pub fn advance(&self, ms: f64) {
        if ms > 0.0 {
            self.now.set(self.now.get() + ms);
        }
    }

    /// Jump to an absolute time
    pub fn set(&self, ms: f64) {
        if ms > self.now.get() {
            self.now.set(ms);
        }
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}
