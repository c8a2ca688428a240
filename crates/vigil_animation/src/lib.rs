//! Vigil Animation System
//!
//! Frame-driven motion for the Vigil site engine.
//!
//! # Features
//!
//! - **Easing**: Standard curves plus cubic bezier, including ease-out-quartic
//! - **Frame Scheduling**: Guarded per-frame callbacks that cancel on drop
//! - **Eased Counters**: Count-ups that settle on an exact integer target
//! - **Presence**: Enter/exit lifecycles for elements that animate out
//! - **Route Transitions**: Keyed cross-fades where the last navigation wins

pub mod clock;
pub mod counter;
pub mod easing;
pub mod presence;
pub mod scheduler;
pub mod transition;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use counter::{
    format_count, start_on_reveal, CounterFrames, CounterHandle, CounterState, CounterStatus,
    EasedCounter,
};
pub use easing::{ease_out_quart, Easing};
pub use presence::{Presence, PresenceConfig, PresencePhase};
pub use scheduler::{FrameCallbackId, FrameGuard, FrameScheduler, TickControl};
pub use transition::{
    NavigationOutcome, PageFactory, PageScope, PageSlot, RouteTransitionHost,
    RouteTransitionState, TransitionEvent, TransitionPhase,
};
