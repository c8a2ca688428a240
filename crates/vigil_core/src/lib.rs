//! Vigil Core Runtime
//!
//! Foundational interaction primitives for the Vigil site engine:
//!
//! - **Events**: Pointer and keyboard input with explicit propagation control
//! - **Reveal**: Reveal-once visibility subscriptions driven by an injected
//!   intersection source
//! - **Overlays**: A single owned stack of modal/drawer entries with
//!   click-outside and escape dismissal
//! - **Integration hooks**: Best-effort analytics and scroll capabilities
//!
//! # Example
//!
//! ```rust
//! use vigil_core::overlay::{OverlayKind, OverlayStack, OpenOutcome};
//!
//! let mut overlays = OverlayStack::new();
//! assert_eq!(
//!     overlays.open("mission-brief", OverlayKind::Modal, true),
//!     OpenOutcome::Opened
//! );
//! assert_eq!(
//!     overlays.open("mission-brief", OverlayKind::Modal, true),
//!     OpenOutcome::AlreadyOpen
//! );
//! assert!(overlays.is_open("mission-brief"));
//! ```

pub mod analytics;
pub mod capability;
pub mod error;
pub mod events;
pub mod overlay;
pub mod reveal;

pub use analytics::{
    emit_best_effort, AnalyticsRecord, AnalyticsSink, NullSink, RecordingSink, TracingSink,
};
pub use capability::{NoopScroll, RecordingScroll, ScrollAction, ScrollCapability};
pub use error::{IntegrationError, Result};
pub use events::{Event, EventData, KeyCode, Point, Rect};
pub use overlay::{
    DismissOutcome, OpenOutcome, OverlayChange, OverlayEntry, OverlayKind, OverlayOptions,
    OverlayStack, SharedOverlayStack,
};
pub use reveal::{
    AnimationTarget, IntersectionSource, ManualSource, RevealController, RevealFallback,
    RevealOptions, RevealSubscription, SubscriptionId, TargetId, VisibilityState,
};
