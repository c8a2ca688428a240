//! Reveal-once visibility subscriptions
//!
//! A [`RevealController`] hands out per-mount [`AnimationTarget`]s and lets
//! callers subscribe to the first moment a target becomes visible. The
//! platform (or a headless driver) feeds visibility fractions through
//! [`RevealController::report`]; observation itself is delegated to an
//! injected [`IntersectionSource`].
//!
//! Reveal-once is scoped to the mount: dropping a target tears down all of its
//! subscriptions without invoking them, and a remount starts from
//! [`VisibilityState::Unobserved`] with a fresh id.
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use vigil_core::reveal::{RevealController, RevealOptions};
//!
//! let controller = RevealController::detached();
//! let target = controller.mount_target();
//! let fired = Rc::new(Cell::new(0));
//!
//! let counter = fired.clone();
//! let _sub = controller.subscribe(&target, RevealOptions::threshold(0.3), move || {
//!     counter.set(counter.get() + 1);
//! });
//!
//! controller.report(target.id(), 0.5);
//! controller.report(target.id(), 0.0);
//! controller.report(target.id(), 0.9);
//! assert_eq!(fired.get(), 1);
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

use crate::error::{IntegrationError, Result};

new_key_type! {
    /// Identifier of a mounted animation target
    pub struct TargetId;
    /// Identifier of a reveal subscription
    pub struct SubscriptionId;
}

/// Visibility lifecycle of a mounted target
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VisibilityState {
    /// Mounted, nobody is watching it yet
    #[default]
    Unobserved,
    /// At least one subscription is waiting for it
    Pending,
    /// Crossed a threshold once; terminal for this mount
    Revealed,
}

/// What to do when the platform cannot observe visibility
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealFallback {
    /// Leave the subscription inert; gated content stays in its initial state
    #[default]
    Skip,
    /// Treat the target as visible right away
    RevealImmediately,
}

/// Options for a reveal subscription
#[derive(Clone, Debug, PartialEq)]
pub struct RevealOptions {
    /// Fraction of the target (0.0 to 1.0) that must be visible
    pub threshold: f32,
    /// Named scroll container, or `None` for the viewport
    pub root: Option<String>,
}

impl RevealOptions {
    pub fn threshold(threshold: f32) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
            root: None,
        }
    }

    /// Observe against a scroll container instead of the viewport
    pub fn within(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }

    fn is_satisfied_by(&self, fraction: f32) -> bool {
        fraction > 0.0 && fraction >= self.threshold
    }
}

impl Default for RevealOptions {
    fn default() -> Self {
        Self::threshold(0.0)
    }
}

/// Platform service that watches element visibility.
///
/// Implementations call back into [`RevealController::report`] with the
/// visible fraction of each observed target, either later or synchronously
/// from inside `observe` for an element that is already in view.
pub trait IntersectionSource {
    /// Begin observing a target
    fn observe(&mut self, target: TargetId, options: &RevealOptions) -> Result<()>;

    /// Stop observing a target
    fn unobserve(&mut self, target: TargetId);
}

/// Source that accepts every observation and relies on explicit reports
#[derive(Debug, Default)]
pub struct ManualSource;

impl IntersectionSource for ManualSource {
    fn observe(&mut self, _target: TargetId, _options: &RevealOptions) -> Result<()> {
        Ok(())
    }

    fn unobserve(&mut self, _target: TargetId) {}
}

type RevealCallback = Box<dyn FnOnce()>;
type SharedSource = Rc<RefCell<Box<dyn IntersectionSource>>>;

struct TargetRecord {
    state: VisibilityState,
}

struct SubscriptionRecord {
    target: TargetId,
    options: RevealOptions,
    on_reveal: Option<RevealCallback>,
}

/// Call into the intersection source, applied after the registry borrow ends
enum SourceOp {
    Observe {
        subscription: SubscriptionId,
        target: TargetId,
        options: RevealOptions,
    },
    Unobserve(TargetId),
}

struct Registry {
    targets: SlotMap<TargetId, TargetRecord>,
    subscriptions: SlotMap<SubscriptionId, SubscriptionRecord>,
    source: SharedSource,
    pending_ops: VecDeque<SourceOp>,
    fallback: RevealFallback,
    revealed_count: usize,
}

impl Registry {
    fn has_subscriptions_for(&self, target: TargetId) -> bool {
        self.subscriptions.values().any(|s| s.target == target)
    }

    /// Remove a subscription, releasing the observation when it was the last
    /// one for its target. The callback is dropped, never invoked.
    fn release(&mut self, id: SubscriptionId) {
        let Some(record) = self.subscriptions.remove(id) else {
            return;
        };
        if !self.has_subscriptions_for(record.target) {
            self.pending_ops.push_back(SourceOp::Unobserve(record.target));
        }
    }

    fn mark_revealed(&mut self, target: TargetId) -> bool {
        match self.targets.get_mut(target) {
            Some(record) if record.state != VisibilityState::Revealed => {
                record.state = VisibilityState::Revealed;
                self.revealed_count += 1;
                true
            }
            _ => false,
        }
    }

    /// Apply the observer fallback to a subscription whose observation failed
    fn observation_failed(
        &mut self,
        subscription: SubscriptionId,
        err: &IntegrationError,
    ) -> Option<RevealCallback> {
        let record = self.subscriptions.remove(subscription)?;
        tracing::warn!(target = ?record.target, error = %err, "visibility observation unavailable");
        match self.fallback {
            RevealFallback::Skip => None,
            RevealFallback::RevealImmediately => {
                self.mark_revealed(record.target);
                record.on_reveal
            }
        }
    }
}

/// Run queued source calls with no registry borrow held.
///
/// The source may report synchronously; those reports queue more calls, which
/// the outermost drain picks up. A nested drain finds the source busy and
/// returns at once.
fn drain_source_ops(registry: &RefCell<Registry>) {
    let Ok(shared_source) = registry.try_borrow().map(|r| r.source.clone()) else {
        return;
    };
    let mut fallbacks: SmallVec<[RevealCallback; 1]> = SmallVec::new();

    loop {
        let Ok(mut source) = shared_source.try_borrow_mut() else {
            break;
        };
        let op = match registry.try_borrow_mut() {
            Ok(mut registry) => registry.pending_ops.pop_front(),
            Err(_) => None,
        };
        let Some(op) = op else {
            break;
        };
        match op {
            SourceOp::Unobserve(target) => source.unobserve(target),
            SourceOp::Observe {
                subscription,
                target,
                options,
            } => {
                let observed = source.observe(target, &options);
                drop(source);
                if let Err(err) = observed {
                    if let Ok(mut registry) = registry.try_borrow_mut() {
                        fallbacks.extend(registry.observation_failed(subscription, &err));
                    }
                }
            }
        }
    }

    for callback in fallbacks {
        callback();
    }
}

/// Shared controller for reveal-once subscriptions.
///
/// Cloning is cheap; all clones share the same registry.
#[derive(Clone)]
pub struct RevealController {
    inner: Rc<RefCell<Registry>>,
}

impl RevealController {
    pub fn new(source: impl IntersectionSource + 'static, fallback: RevealFallback) -> Self {
        let source: Box<dyn IntersectionSource> = Box::new(source);
        Self {
            inner: Rc::new(RefCell::new(Registry {
                targets: SlotMap::with_key(),
                subscriptions: SlotMap::with_key(),
                source: Rc::new(RefCell::new(source)),
                pending_ops: VecDeque::new(),
                fallback,
                revealed_count: 0,
            })),
        }
    }

    /// Controller whose visibility comes only from explicit `report` calls
    pub fn detached() -> Self {
        Self::new(ManualSource, RevealFallback::Skip)
    }

    /// Mount a new target. Each mount gets a fresh id.
    pub fn mount_target(&self) -> AnimationTarget {
        let id = self.inner.borrow_mut().targets.insert(TargetRecord {
            state: VisibilityState::Unobserved,
        });
        tracing::trace!(?id, "reveal target mounted");
        AnimationTarget {
            id,
            registry: Rc::downgrade(&self.inner),
        }
    }

    /// Subscribe to the first time `target` satisfies `options`.
    ///
    /// `on_reveal` runs at most once. A target that already revealed during
    /// this mount invokes it immediately, as does a source that reports the
    /// target in view while observation starts.
    pub fn subscribe<F>(
        &self,
        target: &AnimationTarget,
        options: RevealOptions,
        on_reveal: F,
    ) -> RevealSubscription
    where
        F: FnOnce() + 'static,
    {
        let inert = RevealSubscription {
            id: None,
            registry: Weak::new(),
        };

        let id = {
            let mut registry = self.inner.borrow_mut();
            let Some(record) = registry.targets.get_mut(target.id) else {
                tracing::debug!(target = ?target.id, "subscribe on unmounted target ignored");
                return inert;
            };
            if record.state == VisibilityState::Revealed {
                drop(registry);
                on_reveal();
                return inert;
            }
            record.state = VisibilityState::Pending;

            let id = registry.subscriptions.insert(SubscriptionRecord {
                target: target.id,
                options: options.clone(),
                on_reveal: Some(Box::new(on_reveal)),
            });
            registry.pending_ops.push_back(SourceOp::Observe {
                subscription: id,
                target: target.id,
                options,
            });
            id
        };
        drain_source_ops(&self.inner);

        RevealSubscription {
            id: Some(id),
            registry: Rc::downgrade(&self.inner),
        }
    }

    /// Feed a visibility fraction for a target.
    ///
    /// Returns how many reveal callbacks fired. Reports for unmounted targets
    /// or after reveal are ignored.
    pub fn report(&self, target: TargetId, fraction: f32) -> usize {
        let fraction = fraction.clamp(0.0, 1.0);
        let mut fired: SmallVec<[RevealCallback; 2]> = SmallVec::new();

        {
            let Ok(mut registry) = self.inner.try_borrow_mut() else {
                tracing::warn!(?target, "reveal registry busy, visibility report dropped");
                return 0;
            };
            if !registry.targets.contains_key(target) {
                tracing::trace!(?target, "visibility report for unmounted target");
                return 0;
            }

            let ready: SmallVec<[SubscriptionId; 2]> = registry
                .subscriptions
                .iter()
                .filter(|(_, s)| s.target == target && s.options.is_satisfied_by(fraction))
                .map(|(id, _)| id)
                .collect();

            if ready.is_empty() {
                return 0;
            }

            for id in ready {
                if let Some(mut record) = registry.subscriptions.remove(id) {
                    if let Some(callback) = record.on_reveal.take() {
                        fired.push(callback);
                    }
                }
            }

            if registry.mark_revealed(target) {
                tracing::debug!(?target, fraction, "target revealed");
            }

            if !registry.has_subscriptions_for(target) {
                registry.pending_ops.push_back(SourceOp::Unobserve(target));
            }
        }
        drain_source_ops(&self.inner);

        // Callbacks may subscribe or unmount; the registry is released first.
        let count = fired.len();
        for callback in fired {
            callback();
        }
        count
    }

    /// Current visibility state of a mounted target
    pub fn state(&self, target: TargetId) -> Option<VisibilityState> {
        self.inner.borrow().targets.get(target).map(|t| t.state)
    }

    /// Number of subscriptions still waiting for their reveal
    pub fn active_subscriptions(&self) -> usize {
        self.inner.borrow().subscriptions.len()
    }

    /// Number of mounted targets
    pub fn mounted_targets(&self) -> usize {
        self.inner.borrow().targets.len()
    }

    /// Total reveals since the controller was created
    pub fn revealed_count(&self) -> usize {
        self.inner.borrow().revealed_count
    }
}

/// A mounted element whose first visibility can be observed.
///
/// Dropping the target unmounts it and tears down its subscriptions.
pub struct AnimationTarget {
    id: TargetId,
    registry: Weak<RefCell<Registry>>,
}

impl AnimationTarget {
    pub fn id(&self) -> TargetId {
        self.id
    }

    pub fn visibility_state(&self) -> VisibilityState {
        self.registry
            .upgrade()
            .and_then(|r| r.borrow().targets.get(self.id).map(|t| t.state))
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for AnimationTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationTarget").field("id", &self.id).finish()
    }
}

impl Drop for AnimationTarget {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        // A callback running during `report` may drop targets; skip if busy
        // rather than panic, the registry lookups tolerate stale ids.
        {
            let Ok(mut registry) = registry.try_borrow_mut() else {
                tracing::warn!(target = ?self.id, "reveal registry busy during unmount");
                return;
            };
            let orphaned: SmallVec<[SubscriptionId; 2]> = registry
                .subscriptions
                .iter()
                .filter(|(_, s)| s.target == self.id)
                .map(|(id, _)| id)
                .collect();
            for id in orphaned {
                registry.subscriptions.remove(id);
            }
            if registry.targets.remove(self.id).is_some() {
                registry.pending_ops.push_back(SourceOp::Unobserve(self.id));
                tracing::trace!(target = ?self.id, "reveal target unmounted");
            }
        }
        drain_source_ops(&registry);
    }
}

/// Handle to a pending reveal subscription.
///
/// Dropping it (or calling [`unsubscribe`](Self::unsubscribe)) tears the
/// subscription down without invoking its callback.
#[must_use = "dropping the subscription cancels it"]
pub struct RevealSubscription {
    id: Option<SubscriptionId>,
    registry: Weak<RefCell<Registry>>,
}

impl RevealSubscription {
    /// Whether the subscription is still waiting for its reveal
    pub fn is_pending(&self) -> bool {
        match (self.id, self.registry.upgrade()) {
            (Some(id), Some(registry)) => registry.borrow().subscriptions.contains_key(id),
            _ => false,
        }
    }

    pub fn unsubscribe(self) {}
}

impl Drop for RevealSubscription {
    fn drop(&mut self) {
        let (Some(id), Some(registry)) = (self.id.take(), self.registry.upgrade()) else {
            return;
        };
        match registry.try_borrow_mut() {
            Ok(mut guard) => guard.release(id),
            Err(_) => {
                tracing::warn!(?id, "reveal registry busy during unsubscribe");
                return;
            }
        };
        drain_source_ops(&registry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<u32>>, impl FnOnce() + 'static) {
        let count = Rc::new(Cell::new(0));
        let inner = count.clone();
        (count, move || inner.set(inner.get() + 1))
    }

    /// Records observe/unobserve calls
    #[derive(Clone, Default)]
    struct SpySource {
        log: Rc<RefCell<Vec<(&'static str, TargetId)>>>,
    }

    impl IntersectionSource for SpySource {
        fn observe(&mut self, target: TargetId, _options: &RevealOptions) -> Result<()> {
            self.log.borrow_mut().push(("observe", target));
            Ok(())
        }

        fn unobserve(&mut self, target: TargetId) {
            self.log.borrow_mut().push(("unobserve", target));
        }
    }

    struct BrokenSource;

    impl IntersectionSource for BrokenSource {
        fn observe(&mut self, _target: TargetId, _options: &RevealOptions) -> Result<()> {
            Err(IntegrationError::ObserverUnavailable("no IntersectionObserver".into()))
        }

        fn unobserve(&mut self, _target: TargetId) {}
    }

    /// Reports every observed target as fully visible from inside `observe`
    #[derive(Clone, Default)]
    struct InViewSource {
        controller: Rc<RefCell<Option<RevealController>>>,
        log: Rc<RefCell<Vec<(&'static str, TargetId)>>>,
    }

    impl IntersectionSource for InViewSource {
        fn observe(&mut self, target: TargetId, _options: &RevealOptions) -> Result<()> {
            self.log.borrow_mut().push(("observe", target));
            let controller = self.controller.borrow().clone();
            if let Some(controller) = controller {
                controller.report(target, 1.0);
            }
            Ok(())
        }

        fn unobserve(&mut self, target: TargetId) {
            self.log.borrow_mut().push(("unobserve", target));
        }
    }

    fn in_view_controller() -> (RevealController, InViewSource) {
        let source = InViewSource::default();
        let controller = RevealController::new(source.clone(), RevealFallback::Skip);
        *source.controller.borrow_mut() = Some(controller.clone());
        (controller, source)
    }

    #[test]
    fn test_reveal_fires_once_across_scroll_cycles() {
        let controller = RevealController::detached();
        let target = controller.mount_target();
        let (count, on_reveal) = counter();
        let _sub = controller.subscribe(&target, RevealOptions::threshold(0.3), on_reveal);

        assert_eq!(target.visibility_state(), VisibilityState::Pending);

        // Scroll down, up, down
        assert_eq!(controller.report(target.id(), 0.6), 1);
        assert_eq!(controller.report(target.id(), 0.0), 0);
        assert_eq!(controller.report(target.id(), 0.8), 0);

        assert_eq!(count.get(), 1);
        assert_eq!(target.visibility_state(), VisibilityState::Revealed);
        assert_eq!(controller.active_subscriptions(), 0);
    }

    #[test]
    fn test_below_threshold_does_not_fire() {
        let controller = RevealController::detached();
        let target = controller.mount_target();
        let (count, on_reveal) = counter();
        let sub = controller.subscribe(&target, RevealOptions::threshold(0.5), on_reveal);

        controller.report(target.id(), 0.49);
        assert_eq!(count.get(), 0);
        assert!(sub.is_pending());

        controller.report(target.id(), 0.5);
        assert_eq!(count.get(), 1);
        assert!(!sub.is_pending());
    }

    #[test]
    fn test_zero_threshold_requires_intersection() {
        let controller = RevealController::detached();
        let target = controller.mount_target();
        let (count, on_reveal) = counter();
        let _sub = controller.subscribe(&target, RevealOptions::default(), on_reveal);

        controller.report(target.id(), 0.0);
        assert_eq!(count.get(), 0);
        controller.report(target.id(), 0.01);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_unmount_before_reveal_is_silent() {
        let controller = RevealController::detached();
        let target = controller.mount_target();
        let id = target.id();
        let (count, on_reveal) = counter();
        let sub = controller.subscribe(&target, RevealOptions::threshold(0.1), on_reveal);

        drop(target);
        assert_eq!(controller.active_subscriptions(), 0);
        assert_eq!(controller.report(id, 1.0), 0);
        assert_eq!(count.get(), 0);

        // Dropping the now-orphaned handle is harmless
        drop(sub);
        assert_eq!(controller.mounted_targets(), 0);
    }

    #[test]
    fn test_unsubscribe_releases_observation() {
        let source = SpySource::default();
        let log = source.log.clone();
        let controller = RevealController::new(source, RevealFallback::Skip);
        let target = controller.mount_target();
        let (count, on_reveal) = counter();

        let sub = controller.subscribe(&target, RevealOptions::threshold(0.2), on_reveal);
        sub.unsubscribe();
        controller.report(target.id(), 1.0);

        assert_eq!(count.get(), 0);
        assert_eq!(
            log.borrow().as_slice(),
            &[("observe", target.id()), ("unobserve", target.id())]
        );
    }

    #[test]
    fn test_remount_starts_fresh() {
        let controller = RevealController::detached();
        let first = controller.mount_target();
        let first_id = first.id();
        let (_, on_reveal) = counter();
        let _sub = controller.subscribe(&first, RevealOptions::threshold(0.1), on_reveal);
        controller.report(first_id, 1.0);
        assert_eq!(first.visibility_state(), VisibilityState::Revealed);
        drop(first);

        let second = controller.mount_target();
        assert_ne!(second.id(), first_id);
        assert_eq!(second.visibility_state(), VisibilityState::Unobserved);

        let (count, on_reveal) = counter();
        let _sub = controller.subscribe(&second, RevealOptions::threshold(0.1), on_reveal);
        controller.report(second.id(), 1.0);
        assert_eq!(count.get(), 1);
        assert_eq!(controller.revealed_count(), 2);
    }

    #[test]
    fn test_independent_targets() {
        let controller = RevealController::detached();
        let hero = controller.mount_target();
        let stats = controller.mount_target();
        let (hero_count, hero_cb) = counter();
        let (stats_count, stats_cb) = counter();
        let _a = controller.subscribe(&hero, RevealOptions::threshold(0.1), hero_cb);
        let _b = controller.subscribe(&stats, RevealOptions::threshold(0.3), stats_cb);

        controller.report(stats.id(), 0.5);
        assert_eq!((hero_count.get(), stats_count.get()), (0, 1));
        controller.report(hero.id(), 0.5);
        assert_eq!((hero_count.get(), stats_count.get()), (1, 1));
    }

    #[test]
    fn test_subscribe_after_reveal_fires_immediately() {
        let controller = RevealController::detached();
        let target = controller.mount_target();
        let (_, first) = counter();
        let _sub = controller.subscribe(&target, RevealOptions::threshold(0.1), first);
        controller.report(target.id(), 1.0);

        let (count, late) = counter();
        let late_sub = controller.subscribe(&target, RevealOptions::threshold(0.9), late);
        assert_eq!(count.get(), 1);
        assert!(!late_sub.is_pending());
    }

    #[test]
    fn test_callback_may_unmount_other_targets() {
        let controller = RevealController::detached();
        let trigger = controller.mount_target();
        let other = Rc::new(RefCell::new(Some(controller.mount_target())));

        let slot = other.clone();
        let _sub = controller.subscribe(&trigger, RevealOptions::threshold(0.1), move || {
            slot.borrow_mut().take();
        });

        controller.report(trigger.id(), 1.0);
        assert!(other.borrow().is_none());
        assert_eq!(controller.mounted_targets(), 1);
    }

    #[test]
    fn test_source_reporting_during_observe() {
        let (controller, source) = in_view_controller();
        let target = controller.mount_target();
        let (count, on_reveal) = counter();

        let sub = controller.subscribe(&target, RevealOptions::threshold(0.3), on_reveal);

        assert_eq!(count.get(), 1);
        assert!(!sub.is_pending());
        assert_eq!(target.visibility_state(), VisibilityState::Revealed);
        assert_eq!(
            source.log.borrow().as_slice(),
            &[("observe", target.id()), ("unobserve", target.id())]
        );
        source.controller.borrow_mut().take();
    }

    #[test]
    fn test_in_view_callback_may_subscribe_again() {
        let (controller, source) = in_view_controller();
        let first = controller.mount_target();
        let second = Rc::new(controller.mount_target());
        let (count, on_second) = counter();
        let nested = Rc::new(RefCell::new(None));

        let (c, t, slot) = (controller.clone(), second.clone(), nested.clone());
        let _sub = controller.subscribe(&first, RevealOptions::threshold(0.1), move || {
            *slot.borrow_mut() = Some(c.subscribe(&t, RevealOptions::threshold(0.1), on_second));
        });

        assert_eq!(count.get(), 1);
        assert_eq!(controller.revealed_count(), 2);
        assert_eq!(controller.active_subscriptions(), 0);
        let observed = source
            .log
            .borrow()
            .iter()
            .filter(|(op, _)| *op == "observe")
            .count();
        assert_eq!(observed, 2);
        nested.borrow_mut().take();
        source.controller.borrow_mut().take();
    }

    #[test]
    fn test_unavailable_observer_skip() {
        let controller = RevealController::new(BrokenSource, RevealFallback::Skip);
        let target = controller.mount_target();
        let (count, on_reveal) = counter();
        let sub = controller.subscribe(&target, RevealOptions::threshold(0.1), on_reveal);

        assert!(!sub.is_pending());
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_unavailable_observer_reveal_immediately() {
        let controller = RevealController::new(BrokenSource, RevealFallback::RevealImmediately);
        let target = controller.mount_target();
        let (count, on_reveal) = counter();
        let _sub = controller.subscribe(&target, RevealOptions::threshold(0.1), on_reveal);

        assert_eq!(count.get(), 1);
        assert_eq!(target.visibility_state(), VisibilityState::Revealed);
    }
}
