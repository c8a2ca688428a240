//! Integration tests for reveal-gated counters living inside routed pages
//!
//! These tests verify that:
//! - A counter starts only once its stats row is revealed
//! - Navigating away mid-count tears down frame callbacks and reveal
//!   subscriptions of the outgoing page
//! - A rapid `/` → `/services` → `/about` sequence settles on `/about` with
//!   nothing of the earlier pages left behind

use std::rc::Rc;

use vigil_animation::{
    start_on_reveal, Clock, CounterStatus, EasedCounter, FrameScheduler, ManualClock, PageScope,
    PresenceConfig, RouteTransitionHost,
};
use vigil_core::{RevealController, RevealOptions, TargetId, VisibilityState};

/// Mount a stats row: one target, one counter, one subscription
fn mount_stats(
    scope: &mut PageScope,
    controller: &RevealController,
    scheduler: &FrameScheduler,
    clock: Rc<ManualClock>,
    to: f64,
) {
    let target = controller.mount_target();
    let counter = EasedCounter::new(scheduler, clock, 0.0, to, 2000.0);
    let subscription = start_on_reveal(controller, &target, RevealOptions::threshold(0.3), &counter);
    scope.insert("stats-target", target.id());
    scope.insert("counter", counter);
    scope.hold(subscription);
    scope.hold(target);
}

struct Site {
    clock: Rc<ManualClock>,
    scheduler: FrameScheduler,
    controller: RevealController,
    host: RouteTransitionHost,
}

impl Site {
    fn new() -> Self {
        let clock = ManualClock::shared();
        let scheduler = FrameScheduler::new();
        let controller = RevealController::detached();

        let (c, s, k) = (controller.clone(), scheduler.clone(), clock.clone());
        let host = RouteTransitionHost::new(
            "/",
            PresenceConfig::new(500.0, 300.0),
            move |key: &str, scope: &mut PageScope| {
                let to = match key {
                    "/" => 543.0,
                    "/services" => 24.0,
                    _ => 98.0,
                };
                mount_stats(scope, &c, &s, k.clone(), to);
            },
        );
        Self {
            clock,
            scheduler,
            controller,
            host,
        }
    }

    fn frame(&mut self) {
        self.clock.advance(16.0);
        let now = self.clock.now_ms();
        self.scheduler.tick(now);
        self.host.tick(now);
    }

    fn stats_target(&self) -> TargetId {
        *self
            .host
            .current_page()
            .scope()
            .get::<TargetId>("stats-target")
            .expect("page mounts a stats target")
    }

    fn counter_value(&self) -> f64 {
        self.host
            .current_page()
            .scope()
            .get::<EasedCounter>("counter")
            .map(EasedCounter::value)
            .expect("page mounts a counter")
    }
}

#[test]
fn test_counter_waits_for_reveal() {
    let mut site = Site::new();
    for _ in 0..10 {
        site.frame();
    }
    assert_eq!(site.counter_value(), 0.0);
    assert!(!site.scheduler.has_pending());

    let target = site.stats_target();
    assert_eq!(site.controller.report(target, 0.1), 0);
    assert_eq!(site.controller.report(target, 0.5), 1);
    assert_eq!(
        site.controller.state(target),
        Some(VisibilityState::Revealed)
    );

    for _ in 0..150 {
        site.frame();
    }
    assert_eq!(site.counter_value(), 543.0);
    assert!(!site.scheduler.has_pending());

    // Scrolling past again never restarts the count
    assert_eq!(site.controller.report(target, 1.0), 0);
}

#[test]
fn test_leaving_mid_count_cancels_frames() {
    let mut site = Site::new();
    let home = site.stats_target();
    site.controller.report(home, 1.0);
    site.frame();
    assert_eq!(site.scheduler.pending_count(), 1);

    site.host.navigate("/services", site.clock.now_ms());
    for _ in 0..40 {
        site.frame();
    }

    assert!(site.host.is_stable());
    assert_eq!(site.host.current_key(), "/services");
    assert_eq!(site.scheduler.pending_count(), 0);
    assert_eq!(site.controller.state(home), None);
    assert_eq!(site.controller.mounted_targets(), 1);
    assert_eq!(site.controller.active_subscriptions(), 1);
}

#[test]
fn test_rapid_navigation_settles_on_last_route() {
    let mut site = Site::new();
    let home = site.stats_target();
    site.controller.report(home, 1.0);

    site.host.navigate("/services", site.clock.now_ms());
    site.frame();
    site.frame();
    let services = site.stats_target();
    site.controller.report(services, 1.0);
    site.frame();

    site.host.navigate("/about", site.clock.now_ms());
    // The stale home page is gone at once; services is still fading out
    assert_eq!(site.host.mounted_pages(), 2);
    assert_eq!(site.controller.state(home), None);

    let mut seen = Vec::new();
    for _ in 0..60 {
        site.frame();
        seen.push(site.host.current_key().to_string());
    }

    assert!(seen.iter().all(|k| k == "/about"));
    assert!(site.host.is_stable());
    assert_eq!(site.host.mounted_pages(), 1);
    assert_eq!(site.controller.state(services), None);
    assert_eq!(site.controller.mounted_targets(), 1);
    assert_eq!(site.scheduler.pending_count(), 0);

    let about = site.host.current_page().scope();
    let counter = about.get::<EasedCounter>("counter").expect("about counter");
    assert_eq!(counter.status(), CounterStatus::Idle);
}
