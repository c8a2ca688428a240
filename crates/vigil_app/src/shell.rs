//! Application shell
//!
//! Wires the engines together the way the site uses them: one frame
//! scheduler and reveal controller for the whole app, the route transition
//! host wrapping the routed page tree, and the overlay stack owned at shell
//! level alongside the navbar. Platform concerns (time, visibility, scroll,
//! analytics) arrive as [`ShellServices`].

use std::cell::Cell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use vigil_animation::{
    format_count, start_on_reveal, EasedCounter, FrameScheduler, NavigationOutcome, PageScope,
    Presence, PresencePhase, RouteTransitionHost, RouteTransitionState, SharedClock,
    TransitionEvent,
};
use vigil_core::{
    emit_best_effort, AnalyticsRecord, AnalyticsSink, DismissOutcome, Event, KeyCode, NoopScroll,
    OpenOutcome, OverlayKind, OverlayOptions, OverlayStack, Point, Rect, RevealController,
    RevealOptions, RevealSubscription, ScrollCapability, SharedOverlayStack, TargetId,
    TracingSink,
};

use crate::config::VigilConfig;
use crate::pages::{self, PageSpec, HERO_SECTION, SERVICES_ANCHOR, STATS_SECTION};

/// Overlay id of the navbar's mission-brief modal
pub const MISSION_BRIEF: &str = "mission-brief";

/// Overlay id of the mobile navigation drawer
pub const MOBILE_MENU: &str = "mobile-menu";

const PAGE: &str = "page";
const TARGETS: &str = "targets";
const HERO_EXPANDED: &str = "hero-expanded";

type SectionTargets = FxHashMap<&'static str, TargetId>;

/// Platform services injected into the shell
pub struct ShellServices {
    pub clock: SharedClock,
    pub reveal: RevealController,
    pub analytics: Box<dyn AnalyticsSink>,
    pub scroll: Box<dyn ScrollCapability>,
}

impl ShellServices {
    /// Services that log analytics and ignore scroll requests
    pub fn new(clock: SharedClock, reveal: RevealController) -> Self {
        Self {
            clock,
            reveal,
            analytics: Box::new(TracingSink),
            scroll: Box::new(NoopScroll),
        }
    }

    pub fn with_analytics(mut self, sink: impl AnalyticsSink + 'static) -> Self {
        self.analytics = Box::new(sink);
        self
    }

    pub fn with_scroll(mut self, scroll: impl ScrollCapability + 'static) -> Self {
        self.scroll = Box::new(scroll);
        self
    }
}

/// Everything a page needs to mount its reveal targets and counters
#[derive(Clone)]
struct PageContext {
    reveal: RevealController,
    scheduler: FrameScheduler,
    clock: SharedClock,
    options: RevealOptions,
    counter_duration_ms: f64,
}

impl PageContext {
    fn mount(&self, key: &str, scope: &mut PageScope) {
        let page = pages::resolve_or_not_found(key);
        let mut targets = SectionTargets::default();
        let mut subscriptions: Vec<RevealSubscription> = Vec::new();
        let mut mounted = Vec::with_capacity(page.sections.len());

        for &section in page.sections {
            let target = self.reveal.mount_target();
            targets.insert(section, target.id());

            match section {
                HERO_SECTION => {
                    let expanded = Rc::new(Cell::new(false));
                    let flag = expanded.clone();
                    subscriptions.push(self.reveal.subscribe(
                        &target,
                        self.options.clone(),
                        move || flag.set(true),
                    ));
                    scope.insert(HERO_EXPANDED, expanded);
                }
                STATS_SECTION => {
                    for stat in page.stats {
                        let counter = EasedCounter::new(
                            &self.scheduler,
                            self.clock.clone(),
                            0.0,
                            stat.value,
                            self.counter_duration_ms,
                        );
                        subscriptions.push(start_on_reveal(
                            &self.reveal,
                            &target,
                            self.options.clone(),
                            &counter,
                        ));
                        scope.insert(stat.id, counter);
                    }
                }
                _ => {
                    subscriptions.push(self.reveal.subscribe(
                        &target,
                        self.options.clone(),
                        move || tracing::trace!(section, "section faded in"),
                    ));
                }
            }
            mounted.push(target);
        }

        tracing::debug!(key, title = page.title, sections = mounted.len(), "page mounted");
        scope.insert(PAGE, page);
        scope.insert(TARGETS, targets);
        scope.hold(subscriptions);
        scope.hold(mounted);
    }
}

/// The running site
pub struct AppShell {
    config: VigilConfig,
    clock: SharedClock,
    scheduler: FrameScheduler,
    reveal: RevealController,
    overlays: SharedOverlayStack,
    overlay_presence: FxHashMap<String, Presence>,
    host: RouteTransitionHost,
    analytics: Box<dyn AnalyticsSink>,
    scroll: Box<dyn ScrollCapability>,
    analytics_emitted: usize,
}

impl AppShell {
    /// Boot the shell with `initial_path` already on screen
    pub fn new(config: VigilConfig, services: ShellServices, initial_path: &str) -> Self {
        let scheduler = FrameScheduler::new();
        let context = PageContext {
            reveal: services.reveal.clone(),
            scheduler: scheduler.clone(),
            clock: services.clock.clone(),
            options: RevealOptions::threshold(config.reveal.threshold),
            counter_duration_ms: config.counter.duration_ms,
        };
        let host = RouteTransitionHost::new(
            route_key(initial_path),
            config.transition.presence(),
            move |key: &str, scope: &mut PageScope| context.mount(key, scope),
        );

        let overlays = OverlayStack::shared();
        {
            let mut stack = overlays.borrow_mut();
            stack.register(
                MISSION_BRIEF,
                OverlayOptions::singleton(OverlayKind::Modal, config.overlay.modal_dismissible),
            );
            stack.register(
                MOBILE_MENU,
                OverlayOptions::singleton(OverlayKind::Drawer, config.overlay.drawer_dismissible),
            );
        }

        tracing::info!(route = %host.current_key(), "shell started");
        Self {
            config,
            clock: services.clock,
            scheduler,
            reveal: services.reveal,
            overlays,
            overlay_presence: FxHashMap::default(),
            host,
            analytics: services.analytics,
            scroll: services.scroll,
            analytics_emitted: 0,
        }
    }

    pub fn config(&self) -> &VigilConfig {
        &self.config
    }

    /// Handle to the overlay stack for components outside the shell
    pub fn overlays(&self) -> SharedOverlayStack {
        self.overlays.clone()
    }

    // ------------------------------------------------------------------
    // Frame loop
    // ------------------------------------------------------------------

    /// Run one frame at the clock's current time
    pub fn frame(&mut self) -> SmallVec<[TransitionEvent; 2]> {
        let now = self.clock.now_ms();
        self.scheduler.tick(now);
        let events = self.host.tick(now);
        self.overlay_presence
            .retain(|_, presence| presence.update(now) != PresencePhase::Removed);
        events
    }

    // ------------------------------------------------------------------
    // Routing
    // ------------------------------------------------------------------

    /// Follow a router path change
    pub fn navigate(&mut self, path: &str) -> NavigationOutcome {
        let now = self.clock.now_ms();
        let outcome = self.host.navigate(&route_key(path), now);
        if !outcome.is_accepted() {
            return outcome;
        }

        if self.overlays.borrow_mut().close(MOBILE_MENU) {
            self.begin_overlay_exit(MOBILE_MENU, now);
        }
        if let Err(err) = self.scroll.scroll_to_top() {
            tracing::warn!(error = %err, "scroll reset failed");
        }
        outcome
    }

    pub fn route_state(&self) -> &RouteTransitionState {
        self.host.state()
    }

    pub fn current_route(&self) -> &str {
        self.host.current_key()
    }

    pub fn is_stable(&self) -> bool {
        self.host.is_stable()
    }

    /// Number of page subtrees currently mounted
    pub fn mounted_pages(&self) -> usize {
        self.host.mounted_pages()
    }

    /// Title of the page that is (or is becoming) current
    pub fn current_title(&self) -> &'static str {
        self.current_page_spec().map_or(pages::NOT_FOUND.title, |p| p.title)
    }

    /// Whether routed content accepts input: no route transition is running
    /// and no overlay covers the page
    pub fn page_accepts_input(&self) -> bool {
        self.host.input_enabled() && self.overlays.borrow().topmost().is_none()
    }

    /// Route key of the page that receives input
    pub fn interactive_route(&self) -> &str {
        self.host.interactive_page().key()
    }

    // ------------------------------------------------------------------
    // Overlays
    // ------------------------------------------------------------------

    /// Navbar action: open the mission-brief modal
    pub fn open_mission_brief(&mut self) -> OpenOutcome {
        let outcome = self.overlays.borrow_mut().open(
            MISSION_BRIEF,
            OverlayKind::Modal,
            self.config.overlay.modal_dismissible,
        );
        if outcome == OpenOutcome::Opened {
            self.begin_overlay_enter(MISSION_BRIEF, self.clock.now_ms());
        }
        outcome
    }

    pub fn close_mission_brief(&mut self) -> bool {
        let closed = self.overlays.borrow_mut().close(MISSION_BRIEF);
        if closed {
            self.begin_overlay_exit(MISSION_BRIEF, self.clock.now_ms());
        }
        closed
    }

    /// Hamburger action. Returns whether the menu is now open.
    pub fn toggle_mobile_menu(&mut self) -> bool {
        let now = self.clock.now_ms();
        let open = self.overlays.borrow_mut().toggle(MOBILE_MENU);
        if open {
            self.begin_overlay_enter(MOBILE_MENU, now);
        } else {
            self.begin_overlay_exit(MOBILE_MENU, now);
        }
        open
    }

    /// Record where an overlay's content was laid out
    pub fn set_overlay_bounds(&mut self, id: &str, bounds: Rect) {
        self.overlays.borrow_mut().set_content_bounds(id, bounds);
    }

    pub fn is_overlay_open(&self, id: &str) -> bool {
        self.overlays.borrow().is_open(id)
    }

    /// Presentation phase of an overlay; `None` once fully gone
    pub fn overlay_phase(&self, id: &str) -> Option<PresencePhase> {
        self.overlay_presence.get(id).map(Presence::phase)
    }

    pub fn overlay_opacity(&self, id: &str) -> f64 {
        self.overlay_presence
            .get(id)
            .map_or(0.0, |p| p.opacity(self.clock.now_ms()))
    }

    fn begin_overlay_enter(&mut self, id: &str, now: f64) {
        let config = self.config.overlay.presence();
        match self.overlay_presence.get_mut(id) {
            Some(presence) if presence.phase() == PresencePhase::Exiting => {
                presence.enter(now);
            }
            Some(_) => {}
            None => {
                self.overlay_presence
                    .insert(id.to_string(), Presence::entering(config, now));
            }
        }
    }

    fn begin_overlay_exit(&mut self, id: &str, now: f64) {
        if let Some(presence) = self.overlay_presence.get_mut(id) {
            if presence.exit(now) == PresencePhase::Removed {
                self.overlay_presence.remove(id);
            }
        }
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    /// Feed a pointer press at viewport coordinates
    pub fn pointer_down(&mut self, position: Point) -> DismissOutcome {
        let now = self.clock.now_ms();
        let mut event = Event::pointer_down(position, now);
        self.dispatch(&mut event, now)
    }

    /// Feed a key press
    pub fn key_down(&mut self, key: KeyCode) -> DismissOutcome {
        let now = self.clock.now_ms();
        let mut event = Event::key_down(key, now);
        self.dispatch(&mut event, now)
    }

    fn dispatch(&mut self, event: &mut Event, now: f64) -> DismissOutcome {
        let outcome = self.overlays.borrow_mut().handle_event(event);
        if let DismissOutcome::Dismissed { id } = &outcome {
            self.begin_overlay_exit(id, now);
        }
        if event.propagation_stopped {
            return outcome;
        }
        if self.host.input_enabled() {
            tracing::trace!(page = %self.host.interactive_page().key(), "input delivered to page");
        } else {
            tracing::trace!(page = %self.host.interactive_page().key(), "input held during route transition");
        }
        outcome
    }

    // ------------------------------------------------------------------
    // Integration hooks
    // ------------------------------------------------------------------

    /// Primary CTA. The click always completes; returns whether the
    /// analytics record was accepted.
    pub fn contact_command(&mut self) -> bool {
        let emitted = emit_best_effort(self.analytics.as_ref(), &AnalyticsRecord::contact_click());
        if emitted {
            self.analytics_emitted += 1;
        }
        emitted
    }

    /// Hero action: smooth-scroll to the services section
    pub fn initiate_protocol(&mut self) -> bool {
        match self.scroll.scroll_to_anchor(SERVICES_ANCHOR) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "initiate protocol scroll failed");
                false
            }
        }
    }

    pub fn analytics_emitted(&self) -> usize {
        self.analytics_emitted
    }

    // ------------------------------------------------------------------
    // Reveal and counters
    // ------------------------------------------------------------------

    /// Feed the visible fraction of a section on the current page.
    ///
    /// Returns how many reveal callbacks fired.
    pub fn report_visibility(&mut self, section: &str, fraction: f32) -> usize {
        let target = self
            .host
            .current_page()
            .scope()
            .get::<SectionTargets>(TARGETS)
            .and_then(|targets| targets.get(section).copied());
        match target {
            Some(id) => self.reveal.report(id, fraction),
            None => {
                tracing::debug!(section, route = %self.host.current_key(), "no such section on page");
                0
            }
        }
    }

    /// Whether the hero's expand trigger has fired on the current page
    pub fn hero_expanded(&self) -> bool {
        self.host
            .current_page()
            .scope()
            .get::<Rc<Cell<bool>>>(HERO_EXPANDED)
            .is_some_and(|flag| flag.get())
    }

    /// Current value of a stat counter on the current page
    pub fn counter_value(&self, stat: &str) -> Option<f64> {
        self.host
            .current_page()
            .scope()
            .get::<EasedCounter>(stat)
            .map(EasedCounter::value)
    }

    /// Display text of a stat counter, e.g. `543+`
    pub fn counter_text(&self, stat: &str) -> Option<String> {
        let value = self.counter_value(stat)?;
        let suffix = self
            .current_page_spec()?
            .stats
            .iter()
            .find(|s| s.id == stat)
            .map_or("", |s| s.suffix);
        Some(format_count(value, suffix))
    }

    /// Stat ids of the current page
    pub fn stat_ids(&self) -> Vec<&'static str> {
        self.current_page_spec()
            .map(|p| p.stats.iter().map(|s| s.id).collect())
            .unwrap_or_default()
    }

    /// Frame callbacks still registered (counters mid-count)
    pub fn pending_frame_callbacks(&self) -> usize {
        self.scheduler.pending_count()
    }

    /// Reveal subscriptions still waiting, across all mounted pages
    pub fn active_reveal_subscriptions(&self) -> usize {
        self.reveal.active_subscriptions()
    }

    /// Reveal targets mounted, across all mounted pages
    pub fn mounted_reveal_targets(&self) -> usize {
        self.reveal.mounted_targets()
    }

    fn current_page_spec(&self) -> Option<&'static PageSpec> {
        self.host
            .current_page()
            .scope()
            .get::<&'static PageSpec>(PAGE)
            .copied()
    }
}

impl std::fmt::Debug for AppShell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppShell")
            .field("route", self.host.state())
            .field("overlays", &self.overlay_presence)
            .field("analytics_emitted", &self.analytics_emitted)
            .finish()
    }
}

/// Host key for a router path: the table path for known pages, the raw path
/// for anything that renders the not-found page
fn route_key(path: &str) -> String {
    match pages::resolve(path) {
        Ok(page) => page.path.to_string(),
        Err(_) => path.to_string(),
    }
}
