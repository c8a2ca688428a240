//! Route transition host
//!
//! Keys each routed page by its path and cross-fades between pages on every
//! navigation. At most one page is entering and at most one is exiting; a
//! navigation that arrives mid-transition supersedes the one in flight (last
//! navigation wins, nothing is queued).
//!
//! Pages acquire their resources (frame guards, reveal targets and
//! subscriptions, counters) through a [`PageScope`]. Unmounting a page drops
//! its scope, which releases every resource on every exit path: normal
//! settle, superseding navigation, or host teardown.
//!
//! Routed input is held while a transition runs and re-enabled once the
//! outgoing page has unmounted and the incoming page has finished entering.
//! An exiting page never receives input, so at most one page is interactable
//! at any time.

use std::any::Any;
use std::fmt;

use smallvec::SmallVec;

use crate::presence::{Presence, PresenceConfig, PresencePhase};

/// Host phase
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransitionPhase {
    #[default]
    Stable,
    Transitioning,
}

/// Observable routing state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteTransitionState {
    pub current_key: String,
    pub previous_key: Option<String>,
    pub phase: TransitionPhase,
}

/// Result of a navigation request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The path is already current
    Ignored,
    /// A transition began from a stable host
    Started { from: String },
    /// A transition was already in flight; its stale outgoing page (if any)
    /// was torn down without finishing its exit
    Superseded { torn_down: Option<String> },
}

impl NavigationOutcome {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, NavigationOutcome::Ignored)
    }
}

/// Lifecycle notifications produced by [`RouteTransitionHost::tick`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransitionEvent {
    /// The incoming page finished its enter animation
    EnterComplete(String),
    /// The outgoing page finished its exit and was unmounted
    OutgoingUnmounted(String),
    /// Back to stable on the given key
    Settled(String),
}

/// Resources owned by one mounted page.
///
/// Everything held here is dropped, in insertion order, when the page
/// unmounts.
#[derive(Default)]
pub struct PageScope {
    key: String,
    resources: Vec<(Option<String>, Box<dyn Any>)>,
}

impl PageScope {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            resources: Vec::new(),
        }
    }

    /// Route key this page is mounted under
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Keep a resource alive for the lifetime of the page
    pub fn hold<T: 'static>(&mut self, resource: T) {
        self.resources.push((None, Box::new(resource)));
    }

    /// Keep a resource alive and make it retrievable by name
    pub fn insert<T: 'static>(&mut self, name: impl Into<String>, resource: T) {
        self.resources.push((Some(name.into()), Box::new(resource)));
    }

    /// Look up a named resource of a given type
    pub fn get<T: 'static>(&self, name: &str) -> Option<&T> {
        self.resources
            .iter()
            .filter(|(n, _)| n.as_deref() == Some(name))
            .find_map(|(_, r)| r.downcast_ref::<T>())
    }

    /// Names of all named resources
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.resources.iter().filter_map(|(n, _)| n.as_deref())
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl fmt::Debug for PageScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageScope")
            .field("key", &self.key)
            .field("resources", &self.resources.len())
            .finish()
    }
}

impl Drop for PageScope {
    fn drop(&mut self) {
        if !self.resources.is_empty() {
            tracing::trace!(key = %self.key, resources = self.resources.len(), "page scope released");
        }
    }
}

/// Builds page contents when a route mounts
pub trait PageFactory {
    fn mount(&mut self, key: &str, scope: &mut PageScope);
}

impl<F> PageFactory for F
where
    F: FnMut(&str, &mut PageScope),
{
    fn mount(&mut self, key: &str, scope: &mut PageScope) {
        self(key, scope)
    }
}

/// A mounted page and its presence
#[derive(Debug)]
pub struct PageSlot {
    scope: PageScope,
    presence: Presence,
}

impl PageSlot {
    pub fn key(&self) -> &str {
        self.scope.key()
    }

    pub fn scope(&self) -> &PageScope {
        &self.scope
    }

    pub fn presence(&self) -> &Presence {
        &self.presence
    }
}

/// Keyed page transitions driven by route changes
pub struct RouteTransitionHost {
    state: RouteTransitionState,
    incoming: PageSlot,
    outgoing: Option<PageSlot>,
    config: PresenceConfig,
    factory: Box<dyn PageFactory>,
}

impl RouteTransitionHost {
    /// Create the host with the initial page already present
    pub fn new(
        initial_key: impl Into<String>,
        config: PresenceConfig,
        factory: impl PageFactory + 'static,
    ) -> Self {
        let mut factory: Box<dyn PageFactory> = Box::new(factory);
        let key = initial_key.into();
        let mut scope = PageScope::new(key.clone());
        factory.mount(&key, &mut scope);
        tracing::debug!(%key, "initial page mounted");

        Self {
            state: RouteTransitionState {
                current_key: key,
                previous_key: None,
                phase: TransitionPhase::Stable,
            },
            incoming: PageSlot {
                scope,
                presence: Presence::entered(config),
            },
            outgoing: None,
            config,
            factory,
        }
    }

    pub fn state(&self) -> &RouteTransitionState {
        &self.state
    }

    pub fn current_key(&self) -> &str {
        &self.state.current_key
    }

    pub fn phase(&self) -> TransitionPhase {
        self.state.phase
    }

    pub fn is_stable(&self) -> bool {
        self.state.phase == TransitionPhase::Stable
    }

    /// The page that is (or is becoming) current
    pub fn current_page(&self) -> &PageSlot {
        &self.incoming
    }

    /// The page playing its exit animation, if any
    pub fn outgoing_page(&self) -> Option<&PageSlot> {
        self.outgoing.as_ref()
    }

    /// Number of page subtrees currently mounted (1 or 2)
    pub fn mounted_pages(&self) -> usize {
        1 + usize::from(self.outgoing.is_some())
    }

    /// The page that receives input whenever input is enabled
    pub fn interactive_page(&self) -> &PageSlot {
        &self.incoming
    }

    /// Whether routed input is enabled: both the exit and the enter
    /// animation of the last transition have completed
    pub fn input_enabled(&self) -> bool {
        self.is_stable()
    }

    /// Whether the page mounted under `key` accepts input right now
    pub fn is_interactable(&self, key: &str) -> bool {
        self.input_enabled() && self.incoming.key() == key
    }

    /// React to a router path change at `now_ms`
    pub fn navigate(&mut self, path: &str, now_ms: f64) -> NavigationOutcome {
        if path == self.state.current_key {
            return NavigationOutcome::Ignored;
        }

        let outcome = match self.outgoing.take() {
            Some(stale) => {
                let torn_down = stale.key().to_string();
                tracing::debug!(key = %torn_down, "stale outgoing page torn down");
                drop(stale);
                NavigationOutcome::Superseded {
                    torn_down: Some(torn_down),
                }
            }
            None if self.state.phase == TransitionPhase::Transitioning => {
                NavigationOutcome::Superseded { torn_down: None }
            }
            None => NavigationOutcome::Started {
                from: self.state.current_key.clone(),
            },
        };

        let mut scope = PageScope::new(path);
        self.factory.mount(path, &mut scope);
        let next = PageSlot {
            scope,
            presence: Presence::entering(self.config, now_ms),
        };

        let mut previous = std::mem::replace(&mut self.incoming, next);
        if previous.presence.exit(now_ms) == PresencePhase::Removed {
            tracing::debug!(key = %previous.key(), "outgoing page had no exit animation");
            drop(previous);
        } else {
            self.outgoing = Some(previous);
        }

        let from = std::mem::replace(&mut self.state.current_key, path.to_string());
        self.state.previous_key = Some(from);
        self.state.phase = TransitionPhase::Transitioning;
        tracing::debug!(to = %path, previous = ?self.state.previous_key, "route transition started");
        outcome
    }

    /// Advance both pages to `now_ms`
    pub fn tick(&mut self, now_ms: f64) -> SmallVec<[TransitionEvent; 2]> {
        let mut events = SmallVec::new();
        if self.state.phase == TransitionPhase::Stable {
            return events;
        }

        let was_entering = self.incoming.presence.phase() == PresencePhase::Entering;
        if self.incoming.presence.update(now_ms) == PresencePhase::Entered && was_entering {
            events.push(TransitionEvent::EnterComplete(self.state.current_key.clone()));
        }

        if let Some(outgoing) = self.outgoing.as_mut() {
            if outgoing.presence.update(now_ms) == PresencePhase::Removed {
                let key = outgoing.key().to_string();
                self.outgoing = None;
                tracing::debug!(%key, "outgoing page unmounted");
                events.push(TransitionEvent::OutgoingUnmounted(key));
            }
        }

        if self.outgoing.is_none() && self.incoming.presence.phase() == PresencePhase::Entered {
            self.state.phase = TransitionPhase::Stable;
            self.state.previous_key = None;
            tracing::debug!(key = %self.state.current_key, "route transition settled");
            events.push(TransitionEvent::Settled(self.state.current_key.clone()));
        }
        events
    }

    /// Opacity of the current page for rendering
    pub fn incoming_opacity(&self, now_ms: f64) -> f64 {
        self.incoming.presence.opacity(now_ms)
    }

    /// Opacity of the exiting page, if any
    pub fn outgoing_opacity(&self, now_ms: f64) -> Option<f64> {
        self.outgoing.as_ref().map(|p| p.presence.opacity(now_ms))
    }
}

impl fmt::Debug for RouteTransitionHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTransitionHost")
            .field("state", &self.state)
            .field("incoming", &self.incoming)
            .field("outgoing", &self.outgoing)
            .finish()
    }
}
