//! Overlay stack
//!
//! One owned source of truth for which overlays (the mission-brief modal, the
//! mobile navigation drawer) are open. Every caller that can open or close an
//! overlay goes through the same [`OverlayStack`], usually shared as
//! [`SharedOverlayStack`].
//!
//! The stack tracks logical open/closed state only. Exit animations belong to
//! the presentation layer, which keeps content mounted until its own exit
//! finishes; the stack never reports `open` for an entry told to close.
//!
//! Entry order is z-order: the last open entry is topmost and is the only one
//! that receives pointer and escape dismissal.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::events::{event_types, Event, KeyCode, Rect};

/// Shared handle to the application's overlay stack
pub type SharedOverlayStack = Rc<RefCell<OverlayStack>>;

/// Maximum number of changes kept for diagnostics
const CHANGE_LOG_CAPACITY: usize = 64;

/// Overlay kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayKind {
    /// Centered dialog over a dimmed backdrop
    Modal,
    /// Edge panel, e.g. the mobile menu
    Drawer,
}

/// Options for opening an overlay entry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OverlayOptions {
    pub kind: OverlayKind,
    /// Backdrop clicks and escape close the entry
    pub dismissible: bool,
    /// At most one singleton entry of a kind is open at once
    pub singleton: bool,
}

impl OverlayOptions {
    pub fn singleton(kind: OverlayKind, dismissible: bool) -> Self {
        Self {
            kind,
            dismissible,
            singleton: true,
        }
    }
}

/// A known overlay and its logical state
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayEntry {
    pub id: String,
    pub kind: OverlayKind,
    pub open: bool,
    pub dismissible: bool,
    pub singleton: bool,
    /// Content boundary used for click-outside detection
    pub content_bounds: Option<Rect>,
}

/// Result of an `open` call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OpenOutcome {
    Opened,
    /// The entry was already open; nothing changed
    AlreadyOpen,
    /// Another singleton of the same kind is open
    Blocked { by: String },
}

impl OpenOutcome {
    /// Whether the entry is open after the call
    pub fn is_open(&self) -> bool {
        matches!(self, OpenOutcome::Opened | OpenOutcome::AlreadyOpen)
    }
}

/// Result of routing an input event through the stack
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DismissOutcome {
    /// No open overlay is interested in the event
    Ignored,
    /// The event originated inside the content boundary; propagation stopped
    Contained { id: String },
    /// The topmost entry was closed
    Dismissed { id: String },
    /// Backdrop or escape on an entry that cannot be dismissed
    Blocked { id: String },
}

/// A logged open/close transition
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverlayChange {
    pub id: String,
    pub open: bool,
}

/// Ordered set of overlay entries
#[derive(Debug, Default)]
pub struct OverlayStack {
    entries: SmallVec<[OverlayEntry; 4]>,
    changes: VecDeque<OverlayChange>,
}

impl OverlayStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedOverlayStack {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Make an entry known without opening it, so that `toggle` can open it.
    ///
    /// Returns `false` if the id is already registered.
    pub fn register(&mut self, id: impl Into<String>, options: OverlayOptions) -> bool {
        let id = id.into();
        if self.position(&id).is_some() {
            return false;
        }
        self.entries.push(OverlayEntry {
            id,
            kind: options.kind,
            open: false,
            dismissible: options.dismissible,
            singleton: options.singleton,
            content_bounds: None,
        });
        true
    }

    /// Open a singleton entry
    pub fn open(&mut self, id: &str, kind: OverlayKind, dismissible: bool) -> OpenOutcome {
        self.open_with(id, OverlayOptions::singleton(kind, dismissible))
    }

    /// Open an entry, moving it to the top of the stack
    pub fn open_with(&mut self, id: &str, options: OverlayOptions) -> OpenOutcome {
        let existing = self.position(id);
        if let Some(index) = existing {
            if self.entries[index].open {
                return OpenOutcome::AlreadyOpen;
            }
        }

        if options.singleton {
            let conflict = self.entries.iter().find(|e| {
                e.open && e.singleton && e.kind == options.kind && e.id != id
            });
            if let Some(other) = conflict {
                tracing::debug!(id, blocked_by = %other.id, "singleton overlay already open");
                return OpenOutcome::Blocked {
                    by: other.id.clone(),
                };
            }
        }

        let mut entry = match existing {
            Some(index) => self.entries.remove(index),
            None => OverlayEntry {
                id: id.to_string(),
                kind: options.kind,
                open: false,
                dismissible: options.dismissible,
                singleton: options.singleton,
                content_bounds: None,
            },
        };
        entry.open = true;
        entry.dismissible = options.dismissible;
        self.entries.push(entry);
        self.record(id, true);
        OpenOutcome::Opened
    }

    /// Close an entry. Returns `true` if it was open.
    pub fn close(&mut self, id: &str) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        let entry = &mut self.entries[index];
        if !entry.open {
            return false;
        }
        entry.open = false;
        self.record(id, false);
        true
    }

    /// Flip a registered entry. Returns the new open state.
    pub fn toggle(&mut self, id: &str) -> bool {
        let Some(index) = self.position(id) else {
            tracing::debug!(id, "toggle on unregistered overlay ignored");
            return false;
        };
        if self.entries[index].open {
            self.close(id);
            false
        } else {
            let entry = &self.entries[index];
            let options = OverlayOptions {
                kind: entry.kind,
                dismissible: entry.dismissible,
                singleton: entry.singleton,
            };
            self.open_with(id, options).is_open()
        }
    }

    pub fn is_open(&self, id: &str) -> bool {
        self.get(id).is_some_and(|e| e.open)
    }

    pub fn get(&self, id: &str) -> Option<&OverlayEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Record the laid-out content boundary of an entry
    pub fn set_content_bounds(&mut self, id: &str, bounds: Rect) {
        if let Some(index) = self.position(id) {
            self.entries[index].content_bounds = Some(bounds);
        }
    }

    /// The open entry that receives input
    pub fn topmost(&self) -> Option<&OverlayEntry> {
        self.entries.iter().rev().find(|e| e.open)
    }

    /// Open entries, bottom to top
    pub fn open_entries(&self) -> impl Iterator<Item = &OverlayEntry> {
        self.entries.iter().filter(|e| e.open)
    }

    /// Number of known entries, open or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent open/close transitions, oldest first
    pub fn changes(&self) -> impl Iterator<Item = &OverlayChange> {
        self.changes.iter()
    }

    /// Route an input event through the topmost open overlay
    pub fn handle_event(&mut self, event: &mut Event) -> DismissOutcome {
        match event.event_type {
            event_types::POINTER_DOWN => self.handle_pointer_down(event),
            event_types::KEY_DOWN => self.handle_key_down(event),
            _ => DismissOutcome::Ignored,
        }
    }

    /// Click-outside dismissal.
    ///
    /// A press inside the topmost entry's content stops propagation at the
    /// content boundary. A press on the backdrop closes the entry when it is
    /// dismissible.
    pub fn handle_pointer_down(&mut self, event: &mut Event) -> DismissOutcome {
        let Some(position) = event.position() else {
            return DismissOutcome::Ignored;
        };
        let Some(top) = self.topmost() else {
            return DismissOutcome::Ignored;
        };
        let id = top.id.clone();

        // Content not laid out yet: never dismiss on a guess
        let inside = top.content_bounds.map_or(true, |b| b.contains(position));
        if inside {
            event.stop_propagation();
            return DismissOutcome::Contained { id };
        }

        // The backdrop swallows the press either way
        event.stop_propagation();
        self.dismiss_topmost(id)
    }

    /// Escape dismissal, equivalent to a backdrop press
    pub fn handle_key_down(&mut self, event: &mut Event) -> DismissOutcome {
        if event.key() != Some(KeyCode::ESCAPE) {
            return DismissOutcome::Ignored;
        }
        let Some(top) = self.topmost() else {
            return DismissOutcome::Ignored;
        };
        let id = top.id.clone();
        event.stop_propagation();
        self.dismiss_topmost(id)
    }

    fn dismiss_topmost(&mut self, id: String) -> DismissOutcome {
        let dismissible = self.get(&id).is_some_and(|e| e.dismissible);
        if !dismissible {
            return DismissOutcome::Blocked { id };
        }
        self.close(&id);
        tracing::debug!(%id, "overlay dismissed");
        DismissOutcome::Dismissed { id }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    fn record(&mut self, id: &str, open: bool) {
        if self.changes.len() == CHANGE_LOG_CAPACITY {
            self.changes.pop_front();
        }
        self.changes.push_back(OverlayChange {
            id: id.to_string(),
            open,
        });
        tracing::debug!(id, open, "overlay state changed");
    }
}
