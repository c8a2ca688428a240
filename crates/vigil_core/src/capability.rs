//! Injected scroll capability
//!
//! Smooth-scroll-to-anchor and scroll reset are platform actions. Components
//! receive them as a capability instead of reaching into a global document,
//! so tests and headless runs can substitute their own.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::Result;

/// Platform scroll actions
pub trait ScrollCapability {
    /// Smooth-scroll to the element with the given anchor id
    fn scroll_to_anchor(&self, anchor: &str) -> Result<()>;

    /// Jump to the top of the document
    fn scroll_to_top(&self) -> Result<()>;
}

/// Capability that does nothing
#[derive(Debug, Default)]
pub struct NoopScroll;

impl ScrollCapability for NoopScroll {
    fn scroll_to_anchor(&self, _anchor: &str) -> Result<()> {
        Ok(())
    }

    fn scroll_to_top(&self) -> Result<()> {
        Ok(())
    }
}

/// A scroll action observed by [`RecordingScroll`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScrollAction {
    Anchor(String),
    Top,
}

/// Capability that records requested actions and knows a fixed set of anchors
#[derive(Clone, Debug, Default)]
pub struct RecordingScroll {
    anchors: Vec<String>,
    actions: Rc<RefCell<Vec<ScrollAction>>>,
}

impl RecordingScroll {
    pub fn with_anchors<I, S>(anchors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            anchors: anchors.into_iter().map(Into::into).collect(),
            actions: Rc::default(),
        }
    }

    pub fn actions(&self) -> Vec<ScrollAction> {
        self.actions.borrow().clone()
    }
}

impl ScrollCapability for RecordingScroll {
    fn scroll_to_anchor(&self, anchor: &str) -> Result<()> {
        if !self.anchors.iter().any(|a| a == anchor) {
            return Err(crate::error::IntegrationError::ScrollTargetMissing(
                anchor.to_string(),
            ));
        }
        self.actions
            .borrow_mut()
            .push(ScrollAction::Anchor(anchor.to_string()));
        Ok(())
    }

    fn scroll_to_top(&self) -> Result<()> {
        self.actions.borrow_mut().push(ScrollAction::Top);
        Ok(())
    }
}
