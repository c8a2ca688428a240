//! Integration tests for the overlay stack and integration hooks
//!
//! These tests verify that:
//! - The mission-brief modal survives clicks inside its content and closes on
//!   a backdrop press or Escape
//! - Opening an already open singleton is a no-op
//! - The mobile drawer toggles through the shared stack from any caller
//! - Analytics failures never interrupt the interaction that triggered them

use vigil_core::{
    emit_best_effort, AnalyticsRecord, DismissOutcome, Event, KeyCode, OpenOutcome, OverlayKind,
    OverlayOptions, OverlayStack, Point, RecordingSink, Rect,
};

const BRIEF: &str = "mission-brief";
const MENU: &str = "mobile-menu";

fn brief_open() -> OverlayStack {
    let mut overlays = OverlayStack::new();
    assert_eq!(overlays.open(BRIEF, OverlayKind::Modal, true), OpenOutcome::Opened);
    overlays.set_content_bounds(BRIEF, Rect::new(200.0, 100.0, 600.0, 400.0));
    overlays
}

#[test]
fn test_mission_brief_inside_then_backdrop() {
    let mut overlays = brief_open();

    let mut inside = Event::pointer_down(Point::new(400.0, 300.0), 0.0);
    assert_eq!(
        overlays.handle_event(&mut inside),
        DismissOutcome::Contained { id: BRIEF.into() }
    );
    assert!(inside.propagation_stopped);
    assert!(overlays.is_open(BRIEF));

    let mut backdrop = Event::pointer_down(Point::new(20.0, 20.0), 16.0);
    assert_eq!(
        overlays.handle_event(&mut backdrop),
        DismissOutcome::Dismissed { id: BRIEF.into() }
    );
    assert!(!overlays.is_open(BRIEF));

    let log: Vec<bool> = overlays.changes().map(|c| c.open).collect();
    assert_eq!(log, vec![true, false]);
}

#[test]
fn test_open_twice_is_single_entry() {
    let mut overlays = brief_open();
    assert_eq!(
        overlays.open(BRIEF, OverlayKind::Modal, true),
        OpenOutcome::AlreadyOpen
    );
    assert_eq!(overlays.open_entries().count(), 1);
    assert_eq!(overlays.changes().count(), 1);
}

#[test]
fn test_escape_closes_only_topmost() {
    let mut overlays = brief_open();
    overlays.register(MENU, OverlayOptions::singleton(OverlayKind::Drawer, true));
    assert!(overlays.toggle(MENU));
    assert_eq!(overlays.topmost().map(|e| e.id.as_str()), Some(MENU));

    let mut escape = Event::key_down(KeyCode::ESCAPE, 0.0);
    assert_eq!(
        overlays.handle_event(&mut escape),
        DismissOutcome::Dismissed { id: MENU.into() }
    );
    assert!(overlays.is_open(BRIEF));

    let mut other = Event::key_down(KeyCode::ENTER, 0.0);
    assert_eq!(overlays.handle_event(&mut other), DismissOutcome::Ignored);
    assert!(!other.propagation_stopped);
}

#[test]
fn test_non_dismissible_modal_blocks_backdrop() {
    let mut overlays = OverlayStack::new();
    overlays.open(BRIEF, OverlayKind::Modal, false);
    overlays.set_content_bounds(BRIEF, Rect::new(0.0, 0.0, 10.0, 10.0));

    let mut backdrop = Event::pointer_down(Point::new(50.0, 50.0), 0.0);
    assert_eq!(
        overlays.handle_event(&mut backdrop),
        DismissOutcome::Blocked { id: BRIEF.into() }
    );
    assert!(backdrop.propagation_stopped);
    assert!(overlays.is_open(BRIEF));
}

#[test]
fn test_shared_stack_has_one_source_of_truth() {
    let shared = OverlayStack::shared();
    shared
        .borrow_mut()
        .register(MENU, OverlayOptions::singleton(OverlayKind::Drawer, true));

    let header = shared.clone();
    let drawer = shared.clone();
    assert!(header.borrow_mut().toggle(MENU));
    assert!(drawer.borrow().is_open(MENU));
    assert!(!drawer.borrow_mut().toggle(MENU));
    assert!(!header.borrow().is_open(MENU));
}

#[test]
fn test_failing_analytics_is_swallowed() {
    let sink = RecordingSink::failing("collector offline");
    assert!(!emit_best_effort(&sink, &AnalyticsRecord::contact_click()));
    assert!(sink.is_empty());

    let sink = RecordingSink::new();
    assert!(emit_best_effort(&sink, &AnalyticsRecord::contact_click()));
    assert_eq!(
        sink.records()[0].to_json(),
        r#"{"event":"lead_generation","lead_type":"contact_button_click"}"#
    );
}
