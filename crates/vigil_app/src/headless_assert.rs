//! Assertion helpers for headless scenario checks.

use rustc_hash::FxHashMap;

use crate::shell::AppShell;

/// Snapshot of shell-observable state used for headless assertions.
#[derive(Debug, Clone, Default)]
pub struct ShellSnapshot {
    pub route: String,
    pub stable: bool,
    pub open_overlays: Vec<String>,
    pub counters: FxHashMap<String, f64>,
    pub analytics_emitted: usize,
}

impl ShellSnapshot {
    pub fn capture(shell: &AppShell) -> Self {
        let open_overlays = shell
            .overlays()
            .borrow()
            .open_entries()
            .map(|e| e.id.clone())
            .collect();
        let counters = shell
            .stat_ids()
            .into_iter()
            .filter_map(|id| shell.counter_value(id).map(|v| (id.to_string(), v)))
            .collect();
        Self {
            route: shell.current_route().to_string(),
            stable: shell.is_stable(),
            open_overlays,
            counters,
            analytics_emitted: shell.analytics_emitted(),
        }
    }
}

/// Assertion result with structured failure details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssertionResult {
    Passed,
    Failed { code: String, message: String },
}

fn failed(code: &str, message: String) -> AssertionResult {
    AssertionResult::Failed {
        code: code.to_string(),
        message,
    }
}

pub fn evaluate_assert_route(expected: &str, snapshot: &ShellSnapshot) -> AssertionResult {
    if snapshot.route == expected {
        AssertionResult::Passed
    } else {
        failed(
            "route_mismatch",
            format!("expected route '{expected}', got '{}'", snapshot.route),
        )
    }
}

pub fn evaluate_assert_overlay(id: &str, open: bool, snapshot: &ShellSnapshot) -> AssertionResult {
    let is_open = snapshot.open_overlays.iter().any(|o| o == id);
    if is_open == open {
        AssertionResult::Passed
    } else {
        let state = |b: bool| if b { "open" } else { "closed" };
        failed(
            "overlay_state",
            format!("{id}: expected {}, got {}", state(open), state(is_open)),
        )
    }
}

pub fn evaluate_assert_counter(stat: &str, expected: f64, snapshot: &ShellSnapshot) -> AssertionResult {
    let Some(value) = snapshot.counters.get(stat) else {
        return failed(
            "missing_counter",
            format!("{stat}: no such counter on '{}'", snapshot.route),
        );
    };
    if *value == expected {
        AssertionResult::Passed
    } else {
        failed(
            "counter_mismatch",
            format!("{stat}: expected {expected}, got {value}"),
        )
    }
}

pub fn evaluate_assert_stable(snapshot: &ShellSnapshot) -> AssertionResult {
    if snapshot.stable {
        AssertionResult::Passed
    } else {
        failed(
            "transitioning",
            format!("route '{}' is still transitioning", snapshot.route),
        )
    }
}

pub fn evaluate_assert_analytics(expected: usize, snapshot: &ShellSnapshot) -> AssertionResult {
    if snapshot.analytics_emitted == expected {
        AssertionResult::Passed
    } else {
        failed(
            "analytics_count",
            format!(
                "expected {expected} analytics events, got {}",
                snapshot.analytics_emitted
            ),
        )
    }
}
