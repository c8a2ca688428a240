//! Scenario runner that drives the shell headlessly.
//!
//! Time comes from a [`ManualClock`] advanced one frame at a time, so a
//! scenario produces the same report on every run.

use std::rc::Rc;

use anyhow::Result;
use vigil_animation::ManualClock;
use vigil_core::{KeyCode, ManualSource, Point, Rect, RecordingScroll, RecordingSink, RevealController};

use crate::config::VigilConfig;
use crate::headless_assert::{
    evaluate_assert_analytics, evaluate_assert_counter, evaluate_assert_overlay,
    evaluate_assert_route, evaluate_assert_stable, AssertionResult, ShellSnapshot,
};
use crate::headless_report::{HeadlessReport, RunProgress};
use crate::headless_runtime::{HeadlessContext, HeadlessRunConfig, HeadlessRuntime};
use crate::headless_scenario::{HeadlessScenario, ScenarioStep};
use crate::pages::{PAGES, SERVICES_ANCHOR};
use crate::shell::{AppShell, ShellServices, MISSION_BRIEF, MOBILE_MENU};

/// Final outcome of a scenario run.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Passed { report: HeadlessReport },
    Failed { report: HeadlessReport },
}

impl RunOutcome {
    pub fn report(&self) -> &HeadlessReport {
        match self {
            RunOutcome::Passed { report } => report,
            RunOutcome::Failed { report } => report,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RunOutcome::Failed { .. })
    }
}

/// Execute scenario JSON against a fresh shell.
pub fn run_scenario(
    input: &str,
    config: &VigilConfig,
    runtime_cfg: HeadlessRunConfig,
) -> Result<RunOutcome> {
    let scenario = HeadlessScenario::from_json(input)?;
    run_loaded_scenario(&scenario, config, runtime_cfg)
}

/// Execute a pre-loaded scenario against a fresh shell.
pub fn run_loaded_scenario(
    scenario: &HeadlessScenario,
    config: &VigilConfig,
    runtime_cfg: HeadlessRunConfig,
) -> Result<RunOutcome> {
    runtime_cfg.validate()?;

    let clock = ManualClock::shared();
    let services = ShellServices::new(
        clock.clone(),
        RevealController::new(ManualSource, config.reveal.fallback),
    )
    .with_analytics(RecordingSink::new())
    .with_scroll(RecordingScroll::with_anchors(known_anchors()));
    let mut shell = AppShell::new(config.clone(), services, &scenario.initial_route);
    let mut progress = RunProgress::default();

    for (step_index, step) in scenario.steps.iter().enumerate() {
        tracing::debug!(step_index, step = step.name(), "scenario step");
        let check = match step {
            ScenarioStep::Navigate { path } => {
                let outcome = shell.navigate(path);
                tracing::debug!(?outcome, %path, "navigated");
                None
            }
            ScenarioStep::Wait { ms } => {
                HeadlessRuntime::run_for(runtime_cfg, *ms, |ctx| {
                    run_frame(&mut shell, &clock, &mut progress, ctx)
                })?;
                None
            }
            ScenarioStep::Tick { frames } => {
                HeadlessRuntime::run(runtime_cfg, *frames, |ctx| {
                    run_frame(&mut shell, &clock, &mut progress, ctx)
                })?;
                None
            }
            ScenarioStep::Visibility { section, fraction } => {
                shell.report_visibility(section, *fraction);
                None
            }
            ScenarioStep::PointerDown { x, y } => {
                shell.pointer_down(Point::new(*x, *y));
                None
            }
            ScenarioStep::Key { key } => {
                let code = KeyCode::from_name(key);
                if code == KeyCode::UNKNOWN {
                    tracing::warn!(%key, "unmapped key name");
                }
                shell.key_down(code);
                None
            }
            ScenarioStep::OpenMissionBrief { bounds } => {
                let bounds = bounds.map_or_else(
                    || runtime_cfg.modal_bounds(),
                    |b| Rect::new(b.x, b.y, b.width, b.height),
                );
                shell.set_overlay_bounds(MISSION_BRIEF, bounds);
                shell.open_mission_brief();
                None
            }
            ScenarioStep::ToggleMenu => {
                shell.set_overlay_bounds(MOBILE_MENU, runtime_cfg.drawer_bounds());
                shell.toggle_mobile_menu();
                None
            }
            ScenarioStep::Contact => {
                shell.contact_command();
                None
            }
            ScenarioStep::InitiateProtocol => {
                shell.initiate_protocol();
                None
            }
            ScenarioStep::AssertRoute { path } => Some(evaluate_assert_route(
                path,
                &ShellSnapshot::capture(&shell),
            )),
            ScenarioStep::AssertOverlay { id, open } => Some(evaluate_assert_overlay(
                id,
                *open,
                &ShellSnapshot::capture(&shell),
            )),
            ScenarioStep::AssertCounter { stat, value } => Some(evaluate_assert_counter(
                stat,
                *value,
                &ShellSnapshot::capture(&shell),
            )),
            ScenarioStep::AssertStable => {
                Some(evaluate_assert_stable(&ShellSnapshot::capture(&shell)))
            }
            ScenarioStep::AssertAnalytics { count } => Some(evaluate_assert_analytics(
                *count,
                &ShellSnapshot::capture(&shell),
            )),
        };

        if let Some(AssertionResult::Failed { message, .. }) = check {
            tracing::info!(step_index, assertion = step.name(), %message, "scenario failed");
            let report = HeadlessReport::failed(
                step.name(),
                step_index,
                message,
                finish(progress, &shell),
            );
            return Ok(RunOutcome::Failed { report });
        }
    }

    Ok(RunOutcome::Passed {
        report: HeadlessReport::passed(finish(progress, &shell)),
    })
}

fn run_frame(
    shell: &mut AppShell,
    clock: &Rc<ManualClock>,
    progress: &mut RunProgress,
    ctx: &HeadlessContext,
) {
    clock.advance(ctx.step_ms as f64);
    for event in shell.frame() {
        tracing::trace!(frame = ctx.frame_index, ?event, "transition event");
    }
    progress.elapsed_frames = progress.elapsed_frames.saturating_add(1);
    progress.elapsed_ms = progress.elapsed_ms.saturating_add(ctx.step_ms);
}

fn finish(mut progress: RunProgress, shell: &AppShell) -> RunProgress {
    progress.final_route = shell.current_route().to_string();
    progress.analytics_emitted = shell.analytics_emitted();
    progress
}

/// Every section id on every page is a valid scroll anchor
fn known_anchors() -> Vec<&'static str> {
    let mut anchors: Vec<&'static str> = PAGES
        .iter()
        .flat_map(|p| p.sections.iter().copied())
        .collect();
    anchors.push(SERVICES_ANCHOR);
    anchors.sort_unstable();
    anchors.dedup();
    anchors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(input: &str) -> RunOutcome {
        run_scenario(input, &VigilConfig::default(), HeadlessRunConfig::default()).unwrap()
    }

    #[test]
    fn test_empty_scenario_passes() {
        let outcome = run(r#"{"steps": []}"#);
        assert!(!outcome.is_failed());
        assert_eq!(outcome.report().final_route, "/");
        assert_eq!(outcome.report().elapsed_frames, 0);
    }

    #[test]
    fn test_counter_reaches_target() {
        let outcome = run(
            r#"{"steps": [
                {"type": "visibility", "section": "stats", "fraction": 0.5},
                {"type": "wait", "ms": 1000},
                {"type": "assert_counter", "stat": "incidents", "value": 509},
                {"type": "wait", "ms": 1100},
                {"type": "assert_counter", "stat": "incidents", "value": 543}
            ]}"#,
        );
        assert!(!outcome.is_failed(), "{:?}", outcome.report());
        assert_eq!(outcome.report().elapsed_ms, 2100);
    }

    #[test]
    fn test_failed_assertion_reports_step() {
        let outcome = run(
            r#"{"steps": [
                {"type": "navigate", "path": "/about"},
                {"type": "assert_stable"}
            ]}"#,
        );
        assert!(outcome.is_failed());
        let report = outcome.report();
        assert_eq!(report.failed_step_index, Some(1));
        assert_eq!(report.assertion.as_deref(), Some("assert_stable"));
        assert_eq!(report.final_route, "/about");
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(run_scenario("{", &VigilConfig::default(), HeadlessRunConfig::default()).is_err());
    }
}
