//! Scenario definition for headless site runs.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Sequence of headless steps run against a fresh shell.
#[derive(Debug, Clone, Deserialize)]
pub struct HeadlessScenario {
    /// Route on screen before the first step
    #[serde(default = "default_initial_route")]
    pub initial_route: String,
    pub steps: Vec<ScenarioStep>,
}

fn default_initial_route() -> String {
    "/".to_string()
}

impl HeadlessScenario {
    /// Load a scenario from JSON text.
    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Load a scenario from file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("Failed to parse scenario {}", path.display()))
    }
}

/// Content rectangle for an overlay, in viewport coordinates.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct BoundsSpec {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Actions and checks a scenario can perform.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Router path change
    Navigate { path: String },
    /// Let logical time pass, one frame per tick
    Wait { ms: u64 },
    Tick { frames: u32 },
    /// Visible fraction of a section on the current page
    Visibility { section: String, fraction: f32 },
    PointerDown { x: f32, y: f32 },
    /// Key press by DOM-style name, e.g. `"Escape"`
    Key { key: String },
    OpenMissionBrief {
        #[serde(default)]
        bounds: Option<BoundsSpec>,
    },
    ToggleMenu,
    Contact,
    InitiateProtocol,
    AssertRoute { path: String },
    AssertOverlay { id: String, open: bool },
    AssertCounter { stat: String, value: f64 },
    AssertStable,
    AssertAnalytics { count: usize },
}

impl ScenarioStep {
    /// Name used in reports
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioStep::Navigate { .. } => "navigate",
            ScenarioStep::Wait { .. } => "wait",
            ScenarioStep::Tick { .. } => "tick",
            ScenarioStep::Visibility { .. } => "visibility",
            ScenarioStep::PointerDown { .. } => "pointer_down",
            ScenarioStep::Key { .. } => "key",
            ScenarioStep::OpenMissionBrief { .. } => "open_mission_brief",
            ScenarioStep::ToggleMenu => "toggle_menu",
            ScenarioStep::Contact => "contact",
            ScenarioStep::InitiateProtocol => "initiate_protocol",
            ScenarioStep::AssertRoute { .. } => "assert_route",
            ScenarioStep::AssertOverlay { .. } => "assert_overlay",
            ScenarioStep::AssertCounter { .. } => "assert_counter",
            ScenarioStep::AssertStable => "assert_stable",
            ScenarioStep::AssertAnalytics { .. } => "assert_analytics",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_steps() {
        let scenario = HeadlessScenario::from_json(
            r#"{
                "steps": [
                    {"type": "navigate", "path": "/services"},
                    {"type": "wait", "ms": 600},
                    {"type": "open_mission_brief"},
                    {"type": "open_mission_brief", "bounds": {"x": 0, "y": 0, "width": 10, "height": 10}},
                    {"type": "toggle_menu"},
                    {"type": "key", "key": "Escape"},
                    {"type": "assert_counter", "stat": "incidents", "value": 543}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(scenario.initial_route, "/");
        assert_eq!(scenario.steps.len(), 7);
        assert!(matches!(
            &scenario.steps[0],
            ScenarioStep::Navigate { path } if path == "/services"
        ));
        assert!(matches!(
            scenario.steps[2],
            ScenarioStep::OpenMissionBrief { bounds: None }
        ));
        assert_eq!(scenario.steps[6].name(), "assert_counter");
    }

    #[test]
    fn test_unknown_step_is_rejected() {
        assert!(HeadlessScenario::from_json(r#"{"steps": [{"type": "teleport"}]}"#).is_err());
    }
}
