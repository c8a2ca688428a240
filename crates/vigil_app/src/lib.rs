//! Vigil Application Shell
//!
//! Boots the site engine from `vigil.toml`, wires the reveal controller,
//! frame scheduler, overlay stack and route transition host into one
//! [`AppShell`], and runs JSON scenarios against it headlessly.
//!
//! # Example
//!
//! ```rust
//! use vigil_app::{run_scenario, HeadlessRunConfig, VigilConfig};
//!
//! let outcome = run_scenario(
//!     r#"{"steps": [
//!         {"type": "open_mission_brief"},
//!         {"type": "key", "key": "Escape"},
//!         {"type": "assert_overlay", "id": "mission-brief", "open": false}
//!     ]}"#,
//!     &VigilConfig::default(),
//!     HeadlessRunConfig::default(),
//! )?;
//! assert!(!outcome.is_failed());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod headless_assert;
pub mod headless_report;
pub mod headless_runner;
pub mod headless_runtime;
pub mod headless_scenario;
pub mod logging;
pub mod pages;
pub mod shell;

pub use config::VigilConfig;
pub use headless_report::{HeadlessReport, ReportStatus};
pub use headless_runner::{run_loaded_scenario, run_scenario, RunOutcome};
pub use headless_runtime::HeadlessRunConfig;
pub use headless_scenario::{HeadlessScenario, ScenarioStep};
pub use logging::init_logging;
pub use shell::{AppShell, ShellServices, MISSION_BRIEF, MOBILE_MENU};
