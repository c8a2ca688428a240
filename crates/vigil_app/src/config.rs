//! Vigil configuration file handling

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use vigil_animation::PresenceConfig;
use vigil_core::RevealFallback;

/// Default file name looked up next to the site
pub const CONFIG_FILE: &str = "vigil.toml";

/// Top-level Vigil configuration (vigil.toml)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct VigilConfig {
    #[serde(default)]
    pub counter: CounterConfig,
    #[serde(default)]
    pub reveal: RevealConfig,
    #[serde(default)]
    pub transition: TransitionConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Stats counter timing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CounterConfig {
    /// Count-up duration in milliseconds
    #[serde(default = "default_counter_duration")]
    pub duration_ms: f64,
}

fn default_counter_duration() -> f64 {
    2000.0
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_counter_duration(),
        }
    }
}

/// Viewport reveal behavior
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RevealConfig {
    /// Visible fraction that counts as "in view"
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    /// What to do when visibility cannot be observed
    #[serde(default)]
    pub fallback: RevealFallback,
}

fn default_threshold() -> f32 {
    0.3
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            fallback: RevealFallback::default(),
        }
    }
}

/// Route cross-fade timing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TransitionConfig {
    #[serde(default = "default_enter")]
    pub enter_ms: f64,
    #[serde(default = "default_exit")]
    pub exit_ms: f64,
}

fn default_enter() -> f64 {
    500.0
}

fn default_exit() -> f64 {
    300.0
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            enter_ms: default_enter(),
            exit_ms: default_exit(),
        }
    }
}

impl TransitionConfig {
    pub fn presence(&self) -> PresenceConfig {
        PresenceConfig::new(self.enter_ms, self.exit_ms)
    }
}

/// Modal and drawer behavior
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OverlayConfig {
    #[serde(default = "default_true")]
    pub modal_dismissible: bool,
    #[serde(default = "default_true")]
    pub drawer_dismissible: bool,
    /// Enter duration shared by the modal and the drawer
    #[serde(default = "default_overlay_ms", alias = "modal_enter_ms")]
    pub enter_ms: f64,
    /// Exit duration shared by the modal and the drawer
    #[serde(default = "default_overlay_ms", alias = "modal_exit_ms")]
    pub exit_ms: f64,
}

fn default_true() -> bool {
    true
}

fn default_overlay_ms() -> f64 {
    200.0
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            modal_dismissible: true,
            drawer_dismissible: true,
            enter_ms: default_overlay_ms(),
            exit_ms: default_overlay_ms(),
        }
    }
}

impl OverlayConfig {
    pub fn presence(&self) -> PresenceConfig {
        PresenceConfig::new(self.enter_ms, self.exit_ms)
    }
}

/// Log output
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl VigilConfig {
    /// Load configuration from a file or a directory containing vigil.toml.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let config_path = if path.is_dir() {
            path.join(CONFIG_FILE)
        } else {
            path.to_path_buf()
        };

        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: VigilConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engines cannot honor
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.reveal.threshold) {
            bail!(
                "reveal.threshold must be within 0.0..=1.0, got {}",
                self.reveal.threshold
            );
        }
        let durations = [
            ("counter.duration_ms", self.counter.duration_ms),
            ("transition.enter_ms", self.transition.enter_ms),
            ("transition.exit_ms", self.transition.exit_ms),
            ("overlay.enter_ms", self.overlay.enter_ms),
            ("overlay.exit_ms", self.overlay.exit_ms),
        ];
        for (name, value) in durations {
            if !value.is_finite() || value < 0.0 {
                bail!("{name} must be a non-negative number of milliseconds, got {value}");
            }
        }
        Ok(())
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config = VigilConfig::from_toml_str("").unwrap();
        assert_eq!(config, VigilConfig::default());
        assert_eq!(config.counter.duration_ms, 2000.0);
        assert_eq!(config.reveal.threshold, 0.3);
        assert_eq!(config.reveal.fallback, RevealFallback::Skip);
        assert_eq!(config.transition.enter_ms, 500.0);
        assert_eq!(config.transition.exit_ms, 300.0);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_partial_sections() {
        let config = VigilConfig::from_toml_str(
            r#"
            [reveal]
            fallback = "reveal_immediately"

            [overlay]
            modal_dismissible = false
            "#,
        )
        .unwrap();
        assert_eq!(config.reveal.fallback, RevealFallback::RevealImmediately);
        assert_eq!(config.reveal.threshold, 0.3);
        assert!(!config.overlay.modal_dismissible);
        assert!(config.overlay.drawer_dismissible);
    }

    #[test]
    fn test_overlay_timings_apply_to_both_kinds() {
        let config = VigilConfig::from_toml_str("[overlay]
enter_ms = 120
exit_ms = 80").unwrap();
        let presence = config.overlay.presence();
        assert_eq!((presence.enter_ms, presence.exit_ms), (120.0, 80.0));

        let legacy = VigilConfig::from_toml_str("[overlay]
modal_enter_ms = 150").unwrap();
        assert_eq!(legacy.overlay.enter_ms, 150.0);
        assert_eq!(legacy.overlay.exit_ms, 200.0);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        assert!(VigilConfig::from_toml_str("[reveal]\nthreshold = 1.5").is_err());
        assert!(VigilConfig::from_toml_str("[counter]\nduration_ms = -1.0").is_err());
        assert!(VigilConfig::from_toml_str("[reveal]\nfallback = \"sometimes\"").is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = VigilConfig::default();
        config.transition.exit_ms = 0.0;
        let text = config.to_toml().unwrap();
        assert_eq!(VigilConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_load_missing_and_malformed() {
        let dir = std::env::temp_dir().join(format!("vigil-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let missing = dir.join("absent.toml");
        assert_eq!(VigilConfig::load(&missing).unwrap(), VigilConfig::default());

        fs::write(dir.join(CONFIG_FILE), "[counter]\nduration_ms = 1500.0\n").unwrap();
        assert_eq!(VigilConfig::load(&dir).unwrap().counter.duration_ms, 1500.0);

        let broken = dir.join("broken.toml");
        fs::write(&broken, "[counter\n").unwrap();
        let err = VigilConfig::load(&broken).unwrap_err();
        assert!(format!("{err}").contains("Failed to parse"));

        fs::remove_dir_all(&dir).unwrap();
    }
}
