//! Element presence lifecycle
//!
//! An explicit `entering → entered → exiting → removed` state machine for a
//! single element. When an element leaves the tree it can play an exit
//! animation before its resources are released, without blocking anything
//! else. Time comes from the caller, so the same machine runs under the frame
//! scheduler, a headless runner, or a test.
//!
//! Progress is linear in time (0.0 absent, 1.0 fully present); presentation
//! values such as opacity apply the configured [`Easing`] on top.

use crate::easing::Easing;

/// Lifecycle phase of a present (or departing) element
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PresencePhase {
    #[default]
    Entering,
    Entered,
    Exiting,
    /// Terminal; the element must be remounted to appear again
    Removed,
}

/// Enter/exit timing for an element
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PresenceConfig {
    pub enter_ms: f64,
    pub exit_ms: f64,
    pub easing: Easing,
}

impl PresenceConfig {
    pub fn new(enter_ms: f64, exit_ms: f64) -> Self {
        Self {
            enter_ms,
            exit_ms,
            easing: Easing::EaseOut,
        }
    }

    /// No enter or exit animation
    pub fn instant() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self::new(300.0, 200.0)
    }
}

/// Presence state of one element
#[derive(Clone, Debug, PartialEq)]
pub struct Presence {
    phase: PresencePhase,
    config: PresenceConfig,
    /// When the current phase began
    phase_started_at: f64,
    /// Progress when the current phase began (for reversals)
    start_progress: f64,
}

impl Presence {
    /// Mount an element and begin its enter animation at `now_ms`
    pub fn entering(config: PresenceConfig, now_ms: f64) -> Self {
        let mut presence = Self {
            phase: PresencePhase::Entering,
            config,
            phase_started_at: now_ms,
            start_progress: 0.0,
        };
        presence.update(now_ms);
        presence
    }

    /// Mount an element that is already fully present
    pub fn entered(config: PresenceConfig) -> Self {
        Self {
            phase: PresencePhase::Entered,
            config,
            phase_started_at: 0.0,
            start_progress: 1.0,
        }
    }

    pub fn phase(&self) -> PresencePhase {
        self.phase
    }

    pub fn config(&self) -> &PresenceConfig {
        &self.config
    }

    /// Whether the element is still in the tree
    pub fn is_mounted(&self) -> bool {
        self.phase != PresencePhase::Removed
    }

    /// Linear presence progress at `now_ms`
    pub fn progress(&self, now_ms: f64) -> f64 {
        let elapsed = (now_ms - self.phase_started_at).max(0.0);
        match self.phase {
            PresencePhase::Entered => 1.0,
            PresencePhase::Removed => 0.0,
            PresencePhase::Entering => {
                if self.config.enter_ms <= 0.0 {
                    1.0
                } else {
                    (self.start_progress + elapsed / self.config.enter_ms).min(1.0)
                }
            }
            PresencePhase::Exiting => {
                if self.config.exit_ms <= 0.0 {
                    0.0
                } else {
                    (self.start_progress - elapsed / self.config.exit_ms).max(0.0)
                }
            }
        }
    }

    /// Eased opacity for rendering
    pub fn opacity(&self, now_ms: f64) -> f64 {
        self.config.easing.apply(self.progress(now_ms))
    }

    /// Advance phase transitions to `now_ms` and return the current phase
    pub fn update(&mut self, now_ms: f64) -> PresencePhase {
        match self.phase {
            PresencePhase::Entering if self.progress(now_ms) >= 1.0 => {
                self.set_phase(PresencePhase::Entered, now_ms, 1.0);
            }
            PresencePhase::Exiting if self.progress(now_ms) <= 0.0 => {
                self.set_phase(PresencePhase::Removed, now_ms, 0.0);
            }
            _ => {}
        }
        self.phase
    }

    /// Begin leaving the tree from wherever the element currently is
    pub fn exit(&mut self, now_ms: f64) -> PresencePhase {
        match self.phase {
            PresencePhase::Entering | PresencePhase::Entered => {
                let progress = self.progress(now_ms);
                self.set_phase(PresencePhase::Exiting, now_ms, progress);
                self.update(now_ms)
            }
            PresencePhase::Exiting | PresencePhase::Removed => self.phase,
        }
    }

    /// Return to the tree. An exiting element reverses from its current
    /// progress; a removed element stays removed.
    pub fn enter(&mut self, now_ms: f64) -> PresencePhase {
        if self.phase == PresencePhase::Exiting {
            let progress = self.progress(now_ms);
            self.set_phase(PresencePhase::Entering, now_ms, progress);
            return self.update(now_ms);
        }
        self.phase
    }

    /// Drop out of the tree immediately, skipping any exit animation
    pub fn remove_now(&mut self, now_ms: f64) {
        self.set_phase(PresencePhase::Removed, now_ms, 0.0);
    }

    fn set_phase(&mut self, phase: PresencePhase, now_ms: f64, progress: f64) {
        self.phase = phase;
        self.phase_started_at = now_ms;
        self.start_progress = progress;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_then_exit() {
        let mut presence = Presence::entering(PresenceConfig::new(100.0, 50.0), 0.0);
        assert_eq!(presence.phase(), PresencePhase::Entering);
        assert_eq!(presence.update(50.0), PresencePhase::Entering);
        assert!((presence.progress(50.0) - 0.5).abs() < 1e-9);
        assert_eq!(presence.update(100.0), PresencePhase::Entered);

        assert_eq!(presence.exit(200.0), PresencePhase::Exiting);
        assert_eq!(presence.update(240.0), PresencePhase::Exiting);
        assert_eq!(presence.update(250.0), PresencePhase::Removed);
        assert!(!presence.is_mounted());
    }

    #[test]
    fn test_instant_config_skips_animation() {
        let mut presence = Presence::entering(PresenceConfig::instant(), 10.0);
        assert_eq!(presence.phase(), PresencePhase::Entered);
        assert_eq!(presence.exit(20.0), PresencePhase::Removed);
    }

    #[test]
    fn test_exit_mid_enter_reverses_from_current_progress() {
        let mut presence = Presence::entering(PresenceConfig::new(100.0, 100.0), 0.0);
        presence.exit(40.0);
        assert!((presence.progress(40.0) - 0.4).abs() < 1e-9);
        // 0.4 of progress takes 40ms to unwind at the exit rate
        assert_eq!(presence.update(79.0), PresencePhase::Exiting);
        assert_eq!(presence.update(80.0), PresencePhase::Removed);
    }

    #[test]
    fn test_reenter_while_exiting() {
        let mut presence = Presence::entered(PresenceConfig::new(100.0, 100.0));
        presence.exit(0.0);
        presence.enter(30.0);
        assert_eq!(presence.phase(), PresencePhase::Entering);
        assert!((presence.progress(30.0) - 0.7).abs() < 1e-9);
        assert_eq!(presence.update(61.0), PresencePhase::Entered);
    }

    #[test]
    fn test_removed_is_terminal() {
        let mut presence = Presence::entered(PresenceConfig::instant());
        presence.remove_now(0.0);
        assert_eq!(presence.enter(10.0), PresencePhase::Removed);
        assert_eq!(presence.exit(10.0), PresencePhase::Removed);
        assert_eq!(presence.opacity(10.0), 0.0);
    }
}
