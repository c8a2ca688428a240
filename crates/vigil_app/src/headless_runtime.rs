//! Headless runtime primitives for deterministic scenario execution.

use anyhow::{bail, Result};
use vigil_core::Rect;

/// Configuration for deterministic headless frame execution.
#[derive(Debug, Clone, Copy)]
pub struct HeadlessRunConfig {
    /// Logical viewport width used by the headless run.
    pub width: u32,
    /// Logical viewport height used by the headless run.
    pub height: u32,
    /// Logical milliseconds between frames.
    pub tick_ms: u64,
}

impl Default for HeadlessRunConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            tick_ms: 16,
        }
    }
}

impl HeadlessRunConfig {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            bail!("headless dimensions must be non-zero");
        }
        if self.tick_ms == 0 {
            bail!("headless tick_ms must be > 0");
        }
        Ok(())
    }

    /// Default mission-brief layout: centered, half the viewport
    pub fn modal_bounds(&self) -> Rect {
        let (w, h) = (self.width as f32, self.height as f32);
        Rect::new(w / 4.0, h / 4.0, w / 2.0, h / 2.0)
    }

    /// Default mobile drawer layout: a 320px panel on the right edge
    pub fn drawer_bounds(&self) -> Rect {
        let (w, h) = (self.width as f32, self.height as f32);
        let panel = w.min(320.0);
        Rect::new(w - panel, 0.0, panel, h)
    }
}

/// Frame context passed to headless frame callbacks.
#[derive(Debug, Clone, Copy)]
pub struct HeadlessContext {
    pub frame_index: u32,
    /// Logical time advanced by this frame
    pub step_ms: u64,
}

/// Deterministic headless runtime loop.
pub struct HeadlessRuntime;

impl HeadlessRuntime {
    /// Run `frames` frames of `tick_ms` each.
    pub fn run<F>(cfg: HeadlessRunConfig, frames: u32, on_frame: F) -> Result<()>
    where
        F: FnMut(&HeadlessContext),
    {
        Self::run_with_steps(cfg, frames, |_| cfg.tick_ms, on_frame)
    }

    /// Run enough frames to cover `ms`, the last one possibly shorter.
    pub fn run_for<F>(cfg: HeadlessRunConfig, ms: u64, on_frame: F) -> Result<()>
    where
        F: FnMut(&HeadlessContext),
    {
        let frames = wait_frames(ms, cfg.tick_ms);
        let mut remaining_ms = ms;
        Self::run_with_steps(
            cfg,
            frames,
            |_| {
                let step_ms = remaining_ms.min(cfg.tick_ms);
                remaining_ms = remaining_ms.saturating_sub(step_ms);
                step_ms
            },
            on_frame,
        )
    }

    fn run_with_steps<S, F>(
        cfg: HeadlessRunConfig,
        frames: u32,
        mut step_ms: S,
        mut on_frame: F,
    ) -> Result<()>
    where
        S: FnMut(u32) -> u64,
        F: FnMut(&HeadlessContext),
    {
        cfg.validate()?;
        for frame in 0..frames {
            on_frame(&HeadlessContext {
                frame_index: frame,
                step_ms: step_ms(frame),
            });
        }
        Ok(())
    }
}

fn wait_frames(wait_ms: u64, tick_ms: u64) -> u32 {
    if wait_ms == 0 {
        return 0;
    }
    let tick = tick_ms.max(1);
    let frames = wait_ms.saturating_add(tick.saturating_sub(1)) / tick;
    frames.min(u32::MAX as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_for_covers_partial_frame() {
        let mut steps = Vec::new();
        HeadlessRuntime::run_for(HeadlessRunConfig::default(), 40, |ctx| steps.push(ctx.step_ms))
            .unwrap();
        assert_eq!(steps, vec![16, 16, 8]);
    }

    #[test]
    fn test_zero_tick_is_rejected() {
        let cfg = HeadlessRunConfig {
            tick_ms: 0,
            ..HeadlessRunConfig::default()
        };
        assert!(HeadlessRuntime::run(cfg, 1, |_| {}).is_err());
    }

    #[test]
    fn test_default_layout() {
        let cfg = HeadlessRunConfig::default();
        assert_eq!(cfg.modal_bounds(), Rect::new(320.0, 180.0, 640.0, 360.0));
        assert_eq!(cfg.drawer_bounds(), Rect::new(960.0, 0.0, 320.0, 720.0));
    }
}
