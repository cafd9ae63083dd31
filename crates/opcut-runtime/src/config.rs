#![forbid(unsafe_code)]

//! Renderer configuration.

use std::time::Duration;

/// Environment variable overriding [`RendererConfig::max_fps`].
///
/// A positive integer sets the budget; `0`, `off` or `none` disable
/// throttling.
pub const MAX_FPS_ENV: &str = "OPCUT_MAX_FPS";

/// Default render budget in frames per second.
pub const DEFAULT_MAX_FPS: u32 = 30;

/// Renderer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererConfig {
    /// Maximum renders per second; `None` renders as soon as state changes.
    pub max_fps: Option<u32>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_fps: Some(DEFAULT_MAX_FPS),
        }
    }
}

impl RendererConfig {
    #[must_use]
    pub fn with_max_fps(mut self, fps: u32) -> Self {
        self.max_fps = (fps > 0).then_some(fps);
        self
    }

    #[must_use]
    pub fn without_throttle(mut self) -> Self {
        self.max_fps = None;
        self
    }

    /// Defaults, with `OPCUT_MAX_FPS` applied when set.
    #[must_use]
    pub fn from_env() -> Self {
        let raw = std::env::var(MAX_FPS_ENV).ok();
        Self::default().with_env_value(raw.as_deref())
    }

    fn with_env_value(self, raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim) else {
            return self;
        };
        match parse_max_fps(raw) {
            Some(max_fps) => Self { max_fps },
            None => {
                tracing::warn!(value = raw, "ignoring invalid {MAX_FPS_ENV}");
                self
            }
        }
    }

    /// Minimum time between two renders.
    #[must_use]
    pub fn frame_interval(&self) -> Option<Duration> {
        self.max_fps
            .filter(|fps| *fps > 0)
            .map(|fps| Duration::from_secs_f64(1.0 / f64::from(fps)))
    }
}

/// `Some(None)` disables throttling, `Some(Some(n))` sets it, `None` is
/// unparseable.
fn parse_max_fps(raw: &str) -> Option<Option<u32>> {
    if ["0", "off", "none"].iter().any(|v| raw.eq_ignore_ascii_case(v)) {
        return Some(None);
    }
    raw.parse::<u32>().ok().map(Some)
}
