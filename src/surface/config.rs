use std::time::Duration;

use crate::caps::policy::{
    AlwaysOffscreen, LegacyMacPolicy, NeverOffscreen, OffscreenPolicy, PlatformInfo,
};
use crate::foundation::error::{CompositeError, CompositeResult};
use crate::schedule::scheduler::SchedulerOptions;

/// How a surface chooses between the display target and an offscreen set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffscreenMode {
    /// Ask the platform workaround policy.
    #[default]
    Auto,
    Always,
    Never,
}

/// Per-surface settings.
///
/// Every field has a default, so `{}` is a valid JSON configuration.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Requested antialiasing quality; the effective sample count is derived from it.
    pub antialias: u32,
    pub frame_rate: f32,
    pub offscreen: OffscreenMode,
    pub platform: PlatformInfo,
    /// Sample floor for the platform workaround (`Auto` mode).
    pub min_offscreen_samples: u32,
    /// Lowest `10.x` minor version the platform workaround applies to (`Auto` mode).
    pub min_platform_minor_version: u32,
    pub poll_interval_ms: u64,
    pub stop_grace_ms: u64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            antialias: 2,
            frame_rate: 60.0,
            offscreen: OffscreenMode::Auto,
            platform: PlatformInfo::detect(),
            min_offscreen_samples: 1,
            min_platform_minor_version: 6,
            poll_interval_ms: 1,
            stop_grace_ms: 20,
        }
    }
}

impl SurfaceConfig {
    pub fn from_json_str(s: &str) -> CompositeResult<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> CompositeResult<()> {
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return Err(CompositeError::config(format!(
                "frame_rate must be a positive number, got {}",
                self.frame_rate
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(CompositeError::config("poll_interval_ms must be > 0"));
        }
        Ok(())
    }

    pub fn policy(&self) -> Box<dyn OffscreenPolicy> {
        match self.offscreen {
            OffscreenMode::Auto => Box::new(LegacyMacPolicy {
                min_minor_version: self.min_platform_minor_version,
                min_samples: self.min_offscreen_samples,
            }),
            OffscreenMode::Always => Box::new(AlwaysOffscreen),
            OffscreenMode::Never => Box::new(NeverOffscreen),
        }
    }

    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            stop_grace: Duration::from_millis(self.stop_grace_ms),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/surface/config.rs"]
mod tests;
