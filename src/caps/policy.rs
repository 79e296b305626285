use crate::caps::probe::Capabilities;

/// Operating system identity used by offscreen policies.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PlatformInfo {
    pub os_name: String,
    /// Dotted version string, e.g. `"10.8.5"`. May be empty when unknown.
    pub os_version: String,
}

impl PlatformInfo {
    pub fn new(os_name: impl Into<String>, os_version: impl Into<String>) -> Self {
        Self {
            os_name: os_name.into(),
            os_version: os_version.into(),
        }
    }

    /// Current OS name with an unknown version. The standard library has no portable
    /// version query, so hosts that care pass the version through configuration.
    pub fn detect() -> Self {
        Self::new(std::env::consts::OS, "")
    }

    pub fn is_macos(&self) -> bool {
        let name = self.os_name.to_ascii_lowercase();
        name == "macos" || name.starts_with("mac os")
    }

    /// `(major, minor)` parsed from the leading components of `os_version`.
    pub fn version(&self) -> Option<(u32, u32)> {
        let mut parts = self.os_version.split('.');
        let major = parts.next()?.trim().parse().ok()?;
        let minor = parts
            .next()
            .map_or(Some(0), |m| m.trim().parse().ok())?;
        Some((major, minor))
    }
}

/// Decides whether a surface must render through an offscreen buffer set instead of the
/// display's default target.
pub trait OffscreenPolicy: Send + Sync + std::fmt::Debug {
    /// `samples` is the effective sample count (see [`crate::derive_samples`]).
    fn needs_offscreen(&self, platform: &PlatformInfo, samples: u32, caps: &Capabilities) -> bool;
}

/// Workaround for macOS drivers that mis-render antialiased or resized default surfaces
/// (missing antialiasing from 10.7 on, flicker around pixel readback from 10.6 on).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LegacyMacPolicy {
    /// Lowest `10.x` minor version the workaround applies to. Any later major applies too.
    pub min_minor_version: u32,
    pub min_samples: u32,
}

impl Default for LegacyMacPolicy {
    fn default() -> Self {
        Self {
            min_minor_version: 6,
            min_samples: 1,
        }
    }
}

impl OffscreenPolicy for LegacyMacPolicy {
    fn needs_offscreen(&self, platform: &PlatformInfo, samples: u32, _caps: &Capabilities) -> bool {
        if !platform.is_macos() || samples < self.min_samples {
            return false;
        }
        match platform.version() {
            Some((major, minor)) => major > 10 || (major == 10 && minor >= self.min_minor_version),
            None => false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AlwaysOffscreen;

impl OffscreenPolicy for AlwaysOffscreen {
    fn needs_offscreen(&self, _: &PlatformInfo, _: u32, _: &Capabilities) -> bool {
        true
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NeverOffscreen;

impl OffscreenPolicy for NeverOffscreen {
    fn needs_offscreen(&self, _: &PlatformInfo, _: u32, _: &Capabilities) -> bool {
        false
    }
}

#[cfg(test)]
#[path = "../../tests/unit/caps/policy.rs"]
mod tests;
