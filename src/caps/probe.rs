use crate::driver::api::{GlDriver, IntegerQuery, StringQuery};

/// What the active driver context can do for the compositing path.
///
/// Extension sets are context-scoped: probe again whenever the context is recreated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    /// Extended profile present (multisample storage, framebuffer blit entry points).
    pub extended_profile: bool,
    pub multisample_supported: bool,
    pub packed_depth_stencil_supported: bool,
    pub non_power_of_two_supported: bool,
    /// Highest usable sample count; `1` when multisampling is unavailable.
    pub max_samples: u32,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            extended_profile: false,
            multisample_supported: false,
            packed_depth_stencil_supported: false,
            non_power_of_two_supported: false,
            max_samples: 1,
        }
    }
}

/// Query the driver. Pure, never fails: anything missing reports `false` / `1`.
#[tracing::instrument(skip(driver))]
pub fn probe(driver: &dyn GlDriver) -> Capabilities {
    let extensions = driver.get_string(StringQuery::Extensions);
    let has = |needle: &str| extensions.split_whitespace().any(|ext| ext.contains(needle));

    let extended_profile = driver.has_extended_profile();
    let multisample_supported = extended_profile && has("framebuffer_multisample");
    let max_samples = if multisample_supported {
        u32::try_from(driver.get_integer(IntegerQuery::MaxSamples))
            .unwrap_or(1)
            .max(1)
    } else {
        1
    };

    let caps = Capabilities {
        extended_profile,
        multisample_supported,
        packed_depth_stencil_supported: has("packed_depth_stencil"),
        non_power_of_two_supported: has("texture_non_power_of_two"),
        max_samples,
    };
    tracing::debug!(?caps, "probed driver capabilities");
    caps
}

#[cfg(test)]
#[path = "../../tests/unit/caps/probe.rs"]
mod tests;
