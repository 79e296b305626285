//! glcompose is the screen-compositing layer between an application's drawing commands and a
//! graphics driver.
//!
//! Per rendering surface it decides whether frames go straight to the display's default target
//! or through an offscreen buffer set (for multisampling and platform display workarounds),
//! keeps that set in step with resizes and driver-context changes, and resolves and presents it
//! at the end of each frame with a few small cached shader programs.
//!
//! - Implement [`GlDriver`] for your driver binding, or use [`HeadlessDriver`]
//! - Build a [`Surface`] from a [`SurfaceConfig`] and a [`SurfaceHost`]
//! - Drive frames with [`Surface::frame`], optionally from a [`RenderScheduler`]
#![forbid(unsafe_code)]

mod foundation;

/// Capability probing, context identity and offscreen policies.
pub mod caps;
/// Per-frame bind, resolve and present.
pub mod composite;
/// The driver interface and its headless implementation.
pub mod driver;
/// Offscreen framebuffer set.
pub mod framebuffer;
/// Render-thread frame scheduling.
pub mod schedule;
/// Built-in shader programs.
pub mod shader;
/// Surface facade, configuration and windowing host.
pub mod surface;

pub use crate::foundation::core::{PixelRect, Rgba, RuntimeConstants, SurfaceSize};
pub use crate::foundation::error::{CompositeError, CompositeResult};
pub use crate::foundation::math::{derive_samples, flip_row, next_power_of_two, to_ndc};

pub use crate::caps::context::ContextHandle;
pub use crate::caps::policy::{
    AlwaysOffscreen, LegacyMacPolicy, NeverOffscreen, OffscreenPolicy, PlatformInfo,
};
pub use crate::caps::probe::{Capabilities, probe};
pub use crate::composite::blitter::{BlitStats, CompositeBlitter, TextureQuad};
pub use crate::driver::api::GlDriver;
pub use crate::driver::headless::{HeadlessDriver, HeadlessOpts, HeadlessStats};
pub use crate::framebuffer::lifecycle::{
    FramebufferLifecycleManager, FramebufferSet, FramebufferState, decide_needs_offscreen,
};
pub use crate::schedule::scheduler::{
    FrameRequester, RenderScheduler, SchedulerOptions, SchedulerStats,
};
pub use crate::shader::cache::{DrawPurpose, ProgramHandle, ShaderProgramCache};
pub use crate::surface::config::{OffscreenMode, SurfaceConfig};
pub use crate::surface::host::{RecordingHost, SurfaceHost, SurfaceRequest};
pub use crate::surface::screen::{Surface, SurfaceEvent, SurfaceEvents, swap_interval_for};
