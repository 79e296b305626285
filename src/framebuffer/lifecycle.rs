use crate::caps::context::ContextHandle;
use crate::caps::policy::{OffscreenPolicy, PlatformInfo};
use crate::caps::probe::Capabilities;
use crate::driver::api::{
    Attachment, BufferMask, Filter, FramebufferId, FramebufferTarget, GlDriver,
    RenderbufferFormat, RenderbufferId, TextureId, TextureTarget,
};
use crate::foundation::core::{Rgba, SurfaceSize};
use crate::foundation::error::{CompositeError, CompositeResult};
use crate::foundation::math::{derive_samples, next_power_of_two};

/// Whether a surface asking for `requested_antialias` must composite through an offscreen set.
pub fn decide_needs_offscreen(
    policy: &dyn OffscreenPolicy,
    platform: &PlatformInfo,
    requested_antialias: u32,
    caps: &Capabilities,
) -> bool {
    policy.needs_offscreen(platform, derive_samples(requested_antialias), caps)
}

/// Lifecycle of the offscreen set.
///
/// `Destroyed` behaves like `Uninitialized` for the next [`FramebufferLifecycleManager::ensure_created`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FramebufferState {
    #[default]
    Uninitialized,
    Created,
    /// The multisample framebuffer is the current render target.
    BoundMultisample,
    /// The color framebuffer is the current render target.
    BoundColor,
    Destroyed,
}

/// Depth/stencil storage of a set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DepthStencil {
    /// `DEPTH24_STENCIL8` attached to both depth and stencil.
    Packed(RenderbufferId),
    /// `DEPTH_COMPONENT24` on the depth attachment only.
    DepthOnly(RenderbufferId),
}

impl DepthStencil {
    pub fn renderbuffer(self) -> RenderbufferId {
        match self {
            Self::Packed(id) | Self::DepthOnly(id) => id,
        }
    }
}

/// Offscreen buffer set backing one surface.
#[derive(Debug)]
pub struct FramebufferSet {
    pub(crate) color_texture: TextureId,
    pub(crate) color_fbo: FramebufferId,
    pub(crate) multi_fbo: Option<FramebufferId>,
    pub(crate) color_renderbuffer: Option<RenderbufferId>,
    pub(crate) depth_stencil: DepthStencil,
    pub(crate) requested: SurfaceSize,
    pub(crate) requested_samples: u32,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) samples: u32,
    pub(crate) owner: ContextHandle,
}

impl FramebufferSet {
    pub fn color_texture(&self) -> TextureId {
        self.color_texture
    }

    pub fn color_framebuffer(&self) -> FramebufferId {
        self.color_fbo
    }

    pub fn multisample_framebuffer(&self) -> Option<FramebufferId> {
        self.multi_fbo
    }

    pub fn depth_stencil(&self) -> DepthStencil {
        self.depth_stencil
    }

    /// Size the set was requested for.
    pub fn requested(&self) -> SurfaceSize {
        self.requested
    }

    /// Allocated size, at least the requested size.
    pub fn allocated(&self) -> SurfaceSize {
        SurfaceSize::new(self.width, self.height)
    }

    /// Effective sample count after clamping; `1` when single-sampled.
    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn is_multisample(&self) -> bool {
        self.multi_fbo.is_some()
    }

    pub fn packed_depth_stencil(&self) -> bool {
        matches!(self.depth_stencil, DepthStencil::Packed(_))
    }

    pub fn owner(&self) -> ContextHandle {
        self.owner
    }
}

#[derive(Clone, Copy, Debug)]
enum Created {
    Texture(TextureId),
    Framebuffer(FramebufferId),
    Renderbuffer(RenderbufferId),
}

struct SetObjects {
    color_texture: TextureId,
    color_fbo: FramebufferId,
    multi_fbo: Option<FramebufferId>,
    color_renderbuffer: Option<RenderbufferId>,
    depth_stencil: DepthStencil,
}

/// Everything allocated during one creation attempt, so a failure can release it.
#[derive(Default)]
struct Allocations(Vec<Created>);

impl Allocations {
    fn release(self, driver: &mut dyn GlDriver) {
        driver.bind_framebuffer(FramebufferTarget::Both, None);
        driver.bind_renderbuffer(None);
        for obj in self.0.into_iter().rev() {
            match obj {
                Created::Texture(id) => driver.delete_texture(id),
                Created::Framebuffer(id) => driver.delete_framebuffer(id),
                Created::Renderbuffer(id) => driver.delete_renderbuffer(id),
            }
        }
    }
}

/// Owns the offscreen buffer set of one surface and tracks which context it belongs to.
#[derive(Debug, Default)]
pub struct FramebufferLifecycleManager {
    set: Option<FramebufferSet>,
    state: FramebufferState,
}

impl FramebufferLifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure a set of `width × height` with `samples` exists for `ctx`.
    ///
    /// A no-op when the current set already matches. A set owned by another live context is
    /// forgotten without driver calls; a set of another size is destroyed first. On failure
    /// everything allocated by this call is released again and no set remains.
    #[tracing::instrument(skip(self, driver, caps))]
    pub fn ensure_created(
        &mut self,
        driver: &mut dyn GlDriver,
        width: u32,
        height: u32,
        caps: &Capabilities,
        samples: u32,
        ctx: ContextHandle,
    ) -> CompositeResult<()> {
        let requested = SurfaceSize::new(width, height);
        let samples = derive_samples(samples);

        if let Some(set) = &self.set {
            if set.owner != ctx {
                tracing::debug!(old = ?set.owner, "context changed, forgetting framebuffer set");
                self.invalidate();
            } else if set.requested == requested && set.requested_samples == samples {
                return Ok(());
            } else {
                self.destroy(driver);
            }
        }

        if samples > 1 && !(caps.extended_profile && caps.multisample_supported) {
            return Err(CompositeError::MultisampleUnsupported);
        }
        let effective = if samples > caps.max_samples {
            let clamped = derive_samples(caps.max_samples);
            tracing::warn!(
                requested = samples,
                max = caps.max_samples,
                clamped,
                "sample count above driver limit, clamping"
            );
            clamped
        } else {
            samples
        };

        let (tex_w, tex_h) = if caps.non_power_of_two_supported {
            (width.max(1), height.max(1))
        } else {
            match (next_power_of_two(width), next_power_of_two(height)) {
                (Some(w), Some(h)) => (w, h),
                _ => {
                    return Err(CompositeError::config(format!(
                        "{width}x{height} has no power-of-two texture size"
                    )));
                }
            }
        };

        let mut allocs = Allocations::default();
        match Self::allocate(driver, &mut allocs, tex_w, tex_h, effective, caps) {
            Ok(objects) => {
                tracing::debug!(
                    width = tex_w,
                    height = tex_h,
                    samples = effective,
                    packed = matches!(objects.depth_stencil, DepthStencil::Packed(_)),
                    "created framebuffer set"
                );
                self.set = Some(FramebufferSet {
                    color_texture: objects.color_texture,
                    color_fbo: objects.color_fbo,
                    multi_fbo: objects.multi_fbo,
                    color_renderbuffer: objects.color_renderbuffer,
                    depth_stencil: objects.depth_stencil,
                    requested,
                    requested_samples: samples,
                    width: tex_w,
                    height: tex_h,
                    samples: effective,
                    owner: ctx,
                });
                self.state = FramebufferState::Created;
                Ok(())
            }
            Err(err) => {
                allocs.release(driver);
                self.state = FramebufferState::Destroyed;
                Err(err)
            }
        }
    }

    fn allocate(
        driver: &mut dyn GlDriver,
        allocs: &mut Allocations,
        width: u32,
        height: u32,
        samples: u32,
        caps: &Capabilities,
    ) -> CompositeResult<SetObjects> {
        let multisample = samples > 1;

        let color_texture = driver.create_texture()?;
        allocs.0.push(Created::Texture(color_texture));
        driver.bind_texture(TextureTarget::Texture2d, Some(color_texture));
        driver.set_texture_sampling(TextureTarget::Texture2d, Filter::Nearest);
        driver.tex_image_2d(TextureTarget::Texture2d, width, height);
        driver.bind_texture(TextureTarget::Texture2d, None);

        let color_fbo = driver.create_framebuffer()?;
        allocs.0.push(Created::Framebuffer(color_fbo));
        driver.bind_framebuffer(FramebufferTarget::Both, Some(color_fbo));
        driver.framebuffer_texture_2d(Attachment::Color0, TextureTarget::Texture2d, color_texture);
        validate(driver)?;

        let (multi_fbo, color_renderbuffer, depth_stencil) = if multisample {
            let multi_fbo = driver.create_framebuffer()?;
            allocs.0.push(Created::Framebuffer(multi_fbo));
            driver.bind_framebuffer(FramebufferTarget::Both, Some(multi_fbo));

            let color_rb = driver.create_renderbuffer()?;
            allocs.0.push(Created::Renderbuffer(color_rb));
            driver.bind_renderbuffer(Some(color_rb));
            driver.renderbuffer_storage(RenderbufferFormat::Rgba8, samples, width, height);
            driver.framebuffer_renderbuffer(Attachment::Color0, color_rb);

            let depth_stencil =
                attach_depth_stencil(driver, allocs, samples, width, height, caps)?;
            validate(driver)?;
            clear_all(driver);

            driver.bind_framebuffer(FramebufferTarget::Both, Some(color_fbo));
            (Some(multi_fbo), Some(color_rb), depth_stencil)
        } else {
            let depth_stencil = attach_depth_stencil(driver, allocs, 0, width, height, caps)?;
            validate(driver)?;
            (None, None, depth_stencil)
        };

        driver.bind_renderbuffer(None);
        clear_all(driver);
        Ok(SetObjects {
            color_texture,
            color_fbo,
            multi_fbo,
            color_renderbuffer,
            depth_stencil,
        })
    }

    /// Delete every resource of the current set.
    pub fn destroy(&mut self, driver: &mut dyn GlDriver) {
        let Some(set) = self.set.take() else { return };
        if let Some(multi) = set.multi_fbo {
            driver.delete_framebuffer(multi);
        }
        driver.delete_framebuffer(set.color_fbo);
        if let Some(rb) = set.color_renderbuffer {
            driver.delete_renderbuffer(rb);
        }
        driver.delete_renderbuffer(set.depth_stencil.renderbuffer());
        driver.delete_texture(set.color_texture);
        self.state = FramebufferState::Destroyed;
        tracing::debug!(width = set.width, height = set.height, "destroyed framebuffer set");
    }

    /// Forget the set without touching the driver. Use when the owning context is gone.
    pub fn invalidate(&mut self) {
        self.set = None;
        self.state = FramebufferState::Uninitialized;
    }

    pub(crate) fn mark_bound(&mut self, multisample: bool) {
        if self.set.is_some() {
            self.state = if multisample {
                FramebufferState::BoundMultisample
            } else {
                FramebufferState::BoundColor
            };
        }
    }

    pub fn set(&self) -> Option<&FramebufferSet> {
        self.set.as_ref()
    }

    pub fn state(&self) -> FramebufferState {
        self.state
    }

    /// No offscreen set: drawing goes straight to the display target.
    pub fn is_single_buffered(&self) -> bool {
        self.set.is_none()
    }

    pub fn is_fbo_backed(&self) -> bool {
        self.set.is_some()
    }

    /// Allocated width, `0` without a set.
    pub fn width(&self) -> u32 {
        self.set.as_ref().map_or(0, |s| s.width)
    }

    pub fn height(&self) -> u32 {
        self.set.as_ref().map_or(0, |s| s.height)
    }

    pub fn color_texture(&self) -> Option<TextureId> {
        self.set.as_ref().map(|s| s.color_texture)
    }

    pub fn texture_target(&self) -> TextureTarget {
        TextureTarget::Texture2d
    }

    /// Framebuffer the drawing pipeline treats as the screen. `None` is the display target.
    pub fn screen_framebuffer(&self) -> Option<FramebufferId> {
        let set = self.set.as_ref()?;
        match self.state {
            FramebufferState::BoundMultisample => set.multi_fbo.or(Some(set.color_fbo)),
            _ => Some(set.color_fbo),
        }
    }
}

fn validate(driver: &dyn GlDriver) -> CompositeResult<()> {
    let status = driver.check_framebuffer_status();
    if status.is_complete() {
        Ok(())
    } else {
        Err(CompositeError::FramebufferIncomplete(status))
    }
}

fn attach_depth_stencil(
    driver: &mut dyn GlDriver,
    allocs: &mut Allocations,
    samples: u32,
    width: u32,
    height: u32,
    caps: &Capabilities,
) -> CompositeResult<DepthStencil> {
    let rb = driver.create_renderbuffer()?;
    allocs.0.push(Created::Renderbuffer(rb));
    driver.bind_renderbuffer(Some(rb));
    if caps.packed_depth_stencil_supported {
        driver.renderbuffer_storage(RenderbufferFormat::Depth24Stencil8, samples, width, height);
        driver.framebuffer_renderbuffer(Attachment::Depth, rb);
        driver.framebuffer_renderbuffer(Attachment::Stencil, rb);
        Ok(DepthStencil::Packed(rb))
    } else {
        driver.renderbuffer_storage(RenderbufferFormat::DepthComponent24, samples, width, height);
        driver.framebuffer_renderbuffer(Attachment::Depth, rb);
        Ok(DepthStencil::DepthOnly(rb))
    }
}

fn clear_all(driver: &mut dyn GlDriver) {
    driver.clear_color(Rgba::TRANSPARENT);
    driver.clear_depth(1.0);
    driver.clear_stencil(0);
    driver.clear(BufferMask::ALL);
}

#[cfg(test)]
#[path = "../../tests/unit/framebuffer/lifecycle.rs"]
mod tests;
