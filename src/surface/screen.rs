use std::sync::mpsc;

use crate::caps::context::ContextHandle;
use crate::caps::policy::OffscreenPolicy;
use crate::caps::probe::{Capabilities, probe};
use crate::composite::blitter::{BlitStats, CompositeBlitter, TextureQuad};
use crate::driver::api::{FramebufferId, GlDriver, TextureId};
use crate::foundation::core::{PixelRect, Rgba, RuntimeConstants, SurfaceSize};
use crate::foundation::error::{CompositeError, CompositeResult};
use crate::foundation::math::derive_samples;
use crate::framebuffer::lifecycle::{FramebufferLifecycleManager, decide_needs_offscreen};
use crate::surface::config::SurfaceConfig;
use crate::surface::host::{SurfaceHost, SurfaceRequest};

/// Swap interval for a target frame rate: no vsync above 60 fps, every vblank above 30, every
/// other vblank otherwise.
pub fn swap_interval_for(fps: f32) -> u32 {
    if fps > 60.0 {
        0
    } else if fps > 30.0 {
        1
    } else {
        2
    }
}

/// Windowing events that may originate off the render thread.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SurfaceEvent {
    ContextCreated(ContextHandle),
    Resized { width: u32, height: u32 },
    FrameRate(f32),
    /// Release GPU resources; the host drawable is left to its owner.
    Teardown,
}

/// Sender side for [`SurfaceEvent`]s, applied by the surface at its next [`Surface::update`].
#[derive(Clone, Debug)]
pub struct SurfaceEvents {
    tx: mpsc::Sender<SurfaceEvent>,
}

impl SurfaceEvents {
    /// Queue `event`. Returns `false` once the surface is gone.
    pub fn send(&self, event: SurfaceEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn context_created(&self, ctx: ContextHandle) -> bool {
        self.send(SurfaceEvent::ContextCreated(ctx))
    }

    pub fn resized(&self, width: u32, height: u32) -> bool {
        self.send(SurfaceEvent::Resized { width, height })
    }

    pub fn frame_rate(&self, fps: f32) -> bool {
        self.send(SurfaceEvent::FrameRate(fps))
    }

    pub fn teardown(&self) -> bool {
        self.send(SurfaceEvent::Teardown)
    }
}

/// One rendering surface: decides between direct and offscreen rendering, keeps the offscreen
/// set in step with size and context, and runs the per-frame bind/resolve/present.
///
/// All driver calls happen on the thread that owns the surface. Other threads talk to it through
/// [`Surface::events`].
pub struct Surface<D: GlDriver> {
    driver: D,
    config: SurfaceConfig,
    policy: Box<dyn OffscreenPolicy>,
    constants: RuntimeConstants,
    caps: Capabilities,
    ctx: ContextHandle,
    size: SurfaceSize,
    needs_offscreen: bool,
    fbs: FramebufferLifecycleManager,
    blitter: CompositeBlitter,
    events_tx: mpsc::Sender<SurfaceEvent>,
    events_rx: mpsc::Receiver<SurfaceEvent>,
    initialized: bool,
    needs_reinit: bool,
    frame_rate: f32,
    swap_dirty: bool,
    in_frame: bool,
}

impl<D: GlDriver> Surface<D> {
    pub fn new(driver: D, config: SurfaceConfig) -> CompositeResult<Self> {
        config.validate()?;
        let policy = config.policy();
        Ok(Self::with_policy(driver, config, policy))
    }

    /// Like [`Surface::new`] with a caller-supplied offscreen policy.
    pub fn with_policy(
        driver: D,
        config: SurfaceConfig,
        policy: Box<dyn OffscreenPolicy>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        let frame_rate = config.frame_rate;
        let caps = Capabilities::default();
        let needs_offscreen = decide_needs_offscreen(
            policy.as_ref(),
            &config.platform,
            config.antialias,
            &caps,
        );
        Self {
            driver,
            config,
            policy,
            constants: RuntimeConstants::detect(),
            caps,
            ctx: ContextHandle::Uninitialized,
            size: SurfaceSize::default(),
            needs_offscreen,
            fbs: FramebufferLifecycleManager::new(),
            blitter: CompositeBlitter::new(),
            events_tx,
            events_rx,
            initialized: false,
            needs_reinit: false,
            frame_rate,
            swap_dirty: true,
            in_frame: false,
        }
    }

    /// Decide whether the surface composites offscreen and ask `host` for a matching drawable.
    /// Calling it again recreates the drawable.
    pub fn initialize(&mut self, host: &mut dyn SurfaceHost) -> CompositeResult<SurfaceRequest> {
        self.needs_offscreen = decide_needs_offscreen(
            self.policy.as_ref(),
            &self.config.platform,
            self.config.antialias,
            &self.caps,
        );
        let request = SurfaceRequest::new(self.config.antialias, self.needs_offscreen);
        if self.initialized {
            host.recreate_surface(&request)?;
        } else {
            host.create_surface(&request)?;
        }
        tracing::debug!(
            offscreen = self.needs_offscreen,
            samples = request.samples,
            recreated = self.initialized,
            "surface initialized"
        );
        self.initialized = true;
        self.needs_reinit = false;
        Ok(request)
    }

    /// A driver context is current: re-probe, and drop the set if it belonged to another context.
    /// Reporting the context that is already current keeps the set.
    pub fn on_context_created(&mut self, ctx: ContextHandle) {
        if !self.ctx.same_live(ctx) {
            self.fbs.invalidate();
        }
        self.ctx = ctx;
        self.caps = probe(&self.driver);
        self.swap_dirty = true;
    }

    pub fn on_resized(&mut self, width: u32, height: u32) {
        self.size = SurfaceSize::new(width, height);
        self.fbs.destroy(&mut self.driver);
    }

    /// Release GPU resources and the host drawable.
    pub fn teardown(&mut self, host: &mut dyn SurfaceHost) {
        self.release();
        host.teardown_surface();
        self.initialized = false;
    }

    fn release(&mut self) {
        self.blitter.release(&mut self.driver, self.ctx);
        self.fbs.destroy(&mut self.driver);
    }

    pub fn events(&self) -> SurfaceEvents {
        SurfaceEvents {
            tx: self.events_tx.clone(),
        }
    }

    /// Apply queued events, the frame rate, and create the offscreen set when one is needed.
    pub fn update(&mut self) -> CompositeResult<()> {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                SurfaceEvent::ContextCreated(ctx) => self.on_context_created(ctx),
                SurfaceEvent::Resized { width, height } => self.on_resized(width, height),
                SurfaceEvent::FrameRate(fps) => {
                    if let Err(err) = self.set_frame_rate(fps) {
                        tracing::warn!(error = %err, "ignoring frame rate event");
                    }
                }
                SurfaceEvent::Teardown => self.release(),
            }
        }

        if self.swap_dirty && self.ctx.is_live() {
            self.driver
                .set_swap_interval(swap_interval_for(self.frame_rate));
            self.swap_dirty = false;
        }

        // Nothing can be allocated before the toolkit reports a context.
        if self.needs_offscreen && self.ctx.is_live() && !self.size.is_empty() {
            self.fbs.ensure_created(
                &mut self.driver,
                self.size.width,
                self.size.height,
                &self.caps,
                derive_samples(self.config.antialias),
                self.ctx,
            )?;
        }
        Ok(())
    }

    pub fn begin_frame(&mut self) -> CompositeResult<()> {
        self.update()?;
        self.blitter.begin_frame(&mut self.driver, &mut self.fbs);
        self.in_frame = true;
        Ok(())
    }

    pub fn end_frame(&mut self) {
        self.blitter
            .end_frame(&mut self.driver, &mut self.fbs, self.size, self.ctx);
        self.in_frame = false;
    }

    /// Run `draw` between [`Surface::begin_frame`] and [`Surface::end_frame`].
    pub fn frame<R>(&mut self, draw: impl FnOnce(&mut Self) -> R) -> CompositeResult<R> {
        self.begin_frame()?;
        let out = draw(self);
        self.end_frame();
        Ok(out)
    }

    /// Change the target frame rate. Crossing 60 fps in either direction needs a new drawable
    /// on some platforms and marks the surface for re-initialization.
    pub fn set_frame_rate(&mut self, fps: f32) -> CompositeResult<()> {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(CompositeError::config(format!(
                "frame rate must be a positive number, got {fps}"
            )));
        }
        if (self.frame_rate > 60.0) != (fps > 60.0) {
            self.needs_reinit = true;
        }
        self.frame_rate = fps;
        if self.ctx.is_live() {
            self.driver.set_swap_interval(swap_interval_for(fps));
            self.swap_dirty = false;
        } else {
            self.swap_dirty = true;
        }
        Ok(())
    }

    pub fn present_flat_color(&mut self, color: Rgba, rect: PixelRect) -> bool {
        self.blitter
            .present_flat_color(&mut self.driver, self.ctx, self.size, color, rect)
    }

    pub fn draw_texture(&mut self, quad: &TextureQuad) -> bool {
        self.blitter
            .draw_texture(&mut self.driver, self.ctx, self.size, quad)
    }

    pub fn bind_color_for_read(&mut self) -> Option<FramebufferId> {
        self.blitter
            .bind_color_for_read(&mut self.driver, &mut self.fbs)
    }

    pub fn sample_color(&mut self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.blitter.sample_color(&mut self.driver, self.size, x, y)
    }

    pub fn sample_depth(&mut self, x: u32, y: u32) -> Option<f32> {
        self.blitter.sample_depth(&mut self.driver, self.size, x, y)
    }

    pub fn sample_stencil(&mut self, x: u32, y: u32) -> Option<u8> {
        self.blitter.sample_stencil(&mut self.driver, self.size, x, y)
    }

    pub fn is_single_buffered(&self) -> bool {
        self.fbs.is_single_buffered()
    }

    pub fn is_fbo_backed(&self) -> bool {
        self.fbs.is_fbo_backed()
    }

    pub fn fbo_width(&self) -> u32 {
        self.fbs.width()
    }

    pub fn fbo_height(&self) -> u32 {
        self.fbs.height()
    }

    pub fn color_texture(&self) -> Option<TextureId> {
        self.fbs.color_texture()
    }

    pub fn screen_framebuffer(&self) -> Option<FramebufferId> {
        self.fbs.screen_framebuffer()
    }

    pub fn framebuffers(&self) -> &FramebufferLifecycleManager {
        &self.fbs
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    pub fn constants(&self) -> &RuntimeConstants {
        &self.constants
    }

    pub fn context(&self) -> ContextHandle {
        self.ctx
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn needs_offscreen(&self) -> bool {
        self.needs_offscreen
    }

    pub fn needs_reinit(&self) -> bool {
        self.needs_reinit
    }

    pub fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    pub fn in_frame(&self) -> bool {
        self.in_frame
    }

    pub fn blit_stats(&self) -> BlitStats {
        self.blitter.stats()
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}

#[cfg(test)]
#[path = "../../tests/unit/surface/screen.rs"]
mod tests;
