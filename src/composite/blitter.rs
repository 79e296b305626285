use crate::caps::context::ContextHandle;
use crate::driver::api::{
    Attachment, BufferMask, Capability, Filter, FramebufferId, FramebufferTarget, GlDriver,
    TextureId, TextureTarget, VertexAttrib,
};
use crate::foundation::core::{PixelRect, Rgba, SurfaceSize};
use crate::foundation::math::{flip_row, to_ndc};
use crate::framebuffer::lifecycle::FramebufferLifecycleManager;
use crate::shader::cache::{DrawPurpose, ShaderProgramCache};

/// Counters for the work done by a [`CompositeBlitter`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlitStats {
    /// Multisample → color framebuffer resolves.
    pub resolves: u64,
    /// Offscreen color buffer presented to the display target.
    pub presents: u64,
    pub flat_color_draws: u64,
    pub texture_draws: u64,
    /// Draws dropped for lack of a program or for empty geometry.
    pub skipped_draws: u64,
}

/// A region of a texture drawn onto a region of the surface.
///
/// `src` is in texels of a `texture_size` texture, `dst` in surface pixels with the origin at
/// the bottom-left, like the driver's window coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextureQuad {
    pub texture: TextureId,
    pub target: TextureTarget,
    pub texture_size: SurfaceSize,
    pub src: PixelRect,
    pub dst: PixelRect,
}

impl TextureQuad {
    /// Draw the `width × height` corner of `texture` over the same area of the surface.
    pub fn corner(texture: TextureId, texture_size: SurfaceSize, width: u32, height: u32) -> Self {
        let rect = PixelRect::of_size(width, height);
        Self {
            texture,
            target: TextureTarget::Texture2d,
            texture_size,
            src: rect,
            dst: rect,
        }
    }
}

/// Binds the render target of a frame, resolves and presents the offscreen color buffer, and
/// draws the helper quads.
#[derive(Debug, Default)]
pub struct CompositeBlitter {
    programs: ShaderProgramCache,
    stats: BlitStats,
}

impl CompositeBlitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> BlitStats {
        self.stats
    }

    pub fn programs(&self) -> &ShaderProgramCache {
        &self.programs
    }

    /// Delete the programs owned by `ctx`.
    pub fn release(&mut self, driver: &mut dyn GlDriver, ctx: ContextHandle) {
        self.programs.release(driver, ctx);
    }

    /// Bind the frame's render target: the multisample framebuffer when there is one, the color
    /// framebuffer otherwise. Without a set the display target stays bound.
    pub fn begin_frame(&mut self, driver: &mut dyn GlDriver, fbs: &mut FramebufferLifecycleManager) {
        let Some(set) = fbs.set() else { return };
        let (target, multisample) = match set.multi_fbo {
            Some(multi) => (multi, true),
            None => (set.color_fbo, false),
        };
        driver.bind_framebuffer(FramebufferTarget::Both, Some(target));
        driver.draw_buffer(Attachment::Color0);
        fbs.mark_bound(multisample);
    }

    /// Resolve the frame and present it on the display target. A no-op without a set.
    pub fn end_frame(
        &mut self,
        driver: &mut dyn GlDriver,
        fbs: &mut FramebufferLifecycleManager,
        surface: SurfaceSize,
        ctx: ContextHandle,
    ) {
        let Some(set) = fbs.set() else { return };
        let (color_fbo, multi_fbo, texture) = (set.color_fbo, set.multi_fbo, set.color_texture);
        let allocated = set.allocated();

        if let Some(multi) = multi_fbo {
            self.resolve(driver, multi, color_fbo, allocated);
        }

        driver.bind_framebuffer(FramebufferTarget::Both, None);
        driver.clear_depth(1.0);
        driver.clear_stencil(0);
        driver.clear(BufferMask::DEPTH_STENCIL);
        driver.disable(Capability::Blend);

        let quad = TextureQuad::corner(texture, allocated, surface.width, surface.height);
        if self.draw_quad(driver, ctx, surface, &quad) {
            self.stats.presents += 1;
        }

        driver.bind_framebuffer(FramebufferTarget::Both, Some(color_fbo));
        fbs.mark_bound(false);
    }

    /// Make the color buffer readable mid-frame: resolve if multisampled, bind the color
    /// framebuffer and force its alpha to opaque. Returns the bound framebuffer, `None` without a
    /// set.
    pub fn bind_color_for_read(
        &mut self,
        driver: &mut dyn GlDriver,
        fbs: &mut FramebufferLifecycleManager,
    ) -> Option<FramebufferId> {
        let set = fbs.set()?;
        let (color_fbo, multi_fbo, allocated) = (set.color_fbo, set.multi_fbo, set.allocated());
        if let Some(multi) = multi_fbo {
            self.resolve(driver, multi, color_fbo, allocated);
        }
        driver.bind_framebuffer(FramebufferTarget::Both, Some(color_fbo));
        driver.set_color_mask(false, false, false, true);
        driver.clear_color(Rgba::OPAQUE_BLACK);
        driver.clear(BufferMask::COLOR);
        driver.set_color_mask(true, true, true, true);
        fbs.mark_bound(false);
        Some(color_fbo)
    }

    fn resolve(
        &mut self,
        driver: &mut dyn GlDriver,
        from: FramebufferId,
        to: FramebufferId,
        size: SurfaceSize,
    ) {
        let rect = PixelRect::of_size(size.width, size.height);
        driver.bind_framebuffer(FramebufferTarget::Read, Some(from));
        driver.bind_framebuffer(FramebufferTarget::Draw, Some(to));
        driver.blit_framebuffer(rect, rect, BufferMask::COLOR, Filter::Nearest);
        self.stats.resolves += 1;
    }

    /// Fill `rect` (surface pixels, bottom-left origin) with `color` on whatever target is bound.
    pub fn present_flat_color(
        &mut self,
        driver: &mut dyn GlDriver,
        ctx: ContextHandle,
        surface: SurfaceSize,
        color: Rgba,
        rect: PixelRect,
    ) -> bool {
        if surface.is_empty() || rect.is_degenerate() {
            self.stats.skipped_draws += 1;
            return false;
        }
        let entry = self.programs.entry(driver, DrawPurpose::FlatColor, ctx);
        let (Some(program), Some(vertex_loc), Some(color_loc)) =
            (entry.handle().program(), entry.vertex_loc(), entry.color_loc())
        else {
            self.stats.skipped_draws += 1;
            return false;
        };

        let (x0, x1) = (to_ndc(rect.x0 as f32, surface.width), to_ndc(rect.x1 as f32, surface.width));
        let (y0, y1) = (to_ndc(rect.y0 as f32, surface.height), to_ndc(rect.y1 as f32, surface.height));
        let vertices = [x0, y0, x1, y0, x0, y1, x1, y1];

        let saved = DepthState::save(driver);
        driver.use_program(Some(program));
        driver.uniform_4f(color_loc, color.to_array());
        driver.draw_triangle_strip(
            &[VertexAttrib {
                location: vertex_loc,
                components: 2,
                stride: 2,
                offset: 0,
                data: &vertices,
            }],
            4,
        );
        driver.use_program(None);
        saved.restore(driver);

        self.stats.flat_color_draws += 1;
        true
    }

    /// Draw a textured quad on whatever target is bound.
    pub fn draw_texture(
        &mut self,
        driver: &mut dyn GlDriver,
        ctx: ContextHandle,
        surface: SurfaceSize,
        quad: &TextureQuad,
    ) -> bool {
        let drawn = self.draw_quad(driver, ctx, surface, quad);
        if drawn {
            self.stats.texture_draws += 1;
        }
        drawn
    }

    fn draw_quad(
        &mut self,
        driver: &mut dyn GlDriver,
        ctx: ContextHandle,
        surface: SurfaceSize,
        quad: &TextureQuad,
    ) -> bool {
        if surface.is_empty() || quad.texture_size.is_empty() || quad.dst.is_degenerate() {
            self.stats.skipped_draws += 1;
            return false;
        }
        let entry = self
            .programs
            .entry(driver, DrawPurpose::for_target(quad.target), ctx);
        let (Some(program), Some(vertex_loc), Some(texcoord_loc)) =
            (entry.handle().program(), entry.vertex_loc(), entry.texcoord_loc())
        else {
            self.stats.skipped_draws += 1;
            return false;
        };
        let sampler = entry.sampler_loc();

        let (sx0, sx1, sy0, sy1) = match quad.target {
            TextureTarget::Texture2d => {
                let (w, h) = (quad.texture_size.width as f32, quad.texture_size.height as f32);
                (
                    quad.src.x0 as f32 / w,
                    quad.src.x1 as f32 / w,
                    quad.src.y0 as f32 / h,
                    quad.src.y1 as f32 / h,
                )
            }
            TextureTarget::Rectangle => (
                quad.src.x0 as f32,
                quad.src.x1 as f32,
                quad.src.y0 as f32,
                quad.src.y1 as f32,
            ),
        };
        let (x0, x1) = (
            to_ndc(quad.dst.x0 as f32, surface.width),
            to_ndc(quad.dst.x1 as f32, surface.width),
        );
        let (y0, y1) = (
            to_ndc(quad.dst.y0 as f32, surface.height),
            to_ndc(quad.dst.y1 as f32, surface.height),
        );
        // x, y, s, t per corner
        let vertices = [
            x0, y0, sx0, sy0, //
            x1, y0, sx1, sy0, //
            x0, y1, sx0, sy1, //
            x1, y1, sx1, sy1,
        ];

        let saved = DepthState::save(driver);
        driver.use_program(Some(program));
        if let Some(sampler) = sampler {
            driver.uniform_1i(sampler, 0);
        }
        driver.active_texture(0);
        driver.bind_texture(quad.target, Some(quad.texture));
        driver.draw_triangle_strip(
            &[
                VertexAttrib {
                    location: vertex_loc,
                    components: 2,
                    stride: 4,
                    offset: 0,
                    data: &vertices,
                },
                VertexAttrib {
                    location: texcoord_loc,
                    components: 2,
                    stride: 4,
                    offset: 2,
                    data: &vertices,
                },
            ],
            4,
        );
        driver.bind_texture(quad.target, None);
        driver.use_program(None);
        saved.restore(driver);
        true
    }

    /// Color at `(x, y)` of the bound read target, `y` counted from the top.
    pub fn sample_color(
        &self,
        driver: &mut dyn GlDriver,
        surface: SurfaceSize,
        x: u32,
        y: u32,
    ) -> Option<[u8; 4]> {
        let row = readback_row(surface, x, y)?;
        Some(driver.read_color(x, row))
    }

    pub fn sample_depth(
        &self,
        driver: &mut dyn GlDriver,
        surface: SurfaceSize,
        x: u32,
        y: u32,
    ) -> Option<f32> {
        let row = readback_row(surface, x, y)?;
        Some(driver.read_depth(x, row))
    }

    pub fn sample_stencil(
        &self,
        driver: &mut dyn GlDriver,
        surface: SurfaceSize,
        x: u32,
        y: u32,
    ) -> Option<u8> {
        let row = readback_row(surface, x, y)?;
        Some(driver.read_stencil(x, row))
    }
}

fn readback_row(surface: SurfaceSize, x: u32, y: u32) -> Option<u32> {
    if !surface.contains(x, y) {
        return None;
    }
    flip_row(surface.height, y)
}

/// Depth test and depth writes, which overlay draws turn off and put back.
struct DepthState {
    test: bool,
    write: bool,
}

impl DepthState {
    fn save(driver: &mut dyn GlDriver) -> Self {
        let saved = Self {
            test: driver.is_enabled(Capability::DepthTest),
            write: driver.depth_mask_enabled(),
        };
        driver.disable(Capability::DepthTest);
        driver.set_depth_mask(false);
        saved
    }

    fn restore(self, driver: &mut dyn GlDriver) {
        if self.test {
            driver.enable(Capability::DepthTest);
        }
        driver.set_depth_mask(self.write);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composite/blitter.rs"]
mod tests;
