//! In-process implementation of [`GlDriver`].
//!
//! The headless driver keeps the same object tables a real driver does (textures, framebuffers,
//! renderbuffers, shaders, programs, bindings) and checks framebuffer completeness the same way,
//! but stores pixels with a *uniform-fill* model: every image holds a single color, depth and
//! stencil value, and every clear, blit or draw covers the whole target. That is enough to observe
//! which buffer ended up holding which content after a frame, and it makes the driver usable both
//! as a null backend and as a test double (allocation counters, failure injection).

use std::collections::HashMap;
use std::num::NonZeroU32;

use crate::caps::context::ContextHandle;
use crate::driver::api::{
    Attachment, BufferMask, Capability, Filter, FramebufferId, FramebufferStatus,
    FramebufferTarget, GlDriver, IntegerQuery, ProgramId, RenderbufferFormat, RenderbufferId,
    ShaderId, ShaderStage, StringQuery, TextureId, TextureTarget, UniformLocation, VertexAttrib,
};
use crate::foundation::core::{PixelRect, Rgba};
use crate::foundation::error::{CompositeError, CompositeResult};

/// Static description of the simulated driver.
#[derive(Clone, Debug)]
pub struct HeadlessOpts {
    /// Space-separated extension list reported for [`StringQuery::Extensions`].
    pub extensions: String,
    pub extended_profile: bool,
    pub max_samples: i32,
}

impl Default for HeadlessOpts {
    fn default() -> Self {
        Self {
            extensions: [
                "GL_ARB_texture_non_power_of_two",
                "GL_EXT_packed_depth_stencil",
                "GL_EXT_framebuffer_object",
                "GL_EXT_framebuffer_multisample",
                "GL_EXT_framebuffer_blit",
            ]
            .join(" "),
            extended_profile: true,
            max_samples: 8,
        }
    }
}

impl HeadlessOpts {
    /// A minimal driver: no extensions, no extended profile, single-sampled only.
    pub fn minimal() -> Self {
        Self {
            extensions: String::new(),
            extended_profile: false,
            max_samples: 1,
            ..Self::default()
        }
    }
}

/// Contents of one image under the uniform-fill model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fill {
    pub color: [u8; 4],
    pub depth: f32,
    pub stencil: u8,
}

impl Default for Fill {
    fn default() -> Self {
        Self {
            color: [0; 4],
            depth: 1.0,
            stencil: 0,
        }
    }
}

/// Counters for allocations and work submitted to the headless driver.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeadlessStats {
    pub textures_created: u64,
    pub framebuffers_created: u64,
    pub renderbuffers_created: u64,
    pub shaders_created: u64,
    pub programs_created: u64,
    pub shader_compiles: u64,
    pub program_links: u64,
    pub objects_deleted: u64,
    pub clears: u64,
    pub blits: u64,
    pub draws: u64,
}

impl HeadlessStats {
    /// Native allocations of framebuffer-set resources (textures, framebuffers, renderbuffers).
    pub fn buffer_allocations(&self) -> u64 {
        self.textures_created + self.framebuffers_created + self.renderbuffers_created
    }
}

/// Arguments of the most recent framebuffer blit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlitRecord {
    pub read: Option<FramebufferId>,
    pub draw: Option<FramebufferId>,
    pub src: PixelRect,
    pub dst: PixelRect,
    pub mask: BufferMask,
    pub filter: Filter,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Image {
    Texture(TextureId),
    Renderbuffer(RenderbufferId),
}

struct TextureObj {
    size: Option<(u32, u32)>,
    fill: Fill,
}

struct RenderbufferObj {
    format: Option<RenderbufferFormat>,
    samples: u32,
    size: (u32, u32),
    fill: Fill,
}

#[derive(Default)]
struct FramebufferObj {
    color: Option<Image>,
    depth: Option<Image>,
    stencil: Option<Image>,
}

struct ShaderObj {
    stage: ShaderStage,
    source: String,
    compiled: bool,
    log: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ProgramKind {
    FlatColor,
    Textured(TextureTarget),
    Other,
}

struct ProgramObj {
    shaders: Vec<ShaderId>,
    linked: bool,
    kind: ProgramKind,
    log: String,
    attribs: Vec<String>,
    uniforms: Vec<String>,
    values: HashMap<u32, [f32; 4]>,
}

/// Headless [`GlDriver`].
pub struct HeadlessDriver {
    opts: HeadlessOpts,
    context: ContextHandle,
    next_name: u32,

    textures: HashMap<TextureId, TextureObj>,
    framebuffers: HashMap<FramebufferId, FramebufferObj>,
    renderbuffers: HashMap<RenderbufferId, RenderbufferObj>,
    shaders: HashMap<ShaderId, ShaderObj>,
    programs: HashMap<ProgramId, ProgramObj>,

    default_fill: Fill,
    read_fbo: Option<FramebufferId>,
    draw_fbo: Option<FramebufferId>,
    bound_2d: Option<TextureId>,
    bound_rect: Option<TextureId>,
    bound_renderbuffer: Option<RenderbufferId>,
    current_program: Option<ProgramId>,

    clear_color: Rgba,
    clear_depth: f32,
    clear_stencil: u8,
    color_mask: [bool; 4],
    depth_mask: bool,
    blend: bool,
    depth_test: bool,
    swap_interval: u32,

    fail_compile: bool,
    fail_link: bool,
    forced_status: Option<FramebufferStatus>,

    stats: HeadlessStats,
    last_blit: Option<BlitRecord>,
}

impl Default for HeadlessDriver {
    fn default() -> Self {
        Self::new(HeadlessOpts::default())
    }
}

impl HeadlessDriver {
    pub fn new(opts: HeadlessOpts) -> Self {
        Self {
            opts,
            context: ContextHandle::fresh(),
            next_name: 0,
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            renderbuffers: HashMap::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
            default_fill: Fill::default(),
            read_fbo: None,
            draw_fbo: None,
            bound_2d: None,
            bound_rect: None,
            bound_renderbuffer: None,
            current_program: None,
            clear_color: Rgba::TRANSPARENT,
            clear_depth: 1.0,
            clear_stencil: 0,
            color_mask: [true; 4],
            depth_mask: true,
            blend: false,
            depth_test: false,
            swap_interval: 1,
            fail_compile: false,
            fail_link: false,
            forced_status: None,
            stats: HeadlessStats::default(),
            last_blit: None,
        }
    }

    /// Identity of the simulated context.
    pub fn context(&self) -> ContextHandle {
        self.context
    }

    /// Simulate context loss and recreation: every object and binding is gone and a new
    /// context identity is returned. Object names keep increasing across contexts.
    pub fn recreate_context(&mut self) -> ContextHandle {
        self.textures.clear();
        self.framebuffers.clear();
        self.renderbuffers.clear();
        self.shaders.clear();
        self.programs.clear();
        self.default_fill = Fill::default();
        self.read_fbo = None;
        self.draw_fbo = None;
        self.bound_2d = None;
        self.bound_rect = None;
        self.bound_renderbuffer = None;
        self.current_program = None;
        self.context = ContextHandle::fresh();
        self.context
    }

    pub fn stats(&self) -> &HeadlessStats {
        &self.stats
    }

    pub fn last_blit(&self) -> Option<BlitRecord> {
        self.last_blit
    }

    pub fn set_fail_shader_compile(&mut self, fail: bool) {
        self.fail_compile = fail;
    }

    pub fn set_fail_program_link(&mut self, fail: bool) {
        self.fail_link = fail;
    }

    /// Report `status` for every framebuffer-object completeness check until cleared.
    pub fn force_framebuffer_status(&mut self, status: Option<FramebufferStatus>) {
        self.forced_status = status;
    }

    /// Textures, framebuffers, renderbuffers, shaders and programs currently alive.
    pub fn live_objects(&self) -> usize {
        self.textures.len()
            + self.framebuffers.len()
            + self.renderbuffers.len()
            + self.shaders.len()
            + self.programs.len()
    }

    pub fn has_framebuffer(&self, framebuffer: FramebufferId) -> bool {
        self.framebuffers.contains_key(&framebuffer)
    }

    pub fn has_texture(&self, texture: TextureId) -> bool {
        self.textures.contains_key(&texture)
    }

    pub fn bound_framebuffer(&self, target: FramebufferTarget) -> Option<FramebufferId> {
        match target {
            FramebufferTarget::Read => self.read_fbo,
            FramebufferTarget::Both | FramebufferTarget::Draw => self.draw_fbo,
        }
    }

    /// Allocated size of a texture, if it has storage.
    pub fn texture_size(&self, texture: TextureId) -> Option<(u32, u32)> {
        self.textures.get(&texture).and_then(|t| t.size)
    }

    /// Contents of the default display target.
    pub fn display_fill(&self) -> Fill {
        self.default_fill
    }

    pub fn swap_interval(&self) -> u32 {
        self.swap_interval
    }

    fn alloc_name(&mut self) -> CompositeResult<NonZeroU32> {
        self.next_name = self
            .next_name
            .checked_add(1)
            .ok_or_else(|| CompositeError::driver("object name space exhausted"))?;
        NonZeroU32::new(self.next_name)
            .ok_or_else(|| CompositeError::driver("object name space exhausted"))
    }

    fn fill_mut(&mut self, image: Image) -> Option<&mut Fill> {
        match image {
            Image::Texture(id) => self.textures.get_mut(&id).map(|t| &mut t.fill),
            Image::Renderbuffer(id) => self.renderbuffers.get_mut(&id).map(|r| &mut r.fill),
        }
    }

    fn fill_of(&self, image: Image) -> Option<Fill> {
        match image {
            Image::Texture(id) => self.textures.get(&id).map(|t| t.fill),
            Image::Renderbuffer(id) => self.renderbuffers.get(&id).map(|r| r.fill),
        }
    }

    /// Images behind the color/depth/stencil slots of a framebuffer binding.
    fn slots(&self, framebuffer: Option<FramebufferId>) -> [Option<Image>; 3] {
        match framebuffer.and_then(|id| self.framebuffers.get(&id)) {
            Some(fb) => [fb.color, fb.depth, fb.stencil],
            None => [None; 3],
        }
    }

    fn read_fill(&self) -> Fill {
        let Some(id) = self.read_fbo else {
            return self.default_fill;
        };
        let [color, depth, stencil] = self.slots(Some(id));
        let mut out = Fill::default();
        if let Some(f) = color.and_then(|i| self.fill_of(i)) {
            out.color = f.color;
        }
        if let Some(f) = depth.and_then(|i| self.fill_of(i)) {
            out.depth = f.depth;
        }
        if let Some(f) = stencil.and_then(|i| self.fill_of(i)) {
            out.stencil = f.stencil;
        }
        out
    }

    fn write_color(&mut self, color: [u8; 4], masked: bool) {
        let mask = if masked { self.color_mask } else { [true; 4] };
        let apply = |dst: &mut Fill| {
            for (c, (&src, &m)) in dst.color.iter_mut().zip(color.iter().zip(mask.iter())) {
                if m {
                    *c = src;
                }
            }
        };
        match self.draw_fbo {
            None => apply(&mut self.default_fill),
            Some(id) => {
                let [slot, _, _] = self.slots(Some(id));
                if let Some(fill) = slot.and_then(|img| self.fill_mut(img)) {
                    apply(fill);
                }
            }
        }
    }

    fn image_desc(&self, image: Image) -> Option<(u32, u32, u32)> {
        match image {
            Image::Texture(id) => {
                let (w, h) = self.textures.get(&id)?.size?;
                Some((w, h, 0))
            }
            Image::Renderbuffer(id) => {
                let rb = self.renderbuffers.get(&id)?;
                rb.format?;
                Some((rb.size.0, rb.size.1, rb.samples))
            }
        }
    }

    fn attachment_supports(&self, image: Image, attachment: Attachment) -> bool {
        match (image, attachment) {
            (Image::Texture(_), Attachment::Color0) => true,
            (Image::Texture(_), _) => false,
            (Image::Renderbuffer(id), _) => {
                let Some(format) = self.renderbuffers.get(&id).and_then(|r| r.format) else {
                    return false;
                };
                match attachment {
                    Attachment::Color0 => format == RenderbufferFormat::Rgba8,
                    Attachment::Depth => format.has_depth(),
                    Attachment::Stencil => format.has_stencil(),
                }
            }
        }
    }

    fn parse_declarations(source: &str, keyword: &str) -> Vec<String> {
        source
            .split([';', '\n'])
            .filter_map(|stmt| {
                let stmt = stmt.trim();
                let rest = stmt.strip_prefix(keyword)?;
                if !rest.starts_with(char::is_whitespace) {
                    return None;
                }
                rest.split_whitespace().last().map(str::to_string)
            })
            .collect()
    }
}

impl GlDriver for HeadlessDriver {
    fn get_string(&self, query: StringQuery) -> String {
        match query {
            StringQuery::Extensions => self.opts.extensions.clone(),
        }
    }

    fn get_integer(&self, query: IntegerQuery) -> i32 {
        match query {
            IntegerQuery::MaxSamples => self.opts.max_samples,
        }
    }

    fn has_extended_profile(&self) -> bool {
        self.opts.extended_profile
    }

    fn is_enabled(&self, cap: Capability) -> bool {
        match cap {
            Capability::Blend => self.blend,
            Capability::DepthTest => self.depth_test,
        }
    }

    fn depth_mask_enabled(&self) -> bool {
        self.depth_mask
    }

    fn enable(&mut self, cap: Capability) {
        match cap {
            Capability::Blend => self.blend = true,
            Capability::DepthTest => self.depth_test = true,
        }
    }

    fn disable(&mut self, cap: Capability) {
        match cap {
            Capability::Blend => self.blend = false,
            Capability::DepthTest => self.depth_test = false,
        }
    }

    fn set_depth_mask(&mut self, write: bool) {
        self.depth_mask = write;
    }

    fn set_color_mask(&mut self, r: bool, g: bool, b: bool, a: bool) {
        self.color_mask = [r, g, b, a];
    }

    fn set_swap_interval(&mut self, interval: u32) {
        self.swap_interval = interval;
    }

    fn create_texture(&mut self) -> CompositeResult<TextureId> {
        let id = TextureId(self.alloc_name()?);
        self.textures.insert(
            id,
            TextureObj {
                size: None,
                fill: Fill::default(),
            },
        );
        self.stats.textures_created += 1;
        Ok(id)
    }

    fn bind_texture(&mut self, target: TextureTarget, texture: Option<TextureId>) {
        match target {
            TextureTarget::Texture2d => self.bound_2d = texture,
            TextureTarget::Rectangle => self.bound_rect = texture,
        }
    }

    fn active_texture(&mut self, _unit: u32) {}

    fn set_texture_sampling(&mut self, _target: TextureTarget, _filter: Filter) {}

    fn tex_image_2d(&mut self, target: TextureTarget, width: u32, height: u32) {
        let bound = match target {
            TextureTarget::Texture2d => self.bound_2d,
            TextureTarget::Rectangle => self.bound_rect,
        };
        if let Some(tex) = bound.and_then(|id| self.textures.get_mut(&id)) {
            tex.size = Some((width, height));
            tex.fill = Fill::default();
        }
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if self.textures.remove(&texture).is_some() {
            self.stats.objects_deleted += 1;
        }
        if self.bound_2d == Some(texture) {
            self.bound_2d = None;
        }
        if self.bound_rect == Some(texture) {
            self.bound_rect = None;
        }
    }

    fn create_framebuffer(&mut self) -> CompositeResult<FramebufferId> {
        let id = FramebufferId(self.alloc_name()?);
        self.framebuffers.insert(id, FramebufferObj::default());
        self.stats.framebuffers_created += 1;
        Ok(id)
    }

    fn bind_framebuffer(&mut self, target: FramebufferTarget, framebuffer: Option<FramebufferId>) {
        match target {
            FramebufferTarget::Both => {
                self.read_fbo = framebuffer;
                self.draw_fbo = framebuffer;
            }
            FramebufferTarget::Read => self.read_fbo = framebuffer,
            FramebufferTarget::Draw => self.draw_fbo = framebuffer,
        }
    }

    fn framebuffer_texture_2d(
        &mut self,
        attachment: Attachment,
        _target: TextureTarget,
        texture: TextureId,
    ) {
        if let Some(fb) = self.draw_fbo.and_then(|id| self.framebuffers.get_mut(&id)) {
            let slot = match attachment {
                Attachment::Color0 => &mut fb.color,
                Attachment::Depth => &mut fb.depth,
                Attachment::Stencil => &mut fb.stencil,
            };
            *slot = Some(Image::Texture(texture));
        }
    }

    fn framebuffer_renderbuffer(&mut self, attachment: Attachment, renderbuffer: RenderbufferId) {
        if let Some(fb) = self.draw_fbo.and_then(|id| self.framebuffers.get_mut(&id)) {
            let slot = match attachment {
                Attachment::Color0 => &mut fb.color,
                Attachment::Depth => &mut fb.depth,
                Attachment::Stencil => &mut fb.stencil,
            };
            *slot = Some(Image::Renderbuffer(renderbuffer));
        }
    }

    fn check_framebuffer_status(&self) -> FramebufferStatus {
        let Some(id) = self.draw_fbo else {
            return FramebufferStatus::Complete;
        };
        if let Some(status) = self.forced_status {
            return status;
        }
        let Some(fb) = self.framebuffers.get(&id) else {
            return FramebufferStatus::Unsupported;
        };
        let Some(color) = fb.color else {
            return FramebufferStatus::IncompleteMissingAttachment;
        };

        let attached = [
            (Some(color), Attachment::Color0),
            (fb.depth, Attachment::Depth),
            (fb.stencil, Attachment::Stencil),
        ];
        let mut reference: Option<(u32, u32, u32)> = None;
        for (image, attachment) in attached {
            let Some(image) = image else { continue };
            if !self.attachment_supports(image, attachment) {
                return FramebufferStatus::IncompleteAttachment;
            }
            let Some((w, h, samples)) = self.image_desc(image) else {
                return FramebufferStatus::IncompleteAttachment;
            };
            match reference {
                None => reference = Some((w, h, samples)),
                Some((rw, rh, rs)) => {
                    if (rw, rh) != (w, h) {
                        return FramebufferStatus::IncompleteDimensions;
                    }
                    if rs.max(1) != samples.max(1) {
                        return FramebufferStatus::IncompleteMultisample;
                    }
                }
            }
        }
        FramebufferStatus::Complete
    }

    fn draw_buffer(&mut self, _attachment: Attachment) {}

    fn blit_framebuffer(&mut self, src: PixelRect, dst: PixelRect, mask: BufferMask, filter: Filter) {
        self.stats.blits += 1;
        self.last_blit = Some(BlitRecord {
            read: self.read_fbo,
            draw: self.draw_fbo,
            src,
            dst,
            mask,
            filter,
        });
        let source = self.read_fill();
        if mask.color {
            self.write_color(source.color, false);
        }
        let [_, depth, stencil] = self.slots(self.draw_fbo);
        if mask.depth {
            match depth {
                Some(img) => {
                    if let Some(f) = self.fill_mut(img) {
                        f.depth = source.depth;
                    }
                }
                None if self.draw_fbo.is_none() => self.default_fill.depth = source.depth,
                None => {}
            }
        }
        if mask.stencil {
            match stencil {
                Some(img) => {
                    if let Some(f) = self.fill_mut(img) {
                        f.stencil = source.stencil;
                    }
                }
                None if self.draw_fbo.is_none() => self.default_fill.stencil = source.stencil,
                None => {}
            }
        }
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        if self.framebuffers.remove(&framebuffer).is_some() {
            self.stats.objects_deleted += 1;
        }
        if self.read_fbo == Some(framebuffer) {
            self.read_fbo = None;
        }
        if self.draw_fbo == Some(framebuffer) {
            self.draw_fbo = None;
        }
    }

    fn create_renderbuffer(&mut self) -> CompositeResult<RenderbufferId> {
        let id = RenderbufferId(self.alloc_name()?);
        self.renderbuffers.insert(
            id,
            RenderbufferObj {
                format: None,
                samples: 0,
                size: (0, 0),
                fill: Fill::default(),
            },
        );
        self.stats.renderbuffers_created += 1;
        Ok(id)
    }

    fn bind_renderbuffer(&mut self, renderbuffer: Option<RenderbufferId>) {
        self.bound_renderbuffer = renderbuffer;
    }

    fn renderbuffer_storage(
        &mut self,
        format: RenderbufferFormat,
        samples: u32,
        width: u32,
        height: u32,
    ) {
        let max = u32::try_from(self.opts.max_samples).unwrap_or(1).max(1);
        if let Some(rb) = self
            .bound_renderbuffer
            .and_then(|id| self.renderbuffers.get_mut(&id))
        {
            rb.format = Some(format);
            rb.samples = samples.min(max);
            rb.size = (width, height);
            rb.fill = Fill::default();
        }
    }

    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferId) {
        if self.renderbuffers.remove(&renderbuffer).is_some() {
            self.stats.objects_deleted += 1;
        }
        if self.bound_renderbuffer == Some(renderbuffer) {
            self.bound_renderbuffer = None;
        }
    }

    fn clear_color(&mut self, color: Rgba) {
        self.clear_color = color;
    }

    fn clear_depth(&mut self, depth: f32) {
        self.clear_depth = depth;
    }

    fn clear_stencil(&mut self, stencil: u8) {
        self.clear_stencil = stencil;
    }

    fn clear(&mut self, mask: BufferMask) {
        self.stats.clears += 1;
        if mask.color {
            self.write_color(self.clear_color.to_rgba8(), true);
        }
        let (depth, stencil) = (self.clear_depth, self.clear_stencil);
        let write_depth = mask.depth && self.depth_mask;
        match self.draw_fbo {
            None => {
                if write_depth {
                    self.default_fill.depth = depth;
                }
                if mask.stencil {
                    self.default_fill.stencil = stencil;
                }
            }
            Some(id) => {
                let [_, depth_img, stencil_img] = self.slots(Some(id));
                if write_depth && let Some(f) = depth_img.and_then(|i| self.fill_mut(i)) {
                    f.depth = depth;
                }
                if mask.stencil && let Some(f) = stencil_img.and_then(|i| self.fill_mut(i)) {
                    f.stencil = stencil;
                }
            }
        }
    }

    fn create_shader(&mut self, stage: ShaderStage) -> CompositeResult<ShaderId> {
        let id = ShaderId(self.alloc_name()?);
        self.shaders.insert(
            id,
            ShaderObj {
                stage,
                source: String::new(),
                compiled: false,
                log: String::new(),
            },
        );
        self.stats.shaders_created += 1;
        Ok(id)
    }

    fn compile_shader(&mut self, shader: ShaderId, source: &str) -> bool {
        self.stats.shader_compiles += 1;
        let fail = self.fail_compile;
        let Some(obj) = self.shaders.get_mut(&shader) else {
            return false;
        };
        obj.source = source.to_string();
        if fail {
            obj.compiled = false;
            obj.log = "0:1(1): error: compilation rejected by driver".to_string();
        } else if !source.contains("main") {
            obj.compiled = false;
            obj.log = "0:1(1): error: no entry point `main`".to_string();
        } else {
            obj.compiled = true;
            obj.log.clear();
        }
        obj.compiled
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        self.shaders
            .get(&shader)
            .map(|s| s.log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        if self.shaders.remove(&shader).is_some() {
            self.stats.objects_deleted += 1;
        }
    }

    fn create_program(&mut self) -> CompositeResult<ProgramId> {
        let id = ProgramId(self.alloc_name()?);
        self.programs.insert(
            id,
            ProgramObj {
                shaders: Vec::new(),
                linked: false,
                kind: ProgramKind::Other,
                log: String::new(),
                attribs: Vec::new(),
                uniforms: Vec::new(),
                values: HashMap::new(),
            },
        );
        self.stats.programs_created += 1;
        Ok(id)
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        if let Some(p) = self.programs.get_mut(&program) {
            p.shaders.push(shader);
        }
    }

    fn link_program(&mut self, program: ProgramId) -> bool {
        self.stats.program_links += 1;
        let Some(shader_ids) = self.programs.get(&program).map(|p| p.shaders.clone()) else {
            return false;
        };

        let mut vertex: Option<&ShaderObj> = None;
        let mut fragment: Option<&ShaderObj> = None;
        for id in &shader_ids {
            if let Some(s) = self.shaders.get(id) {
                match s.stage {
                    ShaderStage::Vertex => vertex = Some(s),
                    ShaderStage::Fragment => fragment = Some(s),
                }
            }
        }

        let (linked, log, kind, attribs, uniforms) = match (vertex, fragment) {
            _ if self.fail_link => (
                false,
                "error: linking rejected by driver".to_string(),
                ProgramKind::Other,
                Vec::new(),
                Vec::new(),
            ),
            (Some(v), Some(f)) if v.compiled && f.compiled => {
                let kind = if f.source.contains("sampler2DRect") {
                    ProgramKind::Textured(TextureTarget::Rectangle)
                } else if f.source.contains("sampler2D") {
                    ProgramKind::Textured(TextureTarget::Texture2d)
                } else if f.source.contains("uniform vec4") {
                    ProgramKind::FlatColor
                } else {
                    ProgramKind::Other
                };
                let attribs = Self::parse_declarations(&v.source, "attribute");
                let mut uniforms = Self::parse_declarations(&v.source, "uniform");
                uniforms.extend(Self::parse_declarations(&f.source, "uniform"));
                (true, String::new(), kind, attribs, uniforms)
            }
            _ => (
                false,
                "error: program needs one compiled vertex and one compiled fragment shader"
                    .to_string(),
                ProgramKind::Other,
                Vec::new(),
                Vec::new(),
            ),
        };

        if let Some(p) = self.programs.get_mut(&program) {
            p.linked = linked;
            p.log = log;
            p.kind = kind;
            p.attribs = attribs;
            p.uniforms = uniforms;
        }
        linked
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        self.programs
            .get(&program)
            .map(|p| p.log.clone())
            .unwrap_or_default()
    }

    fn delete_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program).is_some() {
            self.stats.objects_deleted += 1;
        }
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.current_program = program;
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        let p = self.programs.get(&program).filter(|p| p.linked)?;
        let idx = p.attribs.iter().position(|a| a == name)?;
        u32::try_from(idx).ok()
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let p = self.programs.get(&program).filter(|p| p.linked)?;
        let idx = p.uniforms.iter().position(|u| u == name)?;
        u32::try_from(idx).ok().map(UniformLocation)
    }

    fn uniform_4f(&mut self, location: UniformLocation, value: [f32; 4]) {
        if let Some(p) = self
            .current_program
            .and_then(|id| self.programs.get_mut(&id))
        {
            p.values.insert(location.0, value);
        }
    }

    fn uniform_1i(&mut self, location: UniformLocation, value: i32) {
        if let Some(p) = self
            .current_program
            .and_then(|id| self.programs.get_mut(&id))
        {
            p.values.insert(location.0, [value as f32, 0.0, 0.0, 0.0]);
        }
    }

    fn draw_triangle_strip(&mut self, attribs: &[VertexAttrib<'_>], count: u32) {
        self.stats.draws += 1;
        if count < 3 || attribs.is_empty() {
            return;
        }
        let Some(program) = self
            .current_program
            .and_then(|id| self.programs.get(&id))
            .filter(|p| p.linked)
        else {
            return;
        };

        let color = match program.kind {
            ProgramKind::FlatColor => program
                .values
                .values()
                .next()
                .map(|v| Rgba::new(v[0], v[1], v[2], v[3]).to_rgba8()),
            ProgramKind::Textured(target) => {
                let bound = match target {
                    TextureTarget::Texture2d => self.bound_2d,
                    TextureTarget::Rectangle => self.bound_rect,
                };
                bound
                    .and_then(|id| self.textures.get(&id))
                    .map(|t| t.fill.color)
            }
            ProgramKind::Other => None,
        };
        if let Some(color) = color {
            self.write_color(color, true);
        }
    }

    fn read_color(&mut self, _x: u32, _y: u32) -> [u8; 4] {
        self.read_fill().color
    }

    fn read_depth(&mut self, _x: u32, _y: u32) -> f32 {
        self.read_fill().depth
    }

    fn read_stencil(&mut self, _x: u32, _y: u32) -> u8 {
        self.read_fill().stencil
    }
}

#[cfg(test)]
#[path = "../../tests/unit/driver/headless.rs"]
mod tests;
