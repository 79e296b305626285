use std::fmt;
use std::num::NonZeroU32;

use crate::foundation::core::{PixelRect, Rgba};
use crate::foundation::error::CompositeResult;

macro_rules! object_name {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub NonZeroU32);

        impl $name {
            /// Raw driver object name.
            pub fn get(self) -> u32 {
                self.0.get()
            }
        }
    };
}

object_name!(
    /// Driver texture object.
    TextureId
);
object_name!(
    /// Driver framebuffer object. The default display target has no id (`None`).
    FramebufferId
);
object_name!(
    /// Driver renderbuffer object.
    RenderbufferId
);
object_name!(
    /// Driver shader object.
    ShaderId
);
object_name!(
    /// Driver program object.
    ProgramId
);

/// Uniform slot inside a linked program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StringQuery {
    Extensions,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IntegerQuery {
    MaxSamples,
}

/// Toggleable pipeline state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    Blend,
    DepthTest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    /// Power-of-two or NPOT 2D texture with normalized texture coordinates.
    Texture2d,
    /// Rectangle texture addressed in texels.
    Rectangle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FramebufferTarget {
    /// Both read and draw bindings.
    Both,
    Read,
    Draw,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Attachment {
    Color0,
    Depth,
    Stencil,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderbufferFormat {
    Rgba8,
    Depth24Stencil8,
    DepthComponent24,
    StencilIndex8,
}

impl RenderbufferFormat {
    pub fn has_depth(self) -> bool {
        matches!(self, Self::Depth24Stencil8 | Self::DepthComponent24)
    }

    pub fn has_stencil(self) -> bool {
        matches!(self, Self::Depth24Stencil8 | Self::StencilIndex8)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Filter {
    Nearest,
    Linear,
}

/// Set of buffers affected by a clear or blit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BufferMask {
    pub color: bool,
    pub depth: bool,
    pub stencil: bool,
}

impl BufferMask {
    pub const COLOR: Self = Self {
        color: true,
        depth: false,
        stencil: false,
    };
    pub const DEPTH_STENCIL: Self = Self {
        color: false,
        depth: true,
        stencil: true,
    };
    pub const ALL: Self = Self {
        color: true,
        depth: true,
        stencil: true,
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        })
    }
}

/// Result of a framebuffer completeness check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FramebufferStatus {
    Complete,
    IncompleteAttachment,
    IncompleteMissingAttachment,
    IncompleteDimensions,
    IncompleteFormats,
    IncompleteDrawBuffer,
    IncompleteReadBuffer,
    IncompleteMultisample,
    Unsupported,
    /// A status code the driver reported but this crate does not know.
    Unknown(u32),
}

impl FramebufferStatus {
    pub fn is_complete(self) -> bool {
        self == Self::Complete
    }
}

impl fmt::Display for FramebufferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete => f.write_str("GL_FRAMEBUFFER_COMPLETE"),
            Self::IncompleteAttachment => f.write_str("GL_FRAMEBUFFER_INCOMPLETE_ATTACHMENT"),
            Self::IncompleteMissingAttachment => {
                f.write_str("GL_FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT")
            }
            Self::IncompleteDimensions => f.write_str("GL_FRAMEBUFFER_INCOMPLETE_DIMENSIONS"),
            Self::IncompleteFormats => f.write_str("GL_FRAMEBUFFER_INCOMPLETE_FORMATS"),
            Self::IncompleteDrawBuffer => f.write_str("GL_FRAMEBUFFER_INCOMPLETE_DRAW_BUFFER"),
            Self::IncompleteReadBuffer => f.write_str("GL_FRAMEBUFFER_INCOMPLETE_READ_BUFFER"),
            Self::IncompleteMultisample => f.write_str("GL_FRAMEBUFFER_INCOMPLETE_MULTISAMPLE"),
            Self::Unsupported => f.write_str("GL_FRAMEBUFFER_UNSUPPORTED"),
            Self::Unknown(code) => write!(f, "unknown framebuffer status ({code:#x})"),
        }
    }
}

/// One vertex attribute stream for [`GlDriver::draw_triangle_strip`].
///
/// `stride` and `offset` are counted in floats, not bytes.
#[derive(Clone, Copy, Debug)]
pub struct VertexAttrib<'a> {
    pub location: u32,
    pub components: u8,
    pub stride: usize,
    pub offset: usize,
    pub data: &'a [f32],
}

/// Synchronous graphics-driver interface consumed by the compositing layer.
///
/// Implementations wrap one driver context and are only ever called from the thread that owns
/// that context. Object-creation calls report driver refusal as
/// [`crate::CompositeError::Driver`]; everything else mirrors the driver's own
/// fire-and-forget semantics, with errors observable through status queries.
pub trait GlDriver {
    // Queries.
    fn get_string(&self, query: StringQuery) -> String;
    fn get_integer(&self, query: IntegerQuery) -> i32;
    /// Whether the extended (desktop) profile with multisample storage and framebuffer blits
    /// is available on this context.
    fn has_extended_profile(&self) -> bool;
    fn is_enabled(&self, cap: Capability) -> bool;
    fn depth_mask_enabled(&self) -> bool;

    // Fixed-function state.
    fn enable(&mut self, cap: Capability);
    fn disable(&mut self, cap: Capability);
    fn set_depth_mask(&mut self, write: bool);
    fn set_color_mask(&mut self, r: bool, g: bool, b: bool, a: bool);
    fn set_swap_interval(&mut self, interval: u32);

    // Textures.
    fn create_texture(&mut self) -> CompositeResult<TextureId>;
    fn bind_texture(&mut self, target: TextureTarget, texture: Option<TextureId>);
    fn active_texture(&mut self, unit: u32);
    /// Set min/mag filter and clamp-to-edge wrapping on the bound texture.
    fn set_texture_sampling(&mut self, target: TextureTarget, filter: Filter);
    /// Allocate uninitialized RGBA8 storage for the bound texture.
    fn tex_image_2d(&mut self, target: TextureTarget, width: u32, height: u32);
    fn delete_texture(&mut self, texture: TextureId);

    // Framebuffers and renderbuffers.
    fn create_framebuffer(&mut self) -> CompositeResult<FramebufferId>;
    fn bind_framebuffer(&mut self, target: FramebufferTarget, framebuffer: Option<FramebufferId>);
    fn framebuffer_texture_2d(
        &mut self,
        attachment: Attachment,
        target: TextureTarget,
        texture: TextureId,
    );
    fn framebuffer_renderbuffer(&mut self, attachment: Attachment, renderbuffer: RenderbufferId);
    /// Completeness of the framebuffer bound for drawing.
    fn check_framebuffer_status(&self) -> FramebufferStatus;
    fn draw_buffer(&mut self, attachment: Attachment);
    fn blit_framebuffer(&mut self, src: PixelRect, dst: PixelRect, mask: BufferMask, filter: Filter);
    fn delete_framebuffer(&mut self, framebuffer: FramebufferId);
    fn create_renderbuffer(&mut self) -> CompositeResult<RenderbufferId>;
    fn bind_renderbuffer(&mut self, renderbuffer: Option<RenderbufferId>);
    /// Allocate storage for the bound renderbuffer; `samples <= 1` means single-sampled.
    fn renderbuffer_storage(
        &mut self,
        format: RenderbufferFormat,
        samples: u32,
        width: u32,
        height: u32,
    );
    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferId);

    // Clears.
    fn clear_color(&mut self, color: Rgba);
    fn clear_depth(&mut self, depth: f32);
    fn clear_stencil(&mut self, stencil: u8);
    fn clear(&mut self, mask: BufferMask);

    // Shaders and programs.
    fn create_shader(&mut self, stage: ShaderStage) -> CompositeResult<ShaderId>;
    /// Upload `source` and compile; returns the compile status.
    fn compile_shader(&mut self, shader: ShaderId, source: &str) -> bool;
    fn shader_info_log(&self, shader: ShaderId) -> String;
    fn delete_shader(&mut self, shader: ShaderId);
    fn create_program(&mut self) -> CompositeResult<ProgramId>;
    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId);
    /// Link; returns the link status.
    fn link_program(&mut self, program: ProgramId) -> bool;
    fn program_info_log(&self, program: ProgramId) -> String;
    fn delete_program(&mut self, program: ProgramId);
    fn use_program(&mut self, program: Option<ProgramId>);
    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32>;
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    fn uniform_4f(&mut self, location: UniformLocation, value: [f32; 4]);
    fn uniform_1i(&mut self, location: UniformLocation, value: i32);

    // Drawing and readback.
    /// Draw `count` vertices as a triangle strip from client-side attribute streams.
    fn draw_triangle_strip(&mut self, attribs: &[VertexAttrib<'_>], count: u32);
    fn read_color(&mut self, x: u32, y: u32) -> [u8; 4];
    fn read_depth(&mut self, x: u32, y: u32) -> f32;
    fn read_stencil(&mut self, x: u32, y: u32) -> u8;
}
