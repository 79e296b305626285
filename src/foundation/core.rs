/// Logical size of a rendering surface in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }
}

/// Straight (non-premultiplied) RGBA color with `f32` channels in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    pub const OPAQUE_BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Quantize to RGBA8, clamping each channel.
    pub fn to_rgba8(self) -> [u8; 4] {
        fn q(v: f32) -> u8 {
            (v.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

/// Axis-aligned rectangle in integer pixel coordinates (`x0,y0` inclusive, `x1,y1` exclusive).
///
/// The vertical axis follows the driver convention: row 0 is the bottom of the surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl PixelRect {
    pub const fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Rectangle covering `0..width` × `0..height`.
    pub fn of_size(width: u32, height: u32) -> Self {
        Self::new(
            0,
            0,
            i32::try_from(width).unwrap_or(i32::MAX),
            i32::try_from(height).unwrap_or(i32::MAX),
        )
    }

    pub fn width(self) -> i32 {
        self.x1 - self.x0
    }

    pub fn height(self) -> i32 {
        self.y1 - self.y0
    }

    pub fn is_degenerate(self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// Numeric constants derived once at process start.
///
/// Held by value by each [`crate::Surface`]; nothing in the crate mutates them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RuntimeConstants {
    /// Machine epsilon for `f32` arithmetic.
    pub float_eps: f32,
}

impl RuntimeConstants {
    pub fn detect() -> Self {
        Self {
            float_eps: crate::foundation::math::machine_epsilon_f32(),
        }
    }
}

impl Default for RuntimeConstants {
    fn default() -> Self {
        Self::detect()
    }
}
