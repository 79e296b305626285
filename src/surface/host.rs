use crate::foundation::error::CompositeResult;

/// What a surface asks its windowing host for when the default drawable is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SurfaceRequest {
    pub sample_buffers: bool,
    pub samples: u32,
    pub depth_bits: u8,
    pub stencil_bits: u8,
    pub alpha_bits: u8,
    pub background_opaque: bool,
}

impl SurfaceRequest {
    /// A multisampled default drawable is only requested when the surface does not composite
    /// offscreen; otherwise the offscreen set does the multisampling.
    pub fn new(antialias: u32, needs_offscreen: bool) -> Self {
        let multisample = antialias > 1 && !needs_offscreen;
        Self {
            sample_buffers: multisample,
            samples: if multisample { antialias } else { 1 },
            depth_bits: 24,
            stencil_bits: 8,
            alpha_bits: 8,
            background_opaque: true,
        }
    }
}

/// Windowing-toolkit strategy that owns the native drawable of a surface.
///
/// The driver context itself is reported back through
/// [`crate::Surface::on_context_created`] once the toolkit has made it current.
pub trait SurfaceHost {
    fn create_surface(&mut self, request: &SurfaceRequest) -> CompositeResult<()>;

    /// Replace an existing drawable, e.g. after the antialiasing level changed.
    fn recreate_surface(&mut self, request: &SurfaceRequest) -> CompositeResult<()>;

    fn teardown_surface(&mut self);
}

/// A host without a window: accepts every request and remembers it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordingHost {
    pub requests: Vec<SurfaceRequest>,
    pub created: u32,
    pub recreated: u32,
    pub torn_down: u32,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_request(&self) -> Option<&SurfaceRequest> {
        self.requests.last()
    }
}

impl SurfaceHost for RecordingHost {
    fn create_surface(&mut self, request: &SurfaceRequest) -> CompositeResult<()> {
        self.requests.push(*request);
        self.created += 1;
        Ok(())
    }

    fn recreate_surface(&mut self, request: &SurfaceRequest) -> CompositeResult<()> {
        self.requests.push(*request);
        self.recreated += 1;
        Ok(())
    }

    fn teardown_surface(&mut self) {
        self.torn_down += 1;
    }
}
