use crate::caps::context::ContextHandle;
use crate::driver::api::{GlDriver, ProgramId, ShaderId, ShaderStage, TextureTarget, UniformLocation};
use crate::foundation::error::{CompositeError, CompositeResult};
use crate::shader::sources;

/// What a cached program draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawPurpose {
    /// Textured quad sampling a `TEXTURE_2D` with normalized coordinates.
    Texture2d,
    /// Textured quad sampling a rectangle texture with texel coordinates.
    TextureRect,
    /// Solid-color quad.
    FlatColor,
}

impl DrawPurpose {
    pub const ALL: [Self; 3] = [Self::Texture2d, Self::TextureRect, Self::FlatColor];

    pub fn for_target(target: TextureTarget) -> Self {
        match target {
            TextureTarget::Texture2d => Self::Texture2d,
            TextureTarget::Rectangle => Self::TextureRect,
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Texture2d => 0,
            Self::TextureRect => 1,
            Self::FlatColor => 2,
        }
    }

    fn sources(self) -> (&'static str, String) {
        match self {
            Self::Texture2d => (sources::TEX_VERTEX, sources::tex_2d_fragment()),
            Self::TextureRect => (sources::TEX_VERTEX, sources::tex_rect_fragment()),
            Self::FlatColor => (sources::RECT_VERTEX, sources::rect_fragment()),
        }
    }
}

/// Program returned by the cache. An invalid handle turns every draw using it into a no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramHandle(Option<ProgramId>);

impl ProgramHandle {
    pub const INVALID: Self = Self(None);

    pub fn is_valid(self) -> bool {
        self.0.is_some()
    }

    pub fn program(self) -> Option<ProgramId> {
        self.0
    }
}

/// One cached program and the locations the draw code needs.
#[derive(Debug)]
pub struct ProgramEntry {
    program: Option<ProgramId>,
    vertex_shader: Option<ShaderId>,
    fragment_shader: Option<ShaderId>,
    vertex_loc: Option<u32>,
    texcoord_loc: Option<u32>,
    color_loc: Option<UniformLocation>,
    sampler_loc: Option<UniformLocation>,
    owner: ContextHandle,
    failure: Option<CompositeError>,
}

impl ProgramEntry {
    fn empty(owner: ContextHandle) -> Self {
        Self {
            program: None,
            vertex_shader: None,
            fragment_shader: None,
            vertex_loc: None,
            texcoord_loc: None,
            color_loc: None,
            sampler_loc: None,
            owner,
            failure: None,
        }
    }

    pub fn handle(&self) -> ProgramHandle {
        ProgramHandle(self.program)
    }

    pub fn vertex_loc(&self) -> Option<u32> {
        self.vertex_loc
    }

    pub fn texcoord_loc(&self) -> Option<u32> {
        self.texcoord_loc
    }

    pub fn color_loc(&self) -> Option<UniformLocation> {
        self.color_loc
    }

    pub fn sampler_loc(&self) -> Option<UniformLocation> {
        self.sampler_loc
    }

    pub fn owner(&self) -> ContextHandle {
        self.owner
    }

    /// Compile or link diagnostics when the program could not be built.
    pub fn failure(&self) -> Option<&CompositeError> {
        self.failure.as_ref()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShaderCacheStats {
    /// Compile+link attempts (one per cache miss).
    pub builds: u64,
    pub hits: u64,
    pub compile_failures: u64,
    pub link_failures: u64,
}

/// Lazily built programs for the present and overlay draws, keyed by draw purpose and owning
/// context.
///
/// Building never fails the caller: compile and link errors are logged, recorded on the entry
/// and produce [`ProgramHandle::INVALID`] until the context changes.
#[derive(Debug, Default)]
pub struct ShaderProgramCache {
    entries: [Option<ProgramEntry>; 3],
    stats: ShaderCacheStats,
}

impl ShaderProgramCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> ShaderCacheStats {
        self.stats
    }

    pub fn get(
        &mut self,
        driver: &mut dyn GlDriver,
        purpose: DrawPurpose,
        ctx: ContextHandle,
    ) -> ProgramHandle {
        self.entry(driver, purpose, ctx).handle()
    }

    /// Cached entry for `purpose`, building it when missing or owned by another context.
    pub fn entry(
        &mut self,
        driver: &mut dyn GlDriver,
        purpose: DrawPurpose,
        ctx: ContextHandle,
    ) -> &ProgramEntry {
        let slot = &mut self.entries[purpose.index()];
        let entry = match slot.take() {
            Some(e) if e.owner == ctx => {
                self.stats.hits += 1;
                e
            }
            stale => {
                if let Some(stale) = stale {
                    // The old context took its objects with it; nothing to delete.
                    tracing::debug!(
                        ?purpose,
                        old = ?stale.owner,
                        new = ?ctx,
                        "context changed, rebuilding shader program"
                    );
                }
                Self::build(driver, purpose, ctx, &mut self.stats)
            }
        };
        slot.insert(entry)
    }

    /// Recorded failure for `purpose`, if its last build failed.
    pub fn failure(&self, purpose: DrawPurpose) -> Option<&CompositeError> {
        self.entries[purpose.index()]
            .as_ref()
            .and_then(ProgramEntry::failure)
    }

    /// Delete every program still owned by `ctx` and empty the cache. Entries owned by other
    /// contexts are forgotten without driver calls.
    pub fn release(&mut self, driver: &mut dyn GlDriver, ctx: ContextHandle) {
        for slot in &mut self.entries {
            let Some(entry) = slot.take() else { continue };
            if entry.owner != ctx {
                continue;
            }
            if let Some(program) = entry.program {
                driver.delete_program(program);
            }
            for shader in [entry.vertex_shader, entry.fragment_shader].into_iter().flatten() {
                driver.delete_shader(shader);
            }
        }
    }

    fn build(
        driver: &mut dyn GlDriver,
        purpose: DrawPurpose,
        ctx: ContextHandle,
        stats: &mut ShaderCacheStats,
    ) -> ProgramEntry {
        stats.builds += 1;
        let (vertex_src, fragment_src) = purpose.sources();
        let mut entry = ProgramEntry::empty(ctx);

        match compile_and_link(driver, vertex_src, &fragment_src) {
            Ok((program, vs, fs)) => {
                entry.program = Some(program);
                entry.vertex_shader = Some(vs);
                entry.fragment_shader = Some(fs);
                entry.vertex_loc = driver.attrib_location(program, "inVertex");
                match purpose {
                    DrawPurpose::Texture2d | DrawPurpose::TextureRect => {
                        entry.texcoord_loc = driver.attrib_location(program, "inTexcoord");
                        entry.sampler_loc = driver.uniform_location(program, "textureSampler");
                    }
                    DrawPurpose::FlatColor => {
                        entry.color_loc = driver.uniform_location(program, "rectColor");
                    }
                }
                tracing::debug!(?purpose, program = program.get(), "built shader program");
            }
            Err(err) => {
                match err {
                    CompositeError::ShaderCompile { .. } => stats.compile_failures += 1,
                    CompositeError::ShaderLink { .. } => stats.link_failures += 1,
                    _ => {}
                }
                tracing::warn!(
                    ?purpose,
                    error = %err,
                    "shader program unavailable, draws for this purpose are skipped"
                );
                entry.failure = Some(err);
            }
        }
        entry
    }
}

fn compile(driver: &mut dyn GlDriver, stage: ShaderStage, source: &str) -> CompositeResult<ShaderId> {
    let shader = driver.create_shader(stage)?;
    if driver.compile_shader(shader, source) {
        return Ok(shader);
    }
    let log = driver.shader_info_log(shader);
    driver.delete_shader(shader);
    Err(CompositeError::ShaderCompile { stage, log })
}

fn compile_and_link(
    driver: &mut dyn GlDriver,
    vertex_src: &str,
    fragment_src: &str,
) -> CompositeResult<(ProgramId, ShaderId, ShaderId)> {
    let vs = compile(driver, ShaderStage::Vertex, vertex_src)?;
    let fs = match compile(driver, ShaderStage::Fragment, fragment_src) {
        Ok(fs) => fs,
        Err(err) => {
            driver.delete_shader(vs);
            return Err(err);
        }
    };
    let program = match driver.create_program() {
        Ok(p) => p,
        Err(err) => {
            driver.delete_shader(vs);
            driver.delete_shader(fs);
            return Err(err);
        }
    };

    driver.attach_shader(program, vs);
    driver.attach_shader(program, fs);
    if !driver.link_program(program) {
        let log = driver.program_info_log(program);
        driver.delete_program(program);
        driver.delete_shader(vs);
        driver.delete_shader(fs);
        return Err(CompositeError::ShaderLink { log });
    }
    Ok((program, vs, fs))
}

#[cfg(test)]
#[path = "../../tests/unit/shader/cache.rs"]
mod tests;
