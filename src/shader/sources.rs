//! Built-in GLSL sources for the present and overlay programs.

/// Precision preamble required by GLSL ES fragment shaders; ignored on desktop GLSL.
const PRECISION_PREAMBLE: &str = "#ifdef GL_ES\n\
precision mediump float;\n\
precision mediump int;\n\
#endif\n";

pub(crate) const TEX_VERTEX: &str = "attribute vec2 inVertex;\n\
attribute vec2 inTexcoord;\n\
varying vec2 vertTexcoord;\n\
void main() {\n\
  gl_Position = vec4(inVertex, 0, 1);\n\
  vertTexcoord = inTexcoord;\n\
}\n";

const TEX_2D_FRAGMENT_BODY: &str = "uniform sampler2D textureSampler;\n\
varying vec2 vertTexcoord;\n\
void main() {\n\
  gl_FragColor = texture2D(textureSampler, vertTexcoord.st);\n\
}\n";

const TEX_RECT_FRAGMENT_BODY: &str = "uniform sampler2DRect textureSampler;\n\
varying vec2 vertTexcoord;\n\
void main() {\n\
  gl_FragColor = texture2DRect(textureSampler, vertTexcoord.st);\n\
}\n";

pub(crate) const RECT_VERTEX: &str = "attribute vec2 inVertex;\n\
void main() {\n\
  gl_Position = vec4(inVertex, 0, 1);\n\
}\n";

const RECT_FRAGMENT_BODY: &str = "uniform vec4 rectColor;\n\
void main() {\n\
  gl_FragColor = rectColor;\n\
}\n";

pub(crate) fn tex_2d_fragment() -> String {
    format!("{PRECISION_PREAMBLE}{TEX_2D_FRAGMENT_BODY}")
}

pub(crate) fn tex_rect_fragment() -> String {
    format!("{PRECISION_PREAMBLE}{TEX_RECT_FRAGMENT_BODY}")
}

pub(crate) fn rect_fragment() -> String {
    format!("{PRECISION_PREAMBLE}{RECT_FRAGMENT_BODY}")
}
