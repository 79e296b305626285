//! Offscreen framebuffer set and its lifecycle.

pub mod lifecycle;
