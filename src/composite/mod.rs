//! Frame binding, resolve/present and helper quads.

pub mod blitter;
