//! Per-surface facade tying capability probing, the offscreen set, the blitter and the
//! windowing host together.

pub mod config;
pub mod host;
pub mod screen;
