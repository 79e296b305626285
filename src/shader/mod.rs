//! Built-in programs used to present and overlay the offscreen color buffer.

/// Per-context program cache.
pub mod cache;
pub(crate) mod sources;
