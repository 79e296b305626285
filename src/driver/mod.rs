//! Graphics-driver boundary.

/// Driver trait and the value types crossing it.
pub mod api;
/// In-process driver used without a GPU and in tests.
pub mod headless;
