//! Frame scheduling on a dedicated render thread.

pub mod scheduler;
