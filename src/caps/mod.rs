//! Capability negotiation and context identity.

/// Driver context identity.
pub mod context;
/// Offscreen-compositing policies.
pub mod policy;
/// Driver capability probing.
pub mod probe;
