use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a driver context.
///
/// Used only to decide whether GPU resources created earlier still belong to the live context;
/// it never owns anything.
///
/// Equality treats [`ContextHandle::Uninitialized`] as compatible with every handle, so
/// resources created before the context was known are never spuriously invalidated. Two live
/// handles are equal iff they carry the same identifier. Because of the wildcard this relation is
/// not transitive, hence no `Eq`/`Hash`.
#[derive(Clone, Copy, Debug, Default)]
pub enum ContextHandle {
    #[default]
    Uninitialized,
    Live(NonZeroU64),
}

impl ContextHandle {
    /// Wrap a host-provided identifier; `0` is the uninitialized sentinel.
    pub fn live(id: u64) -> Self {
        NonZeroU64::new(id).map_or(Self::Uninitialized, Self::Live)
    }

    /// Allocate a process-unique live handle.
    pub fn fresh() -> Self {
        Self::live(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn is_live(self) -> bool {
        matches!(self, Self::Live(_))
    }

    pub fn id(self) -> Option<u64> {
        match self {
            Self::Uninitialized => None,
            Self::Live(id) => Some(id.get()),
        }
    }

    /// Strict identity: both handles live and naming the same context.
    pub fn same_live(self, other: Self) -> bool {
        matches!((self, other), (Self::Live(a), Self::Live(b)) if a == b)
    }
}

impl PartialEq for ContextHandle {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Uninitialized, _) | (_, Self::Uninitialized) => true,
            (Self::Live(a), Self::Live(b)) => a == b,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/caps/context.rs"]
mod tests;
