//! The capability a resource implements to be bound to an owner's lifetime.

use std::sync::Arc;

/// A resource that can be registered under an owner's [`Lifetime`].
///
/// The owner consults [`should_remove`](Self::should_remove) during a
/// pressure pass and calls [`will_remove`](Self::will_remove) exactly once
/// before dropping its reference, whether the entry leaves by explicit
/// removal, eviction, replacement, or the owner's death.
///
/// [`Lifetime`]: super::Lifetime
pub trait Depositable: Send + Sync {
    /// True if the resource may be evicted under resource pressure.
    fn should_remove(&self) -> bool;

    /// Called before the owner drops the resource.
    fn will_remove(&self);

    /// Called right after the resource is registered.
    fn did_add(&self) {}
}

/// Shared handle to a registered resource.
pub type DepositableRef = Arc<dyn Depositable>;
