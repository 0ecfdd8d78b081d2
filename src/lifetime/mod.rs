//! Binding in-flight work to the lifetime of an owning object.
//!
//! A host embeds a [`Lifetime`]. Resources implementing [`Depositable`] are
//! deposited into its lazily created [`DepositRegistry`]; when the host is
//! destroyed the [`DeathNotifier`] fires, and the registry's own death
//! observer releases every remaining entry. A low-resource-pressure pass
//! evicts entries that report they are idle.

pub mod death;
pub mod depositable;
pub mod owner;
pub mod registry;

pub use death::{DeathNotifier, ObserverHandle};
pub use depositable::{Depositable, DepositableRef};
pub use owner::Lifetime;
pub use registry::DepositRegistry;
