//! Synchronization primitives.
//!
//! - [`Lock`]: per-object reentrant exclusive access
//! - [`Semaphore`]: blocking counting wait used by synchronous calls

pub mod lock;
pub mod semaphore;

pub use lock::{Lock, LockGuard};
pub use semaphore::Semaphore;
