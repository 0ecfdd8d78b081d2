//! Per-object exclusive-access lock.
//!
//! Every call, registry and death notifier owns one [`Lock`]. Transitions on
//! that object run while holding it. The lock is reentrant: a call that
//! finishes synchronously from inside its own `start` re-enters it on the
//! same thread.

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::fmt;

/// Reentrant mutual-exclusion primitive owned by the object it protects.
#[derive(Default)]
pub struct Lock {
    inner: ReentrantMutex<()>,
}

/// Guard returned by [`Lock::lock`]; releases on drop.
pub type LockGuard<'a> = ReentrantMutexGuard<'a, ()>;

impl Lock {
    /// Creates an unlocked lock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: ReentrantMutex::new(()),
        }
    }

    /// Acquires the lock, blocking until it is available.
    ///
    /// Re-acquiring on the thread that already holds it succeeds immediately.
    pub fn lock(&self) -> LockGuard<'_> {
        self.inner.lock()
    }

    /// Returns true if some thread currently holds the lock.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

impl fmt::Debug for Lock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lock")
            .field("locked", &self.is_locked())
            .finish()
    }
}
