//! Blocking counting semaphore.
//!
//! Used by the synchronous-wait decorator: the waiting thread blocks in
//! [`Semaphore::acquire`] until the completing thread calls
//! [`Semaphore::release`].
//!
//! # Example
//!
//! ```
//! use lifecall::sync::Semaphore;
//! use std::sync::Arc;
//!
//! let sem = Arc::new(Semaphore::new(0));
//! let releaser = Arc::clone(&sem);
//! std::thread::spawn(move || releaser.release(1));
//! sem.acquire();
//! ```

use parking_lot::{Condvar, Mutex};

/// A counting semaphore that blocks the calling thread.
#[derive(Debug)]
pub struct Semaphore {
    /// Number of available permits.
    permits: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    /// Creates a new semaphore with the given number of permits.
    #[must_use]
    pub const fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            available: Condvar::new(),
        }
    }

    /// Returns the number of currently available permits.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        *self.permits.lock()
    }

    /// Takes one permit, blocking until one is available.
    pub fn acquire(&self) {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.available.wait(&mut permits);
        }
        *permits -= 1;
    }

    /// Returns `count` permits and wakes waiters.
    pub fn release(&self, count: usize) {
        let mut permits = self.permits.lock();
        *permits += count;
        drop(permits);
        if count == 1 {
            self.available.notify_one();
        } else {
            self.available.notify_all();
        }
    }
}
