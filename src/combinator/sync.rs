//! Blocking wait for an inner call.
//!
//! Starting the decorator blocks the calling thread until the inner call
//! completes, then delivers the captured outcome before `start` returns.
//! Starting it on the main context is a usage error and panics: the main
//! context is usually what the inner call needs in order to complete.
//!
//! No lock is held during the wait. Cancelling the decorator from another
//! thread cancels the inner call and wakes the waiter, whose `start` then
//! returns without delivering anything.

use super::wrapped::Relay;
use crate::call::{CallRef, Sink};
use crate::sync::Semaphore;
use crate::tracing_compat::trace;
use crate::types::Outcome;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Relay that turns an asynchronous inner call into a blocking one.
#[derive(Default)]
pub struct SyncWait {
    waiter: Mutex<Option<Arc<Semaphore>>>,
}

impl SyncWait {
    /// Creates the relay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a thread is parked waiting for the inner call.
    #[must_use]
    pub fn is_waiting(&self) -> bool {
        self.waiter.lock().is_some()
    }
}

impl<T: Send + 'static> Relay<T, T> for SyncWait {
    const NAME: &'static str = "sync";

    fn launch(&self, inner: &CallRef<T>, sink: Sink<T>) {
        assert!(
            !inner.dispatcher().is_main_context(),
            "sync() started on the main context; this would deadlock it"
        );

        let slot: Arc<Mutex<Option<Outcome<T>>>> = Arc::new(Mutex::new(None));
        let done = Arc::new(Semaphore::new(0));
        *self.waiter.lock() = Some(Arc::clone(&done));

        let captured = Arc::clone(&slot);
        let signal = Arc::clone(&done);
        inner.start(Box::new(move |outcome| {
            *captured.lock() = Some(outcome);
            signal.release(1);
        }));

        // abort may have run before the waiter was visible to it.
        if !sink.was_cancelled() {
            trace!("sync waiting for inner call");
            done.acquire();
        }

        {
            let mut waiter = self.waiter.lock();
            if waiter.as_ref().is_some_and(|w| Arc::ptr_eq(w, &done)) {
                *waiter = None;
            }
        }

        let outcome = slot.lock().take();
        match outcome {
            Some(outcome) => {
                sink.finish(outcome);
            }
            None => {
                trace!("sync woken by cancel");
            }
        }
    }

    fn abort(&self, inner: &CallRef<T>) {
        inner.cancel();
        let waiter = self.waiter.lock().take();
        if let Some(waiter) = waiter {
            waiter.release(1);
        }
    }
}

impl fmt::Debug for SyncWait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncWait")
            .field("waiting", &self.is_waiting())
            .finish()
    }
}
