//! The call state machine shared by every call variant.
//!
//! ```text
//!            start                finish (not cancelled)
//!   Idle ─────────────► Executing ──────────────────────► Finished
//!                           │
//!                           │ cancel
//!                           ▼
//!                       Cancelled
//! ```
//!
//! All transitions on one [`CallCore`] are serialized by its reentrant
//! [`Lock`]. `start` holds the lock while the start hook runs, so a call that
//! completes synchronously re-enters the lock on the same thread. `finish`
//! holds it while the completion callback runs, which is what makes
//! cancellation authoritative: once `cancel` returns, no callback is running
//! and none will run.
//!
//! Each `start` opens a new attempt. A [`Sink`] belongs to exactly one
//! attempt; finishing through a sink from an earlier attempt is ignored.

use super::Callback;
use crate::sync::{Lock, LockGuard};
use crate::tracing_compat::trace;
use crate::types::Outcome;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Observer run under the call's lock just before the callback is invoked.
pub type FinishHook<T> = Arc<dyn Fn(&Outcome<T>) + Send + Sync + 'static>;

struct CoreState<T> {
    callback: Option<Callback<T>>,
    executing: bool,
    cancelled: bool,
    attempt: u64,
}

/// State holder behind every call.
pub struct CallCore<T> {
    lock: Lock,
    state: Mutex<CoreState<T>>,
}

impl<T: Send + 'static> CallCore<T> {
    /// Creates an idle core.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            lock: Lock::new(),
            state: Mutex::new(CoreState {
                callback: None,
                executing: false,
                cancelled: false,
                attempt: 0,
            }),
        })
    }

    /// Acquires the call's lock.
    pub fn lock(&self) -> LockGuard<'_> {
        self.lock.lock()
    }

    /// Enters `Executing`: stores `callback`, clears the cancelled flag and
    /// runs `on_start` with a sink for this attempt, all under the lock.
    pub fn start(
        self: &Arc<Self>,
        callback: Callback<T>,
        finish_hook: Option<FinishHook<T>>,
        on_start: impl FnOnce(Sink<T>),
    ) {
        let _guard = self.lock.lock();
        on_start(self.begin(callback, finish_hook));
    }

    /// Enters `Executing` and returns the sink of the new attempt.
    ///
    /// Unlike [`start`](Self::start), the caller does the launching work
    /// itself, and may do it after releasing the lock.
    pub fn begin(
        self: &Arc<Self>,
        callback: Callback<T>,
        finish_hook: Option<FinishHook<T>>,
    ) -> Sink<T> {
        let _guard = self.lock.lock();
        let (attempt, replaced) = {
            let mut state = self.state.lock();
            let replaced = state.callback.replace(callback);
            state.cancelled = false;
            state.executing = true;
            state.attempt += 1;
            (state.attempt, replaced)
        };
        if replaced.is_some() {
            trace!(attempt, "call restarted; previous attempt discarded");
        }
        drop(replaced);
        trace!(attempt, "call started");
        Sink {
            core: Arc::clone(self),
            attempt,
            finish_hook,
        }
    }

    /// Enters `Cancelled` and drops the stored callback.
    ///
    /// `on_cancel` runs under the lock only if the call was executing.
    /// Returns whether it was.
    pub fn cancel(&self, on_cancel: impl FnOnce()) -> bool {
        let _guard = self.lock.lock();
        let (was_executing, callback) = {
            let mut state = self.state.lock();
            let was_executing = state.executing;
            state.executing = false;
            state.cancelled = true;
            (was_executing, state.callback.take())
        };
        drop(callback);
        if was_executing {
            trace!("call cancelled");
            on_cancel();
        }
        was_executing
    }

    /// True while an attempt is in progress.
    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.state.lock().executing
    }

    /// True if the last attempt was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.lock().cancelled
    }

    fn finish(&self, attempt: u64, outcome: Outcome<T>, hook: Option<&FinishHook<T>>) -> bool {
        let _guard = self.lock.lock();
        let callback = {
            let mut state = self.state.lock();
            if state.cancelled {
                trace!(attempt, "finish after cancel dropped");
                return false;
            }
            if state.attempt != attempt || !state.executing {
                trace!(attempt, current = state.attempt, "stale finish dropped");
                return false;
            }
            state.executing = false;
            state.callback.take()
        };
        if let Some(hook) = hook {
            hook(&outcome);
        }
        match callback {
            Some(callback) => {
                callback(outcome);
                true
            }
            None => false,
        }
    }

    fn cancelled_in(&self, attempt: u64) -> bool {
        let state = self.state.lock();
        state.attempt == attempt && state.cancelled
    }

    fn is_current(&self, attempt: u64) -> bool {
        let state = self.state.lock();
        state.attempt == attempt && state.executing && !state.cancelled
    }
}

impl<T> fmt::Debug for CallCore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CallCore")
            .field("executing", &state.executing)
            .field("cancelled", &state.cancelled)
            .field("attempt", &state.attempt)
            .finish()
    }
}

/// Completion handle for one attempt of a call.
///
/// Cloneable; only the first `finish` of the attempt is delivered.
pub struct Sink<T> {
    core: Arc<CallCore<T>>,
    attempt: u64,
    finish_hook: Option<FinishHook<T>>,
}

impl<T: Send + 'static> Sink<T> {
    /// Finishes the attempt with `outcome`.
    ///
    /// Returns true if a callback received it. Returns false when the call
    /// was cancelled, already finished, or restarted since this sink was
    /// handed out.
    pub fn finish(&self, outcome: Outcome<T>) -> bool {
        self.core
            .finish(self.attempt, outcome, self.finish_hook.as_ref())
    }

    /// Finishes with a success value.
    pub fn succeed(&self, value: T) -> bool {
        self.finish(Outcome::Ok(value))
    }

    /// Finishes with an error.
    pub fn fail(&self, error: crate::error::CallError) -> bool {
        self.finish(Outcome::Err(error))
    }

    /// Acquires the owning call's lock.
    ///
    /// Held across a check of [`is_cancelled`](Self::is_cancelled) and the
    /// work that depends on it, so a concurrent `cancel` cannot interleave.
    pub fn lock(&self) -> LockGuard<'_> {
        self.core.lock()
    }

    /// True if finishing now would be dropped.
    ///
    /// Long-running work may poll this to stop early.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        !self.core.is_current(self.attempt)
    }

    /// True if this attempt was ended by `cancel`.
    ///
    /// Unlike [`is_cancelled`](Self::is_cancelled), false once the attempt
    /// finished normally or was superseded by a restart.
    #[must_use]
    pub fn was_cancelled(&self) -> bool {
        self.core.cancelled_in(self.attempt)
    }
}

impl<T> Clone for Sink<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            attempt: self.attempt,
            finish_hook: self.finish_hook.clone(),
        }
    }
}

impl<T> fmt::Debug for Sink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("attempt", &self.attempt)
            .finish_non_exhaustive()
    }
}
