//! Sequencing: continue with a call built from the first call's outcome.
//!
//! When the inner call completes, the continuation receives its outcome and
//! returns the next call, which is started; the decorator finishes with the
//! next call's outcome. A continuation that returns no call finishes the
//! decorator with [`CallError::nil_call`]: a missing continuation is an
//! ordinary error outcome the caller can handle, not a panic.
//!
//! The cancellation check and the continuation run under the decorator's
//! lock; the next call is started after it is released. A concurrent
//! `cancel` either prevents the continuation from running at all or cancels
//! the call it produced, including one started just after the cancel.

use super::wrapped::Relay;
use crate::call::{CallRef, Sink};
use crate::error::CallError;
use crate::tracing_compat::trace;
use crate::types::Outcome;
use parking_lot::Mutex;
use std::sync::Arc;

type Continuation<T, U> = Arc<dyn Fn(Outcome<T>) -> Option<CallRef<U>> + Send + Sync + 'static>;

/// What a continuation may return: a call, or possibly no call.
pub trait NextCall<U> {
    /// Converts into the optional next call.
    fn into_next(self) -> Option<CallRef<U>>;
}

impl<U> NextCall<U> for CallRef<U> {
    fn into_next(self) -> Option<CallRef<U>> {
        Some(self)
    }
}

impl<U> NextCall<U> for Option<CallRef<U>> {
    fn into_next(self) -> Self {
        self
    }
}

/// Relay chaining a continuation call after the inner call.
pub struct Sequence<T, U> {
    continuation: Continuation<T, U>,
    next: Arc<Mutex<Option<CallRef<U>>>>,
}

impl<T, U> Sequence<T, U> {
    /// Creates the relay.
    pub fn new<C>(continuation: impl Fn(Outcome<T>) -> C + Send + Sync + 'static) -> Self
    where
        C: NextCall<U>,
    {
        Self {
            continuation: Arc::new(move |outcome: Outcome<T>| -> Option<CallRef<U>> {
                continuation(outcome).into_next()
            }),
            next: Arc::new(Mutex::new(None)),
        }
    }

    /// The call produced by the continuation in the latest attempt, if any.
    #[must_use]
    pub fn next_call(&self) -> Option<CallRef<U>> {
        self.next.lock().clone()
    }
}

impl<T: Send + 'static, U: Send + 'static> Relay<T, U> for Sequence<T, U> {
    const NAME: &'static str = "sequence";

    fn launch(&self, inner: &CallRef<T>, sink: Sink<U>) {
        let continuation = Arc::clone(&self.continuation);
        let next_slot = Arc::clone(&self.next);
        *next_slot.lock() = None;

        inner.start(Box::new(move |outcome| {
            let next = {
                let _guard = sink.lock();
                if sink.is_cancelled() {
                    trace!("sequence cancelled before continuation");
                    return;
                }
                let Some(next) = continuation(outcome) else {
                    sink.fail(CallError::nil_call());
                    return;
                };
                trace!("sequence continuation produced");
                *next_slot.lock() = Some(Arc::clone(&next));
                next
            };
            let deliver = sink.clone();
            next.start(Box::new(move |outcome| {
                deliver.finish(outcome);
            }));
            if sink.was_cancelled() {
                next.cancel();
            }
        }));
    }

    fn abort(&self, inner: &CallRef<T>) {
        // The next call first: it may be blocking the thread that is still
        // inside the inner call's callback.
        let next = self.next.lock().clone();
        if let Some(next) = next {
            next.cancel();
        }
        inner.cancel();
    }

    fn executing(&self, inner: &CallRef<T>) -> bool {
        inner.is_executing()
            || self
                .next
                .lock()
                .as_ref()
                .is_some_and(|next| next.is_executing())
    }
}
