//! The single decorator every combinator is built from.
//!
//! A [`Wrapped`] owns one inner call plus a [`Relay`] strategy. The wrapper
//! keeps its own [`CallCore`], so the at-most-once and cancel-wins rules hold
//! for the decorated call independently of the inner one. The relay decides
//! how the inner call is started and how its outcome reaches the wrapper's
//! [`Sink`].
//!
//! Cancellation flows inward: cancelling the wrapper cancels its own core
//! first, then asks the relay to abort, which by default cancels the inner
//! call. The wrapper's lock is held only for the state transition of
//! `start`, never while the relay launches the inner call, so a `cancel`
//! from another thread always reaches the inner call even when the launch
//! blocks. A cancel that lands mid-launch is caught by a re-check after the
//! launch returns.

use crate::call::{Call, CallCore, CallRef, Callback, Sink};
use crate::lifetime::Depositable;
use crate::runtime::Dispatcher;
use crate::tracing_compat::trace;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Combinator-specific behavior plugged into a [`Wrapped`] call.
pub trait Relay<T, U>: Send + Sync + 'static {
    /// Short name used in logs.
    const NAME: &'static str;

    /// Whether a `start` is accepted. Checked under the wrapper's lock.
    fn admit(&self) -> bool {
        true
    }

    /// Starts `inner` and arranges for its outcome to reach `sink`.
    ///
    /// Runs without the wrapper's lock. [`abort`](Self::abort) may run
    /// concurrently, and runs again after the launch if the attempt was
    /// cancelled meanwhile.
    fn launch(&self, inner: &CallRef<T>, sink: Sink<U>);

    /// Cancels whatever the relay has in flight.
    fn abort(&self, inner: &CallRef<T>) {
        inner.cancel();
    }

    /// Whether the decorated call counts as executing.
    fn executing(&self, inner: &CallRef<T>) -> bool {
        inner.is_executing()
    }
}

/// A call decorating an inner call with a [`Relay`].
pub struct Wrapped<T, U, R> {
    core: Arc<CallCore<U>>,
    inner: CallRef<T>,
    relay: R,
    dispatcher: Dispatcher,
    _marker: PhantomData<fn() -> T>,
}

impl<T, U, R> Wrapped<T, U, R>
where
    T: Send + 'static,
    U: Send + 'static,
    R: Relay<T, U>,
{
    /// Wraps `inner`. The wrapper dispatches onto the inner call's executor.
    #[must_use]
    pub fn new(inner: CallRef<T>, relay: R) -> Self {
        let dispatcher = inner.dispatcher().clone();
        Self {
            core: CallCore::new(),
            inner,
            relay,
            dispatcher,
            _marker: PhantomData,
        }
    }

    /// The wrapped call.
    #[must_use]
    pub const fn inner(&self) -> &CallRef<T> {
        &self.inner
    }

    /// The relay strategy.
    #[must_use]
    pub const fn relay(&self) -> &R {
        &self.relay
    }

    /// Erases the concrete type.
    #[must_use]
    pub fn into_ref(self) -> CallRef<U> {
        Arc::new(self)
    }
}

impl<T, U, R> Call<U> for Wrapped<T, U, R>
where
    T: Send + 'static,
    U: Send + 'static,
    R: Relay<T, U>,
{
    fn start(&self, callback: Callback<U>) {
        let sink = {
            let _guard = self.core.lock();
            if !self.relay.admit() {
                trace!(relay = R::NAME, "start ignored");
                return;
            }
            self.core.begin(callback, None)
        };
        self.relay.launch(&self.inner, sink.clone());
        if sink.was_cancelled() {
            trace!(relay = R::NAME, "cancelled during launch");
            self.relay.abort(&self.inner);
        }
    }

    fn is_executing(&self) -> bool {
        self.relay.executing(&self.inner)
    }

    fn cancel(&self) {
        self.core.cancel(|| {
            trace!(relay = R::NAME, "decorator cancelled");
        });
        self.relay.abort(&self.inner);
    }

    fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

impl<T, U, R> Depositable for Wrapped<T, U, R>
where
    T: Send + 'static,
    U: Send + 'static,
    R: Relay<T, U>,
{
    fn should_remove(&self) -> bool {
        !self.is_executing()
    }

    fn will_remove(&self) {
        self.cancel();
    }

    fn did_add(&self) {
        self.inner.did_add();
    }
}

impl<T, U, R> fmt::Debug for Wrapped<T, U, R>
where
    R: Relay<T, U>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wrapped")
            .field("relay", &R::NAME)
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

/// Relay that passes the inner outcome through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl<T: Send + 'static> Relay<T, T> for PassThrough {
    const NAME: &'static str = "pass_through";

    fn launch(&self, inner: &CallRef<T>, sink: Sink<T>) {
        inner.start(Box::new(move |outcome| {
            sink.finish(outcome);
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::{BaseCall, ComposableCall};
    use crate::runtime::LabExecutor;
    use crate::test_utils::{Recorder, init_test_logging};
    use crate::types::Outcome;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn pass_through_delivers_inner_outcome() {
        init_test("pass_through_delivers_inner_outcome");
        let lab = LabExecutor::new();
        let inner = ComposableCall::value(lab.dispatcher(), 9).into_ref();
        let wrapped = Wrapped::new(inner, PassThrough);
        let recorder = Recorder::new();
        wrapped.start(recorder.callback());
        assert!(wrapped.is_executing());
        lab.run_until_idle();
        assert!(!wrapped.is_executing());
        assert_eq!(recorder.take(), vec![Outcome::Ok(9)]);
        crate::test_complete!("pass_through_delivers_inner_outcome");
    }

    #[test]
    fn cancel_propagates_inward() {
        init_test("cancel_propagates_inward");
        let lab = LabExecutor::new();
        let inner: CallRef<u8> = BaseCall::new(lab.dispatcher(), |_sink: Sink<u8>| {}).into_ref();
        let wrapped = Wrapped::new(Arc::clone(&inner), PassThrough);
        let recorder = Recorder::new();
        wrapped.start(recorder.callback());
        assert!(inner.is_executing());
        wrapped.cancel();
        assert!(!inner.is_executing());
        assert!(wrapped.should_remove());
        crate::test_complete!("cancel_propagates_inward");
    }

    #[test]
    fn wrapper_inherits_inner_dispatcher() {
        init_test("wrapper_inherits_inner_dispatcher");
        let lab = LabExecutor::new();
        let inner = ComposableCall::value(lab.dispatcher(), ()).into_ref();
        let wrapped = Wrapped::new(inner, PassThrough);
        let seen = Arc::new(parking_lot::Mutex::new(false));
        let s = Arc::clone(&seen);
        wrapped.dispatcher().spawn(move || *s.lock() = true);
        lab.run_until_idle();
        assert!(*seen.lock());
        crate::test_complete!("wrapper_inherits_inner_dispatcher");
    }

    #[test]
    fn did_add_reaches_the_inner_call() {
        init_test("did_add_reaches_the_inner_call");
        let lab = LabExecutor::new();
        let added = Arc::new(AtomicUsize::new(0));
        let a = Arc::clone(&added);
        let inner: CallRef<u8> = BaseCall::new(lab.dispatcher(), |_sink: Sink<u8>| {})
            .on_did_add(move || {
                a.fetch_add(1, Ordering::SeqCst);
            })
            .into_ref();
        let wrapped = Wrapped::new(inner, PassThrough);
        wrapped.did_add();
        assert_eq!(added.load(Ordering::SeqCst), 1);
        crate::test_complete!("did_add_reaches_the_inner_call");
    }

    #[test]
    fn cancel_during_launch_aborts_the_inner_call() {
        init_test("cancel_during_launch_aborts_the_inner_call");
        let lab = LabExecutor::new();
        let inner: CallRef<u8> = BaseCall::new(lab.dispatcher(), |_sink: Sink<u8>| {}).into_ref();
        let target: Arc<parking_lot::Mutex<Option<Arc<Wrapped<u8, u8, CancelOnLaunch>>>>> =
            Arc::new(parking_lot::Mutex::new(None));
        let wrapped = Arc::new(Wrapped::new(
            Arc::clone(&inner),
            CancelOnLaunch(Arc::clone(&target)),
        ));
        *target.lock() = Some(Arc::clone(&wrapped));

        let recorder = Recorder::new();
        wrapped.start(recorder.callback());
        assert!(!inner.is_executing(), "inner started after cancel was re-cancelled");
        assert!(!wrapped.is_executing());
        lab.run_until_idle();
        assert_eq!(recorder.count(), 0);
        target.lock().take();
        crate::test_complete!("cancel_during_launch_aborts_the_inner_call");
    }

    /// Cancels its own wrapper before starting the inner call.
    struct CancelOnLaunch(Arc<parking_lot::Mutex<Option<Arc<Wrapped<u8, u8, Self>>>>>);

    impl Relay<u8, u8> for CancelOnLaunch {
        const NAME: &'static str = "cancel_on_launch";

        fn launch(&self, inner: &CallRef<u8>, sink: Sink<u8>) {
            let wrapper = self.0.lock().clone();
            if let Some(wrapper) = wrapper {
                wrapper.cancel();
            }
            inner.start(Box::new(move |outcome| {
                sink.finish(outcome);
            }));
        }
    }
}
