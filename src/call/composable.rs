//! A call pre-loaded with a known outcome.

use super::core::CallCore;
use super::{Call, CallRef, Callback};
use crate::error::CallError;
use crate::lifetime::Depositable;
use crate::runtime::Dispatcher;
use crate::types::Outcome;
use std::fmt;
use std::sync::Arc;

/// A call that delivers a fixed outcome.
///
/// By default delivery is deferred to the work queue so the callback never
/// runs inside `start`. [`synchronous`](Self::synchronous) delivers inline.
pub struct ComposableCall<T> {
    core: Arc<CallCore<T>>,
    dispatcher: Dispatcher,
    outcome: Outcome<T>,
    synchronous: bool,
}

impl<T: Clone + Send + Sync + 'static> ComposableCall<T> {
    /// Creates a call that delivers `outcome`.
    #[must_use]
    pub fn new(dispatcher: Dispatcher, outcome: Outcome<T>) -> Self {
        Self {
            core: CallCore::new(),
            dispatcher,
            outcome,
            synchronous: false,
        }
    }

    /// Creates a call that succeeds with `value`.
    #[must_use]
    pub fn value(dispatcher: Dispatcher, value: T) -> Self {
        Self::new(dispatcher, Outcome::Ok(value))
    }

    /// Creates a call that fails with `error`.
    #[must_use]
    pub fn error(dispatcher: Dispatcher, error: CallError) -> Self {
        Self::new(dispatcher, Outcome::Err(error))
    }

    /// Sets whether the outcome is delivered inline from `start`.
    #[must_use]
    pub const fn synchronous(mut self, synchronous: bool) -> Self {
        self.synchronous = synchronous;
        self
    }

    /// True if the outcome is delivered inline.
    #[must_use]
    pub const fn is_synchronous(&self) -> bool {
        self.synchronous
    }

    /// Erases the concrete type.
    #[must_use]
    pub fn into_ref(self) -> CallRef<T> {
        Arc::new(self)
    }
}

impl<T: Clone + Send + Sync + 'static> Call<T> for ComposableCall<T> {
    fn start(&self, callback: Callback<T>) {
        self.core.start(callback, None, |sink| {
            let outcome = self.outcome.clone();
            if self.synchronous {
                sink.finish(outcome);
            } else {
                self.dispatcher.spawn(move || {
                    sink.finish(outcome);
                });
            }
        });
    }

    fn is_executing(&self) -> bool {
        self.core.is_executing()
    }

    fn cancel(&self) {
        self.core.cancel(|| {});
    }

    fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

impl<T: Clone + Send + Sync + 'static> Depositable for ComposableCall<T> {
    fn should_remove(&self) -> bool {
        !self.is_executing()
    }

    fn will_remove(&self) {
        self.cancel();
    }
}

impl<T: fmt::Debug> fmt::Debug for ComposableCall<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposableCall")
            .field("outcome", &self.outcome)
            .field("synchronous", &self.synchronous)
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::LabExecutor;
    use crate::test_utils::{Recorder, init_test_logging};

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn asynchronous_by_default() {
        init_test("asynchronous_by_default");
        let lab = LabExecutor::new();
        let call = ComposableCall::value(lab.dispatcher(), "x");
        assert!(!call.is_synchronous());
        let recorder = Recorder::new();
        call.start(recorder.callback());
        assert_eq!(recorder.count(), 0);
        assert_eq!(lab.pending_work(), 1);
        lab.run_until_idle();
        assert_eq!(recorder.take(), vec![Outcome::Ok("x")]);
        crate::test_complete!("asynchronous_by_default");
    }

    #[test]
    fn synchronous_delivers_inside_start() {
        init_test("synchronous_delivers_inside_start");
        let lab = LabExecutor::new();
        let call = ComposableCall::error(lab.dispatcher(), CallError::nil_call()).synchronous(true);
        let recorder: Recorder<u8> = Recorder::new();
        call.start(recorder.callback());
        let got = recorder.take();
        assert_eq!(got.len(), 1);
        assert!(got[0].as_error().is_some_and(CallError::is_nil_call));
        assert_eq!(lab.pending_work(), 0);
        crate::test_complete!("synchronous_delivers_inside_start");
    }

    #[test]
    fn can_be_restarted_after_finishing() {
        init_test("can_be_restarted_after_finishing");
        let lab = LabExecutor::new();
        let call = ComposableCall::value(lab.dispatcher(), 3).synchronous(true);
        let recorder = Recorder::new();
        call.start(recorder.callback());
        call.start(recorder.callback());
        assert_eq!(recorder.take(), vec![Outcome::Ok(3), Outcome::Ok(3)]);
        crate::test_complete!("can_be_restarted_after_finishing");
    }

    #[test]
    fn cancel_drops_queued_delivery() {
        init_test("cancel_drops_queued_delivery");
        let lab = LabExecutor::new();
        let call = ComposableCall::value(lab.dispatcher(), 1);
        let recorder = Recorder::new();
        call.start(recorder.callback());
        call.cancel();
        lab.run_until_idle();
        assert_eq!(recorder.count(), 0);
        crate::test_complete!("cancel_drops_queued_delivery");
    }
}
