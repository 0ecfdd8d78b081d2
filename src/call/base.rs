//! A call whose behavior is supplied as closures.

use super::core::{CallCore, FinishHook, Sink};
use super::{Call, CallRef, Callback};
use crate::lifetime::Depositable;
use crate::runtime::Dispatcher;
use crate::types::Outcome;
use std::fmt;
use std::sync::Arc;

type StartHook<T> = Box<dyn Fn(Sink<T>) + Send + Sync + 'static>;
type Hook = Box<dyn Fn() + Send + Sync + 'static>;

/// A call driven by a start hook.
///
/// The start hook runs under the call's lock each time the call starts and
/// receives a [`Sink`] for that attempt. It may finish inline or hand the
/// sink to other work and return.
///
/// ```
/// use lifecall::call::{BaseCall, CallRef};
/// use lifecall::runtime::LabExecutor;
///
/// let lab = LabExecutor::new();
/// let workers = lab.dispatcher();
/// let call: CallRef<u8> = BaseCall::new(lab.dispatcher(), move |sink| {
///     workers.spawn(move || {
///         sink.succeed(7);
///     });
/// })
/// .into_ref();
/// # let _ = call;
/// ```
pub struct BaseCall<T> {
    core: Arc<CallCore<T>>,
    dispatcher: Dispatcher,
    on_start: StartHook<T>,
    on_cancel: Option<Hook>,
    on_finish: Option<FinishHook<T>>,
    on_did_add: Option<Hook>,
}

impl<T: Send + 'static> BaseCall<T> {
    /// Creates a call that runs `on_start` when started.
    pub fn new(dispatcher: Dispatcher, on_start: impl Fn(Sink<T>) + Send + Sync + 'static) -> Self {
        Self {
            core: CallCore::new(),
            dispatcher,
            on_start: Box::new(on_start),
            on_cancel: None,
            on_finish: None,
            on_did_add: None,
        }
    }

    /// Runs `hook` when an executing call is cancelled.
    #[must_use]
    pub fn on_cancel(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_cancel = Some(Box::new(hook));
        self
    }

    /// Runs `hook` with the outcome just before the callback receives it.
    #[must_use]
    pub fn on_finish(mut self, hook: impl Fn(&Outcome<T>) + Send + Sync + 'static) -> Self {
        self.on_finish = Some(Arc::new(hook));
        self
    }

    /// Runs `hook` each time the call is registered with a lifetime.
    #[must_use]
    pub fn on_did_add(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_did_add = Some(Box::new(hook));
        self
    }

    /// Erases the concrete type.
    #[must_use]
    pub fn into_ref(self) -> CallRef<T> {
        Arc::new(self)
    }
}

impl<T: Send + 'static> Call<T> for BaseCall<T> {
    fn start(&self, callback: Callback<T>) {
        self.core
            .start(callback, self.on_finish.clone(), |sink| (self.on_start)(sink));
    }

    fn is_executing(&self) -> bool {
        self.core.is_executing()
    }

    fn cancel(&self) {
        self.core.cancel(|| {
            if let Some(hook) = &self.on_cancel {
                hook();
            }
        });
    }

    fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

impl<T: Send + 'static> Depositable for BaseCall<T> {
    fn should_remove(&self) -> bool {
        !self.is_executing()
    }

    fn will_remove(&self) {
        self.cancel();
    }

    fn did_add(&self) {
        if let Some(hook) = &self.on_did_add {
            hook();
        }
    }
}

impl<T> fmt::Debug for BaseCall<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseCall")
            .field("core", &self.core)
            .field("on_cancel", &self.on_cancel.is_some())
            .field("on_finish", &self.on_finish.is_some())
            .field("on_did_add", &self.on_did_add.is_some())
            .finish_non_exhaustive()
    }
}
