//! Composable, cancellable asynchronous calls.
//!
//! A [`Call`] is started with a callback, delivers at most one [`Outcome`]
//! per start, and never delivers after it has been cancelled. Calls are
//! shared as [`CallRef`] and composed with the decorators on [`CallExt`].
//!
//! Every call is also [`Depositable`]: it can be bound to an owner's
//! [`Lifetime`](crate::lifetime::Lifetime), which cancels it when the owner
//! dies and evicts it under pressure once it has stopped executing.
//!
//! # Example
//!
//! ```
//! use lifecall::call::{Call, CallExt, CallRef, ComposableCall};
//! use lifecall::runtime::LabExecutor;
//! use lifecall::types::Outcome;
//! use std::sync::{Arc, Mutex};
//!
//! let lab = LabExecutor::new();
//! let dispatcher = lab.dispatcher();
//! let call: CallRef<i32> = ComposableCall::value(dispatcher.clone(), 20).into_ref();
//! let doubled = call.map_result(|o| o.map(|v| v * 2));
//!
//! let seen = Arc::new(Mutex::new(None));
//! let slot = Arc::clone(&seen);
//! doubled.start(Box::new(move |o| *slot.lock().unwrap() = Some(o)));
//! lab.run_until_idle();
//! assert_eq!(*seen.lock().unwrap(), Some(Outcome::Ok(40)));
//! ```

pub mod base;
pub mod composable;
pub mod core;
pub mod ext;

pub use self::core::{CallCore, FinishHook, Sink};
pub use base::BaseCall;
pub use composable::ComposableCall;
pub use ext::CallExt;

use crate::lifetime::Depositable;
use crate::runtime::Dispatcher;
use crate::types::Outcome;
use std::sync::Arc;

/// Completion callback attached by [`Call::start`].
pub type Callback<T> = Box<dyn FnOnce(Outcome<T>) + Send + 'static>;

/// Shared handle to any call producing `T`.
pub type CallRef<T> = Arc<dyn Call<T>>;

/// A cancellable unit of asynchronous work.
///
/// The [`Depositable`] side maps onto the call: `should_remove` is
/// `!is_executing()` and `will_remove` is `cancel()`.
pub trait Call<T>: Depositable {
    /// Starts the call. `callback` receives the outcome at most once.
    fn start(&self, callback: Callback<T>);

    /// True while the call is running.
    fn is_executing(&self) -> bool;

    /// Cancels the call. The callback will not be invoked afterwards.
    fn cancel(&self);

    /// The executor the call dispatches onto.
    fn dispatcher(&self) -> &Dispatcher;
}

/// Adapter that registers a call with a lifetime without relying on trait
/// upcasting from `dyn Call<T>` to `dyn Depositable`.
pub(crate) struct DepositedCall<T>(pub(crate) CallRef<T>);

impl<T: Send + 'static> Depositable for DepositedCall<T> {
    fn should_remove(&self) -> bool {
        self.0.should_remove()
    }

    fn will_remove(&self) {
        self.0.will_remove();
    }

    fn did_add(&self) {
        self.0.did_add();
    }
}
