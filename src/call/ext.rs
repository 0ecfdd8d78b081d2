//! Fluent decorator surface for [`CallRef`].

use super::{CallRef, DepositedCall};
use crate::combinator::{
    Intercept, MainContext, MapResult, NextCall, Once, Sequence, SyncWait, Timeout, Wrapped,
};
use crate::lifetime::Lifetime;
use crate::types::Outcome;
use std::sync::Arc;
use std::time::Duration;

/// Decorators available on every [`CallRef`].
///
/// Each method wraps the call and returns the decorated call; the original
/// becomes the decorator's inner call.
pub trait CallExt<T: Send + 'static>: Sized {
    /// Transforms the outcome before delivery.
    #[must_use]
    fn map_result<U: Send + 'static>(
        self,
        transform: impl Fn(Outcome<T>) -> Outcome<U> + Send + Sync + 'static,
    ) -> CallRef<U>;

    /// Ignores every start after the first.
    #[must_use]
    fn once(self) -> CallRef<T>;

    /// Shows the outcome to `side_effect`, then delivers it unchanged.
    #[must_use]
    fn intercept(self, side_effect: impl Fn(&Outcome<T>) + Send + Sync + 'static) -> CallRef<T>;

    /// Delivers the outcome on the main context.
    #[must_use]
    fn main_context_callback(self) -> CallRef<T>;

    /// Finishes with a timeout error unless the call completes within
    /// `duration`.
    #[must_use]
    fn timeout(self, duration: Duration) -> CallRef<T>;

    /// Makes `start` block until the call completes.
    ///
    /// # Panics
    ///
    /// The returned call panics if started on the main context.
    #[must_use]
    fn sync(self) -> CallRef<T>;

    /// Continues with the call `continuation` builds from the outcome.
    #[must_use]
    fn sequence<U, C>(
        self,
        continuation: impl Fn(Outcome<T>) -> C + Send + Sync + 'static,
    ) -> CallRef<U>
    where
        U: Send + 'static,
        C: NextCall<U>;

    /// Alias for [`sequence`](Self::sequence).
    #[must_use]
    fn append<U, C>(
        self,
        continuation: impl Fn(Outcome<T>) -> C + Send + Sync + 'static,
    ) -> CallRef<U>
    where
        U: Send + 'static,
        C: NextCall<U>,
    {
        self.sequence(continuation)
    }

    /// Registers the call under `lifetime` and returns it for chaining.
    ///
    /// The owner cancels the call when it dies and evicts it under pressure
    /// once it is no longer executing.
    #[must_use]
    fn deposit(self, lifetime: &Lifetime, id: Option<&str>) -> CallRef<T>;
}

impl<T: Send + 'static> CallExt<T> for CallRef<T> {
    fn map_result<U: Send + 'static>(
        self,
        transform: impl Fn(Outcome<T>) -> Outcome<U> + Send + Sync + 'static,
    ) -> CallRef<U> {
        Wrapped::new(self, MapResult::new(transform)).into_ref()
    }

    fn once(self) -> CallRef<T> {
        Wrapped::new(self, Once::new()).into_ref()
    }

    fn intercept(self, side_effect: impl Fn(&Outcome<T>) + Send + Sync + 'static) -> CallRef<T> {
        Wrapped::new(self, Intercept::new(side_effect)).into_ref()
    }

    fn main_context_callback(self) -> CallRef<T> {
        Wrapped::new(self, MainContext).into_ref()
    }

    fn timeout(self, duration: Duration) -> CallRef<T> {
        Wrapped::new(self, Timeout::new(duration)).into_ref()
    }

    fn sync(self) -> CallRef<T> {
        Wrapped::new(self, SyncWait::new()).into_ref()
    }

    fn sequence<U, C>(
        self,
        continuation: impl Fn(Outcome<T>) -> C + Send + Sync + 'static,
    ) -> CallRef<U>
    where
        U: Send + 'static,
        C: NextCall<U>,
    {
        Wrapped::new(self, Sequence::new(continuation)).into_ref()
    }

    fn deposit(self, lifetime: &Lifetime, id: Option<&str>) -> CallRef<T> {
        lifetime.deposit(Arc::new(DepositedCall(Arc::clone(&self))), id);
        self
    }
}
