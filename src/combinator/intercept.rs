//! Side-effect observation of an outcome.

use super::wrapped::Relay;
use crate::call::{CallRef, Sink};
use crate::types::Outcome;
use std::sync::Arc;

type SideEffect<T> = Arc<dyn Fn(&Outcome<T>) + Send + Sync + 'static>;

/// Relay that shows the inner outcome to a side effect, then forwards it
/// unchanged.
///
/// The side effect runs on the delivering thread before the outer callback
/// and must not block.
pub struct Intercept<T> {
    side_effect: SideEffect<T>,
}

impl<T> Intercept<T> {
    /// Creates the relay.
    pub fn new(side_effect: impl Fn(&Outcome<T>) + Send + Sync + 'static) -> Self {
        Self {
            side_effect: Arc::new(side_effect),
        }
    }
}

impl<T: Send + 'static> Relay<T, T> for Intercept<T> {
    const NAME: &'static str = "intercept";

    fn launch(&self, inner: &CallRef<T>, sink: Sink<T>) {
        let side_effect = Arc::clone(&self.side_effect);
        inner.start(Box::new(move |outcome| {
            side_effect(&outcome);
            sink.finish(outcome);
        }));
    }
}
