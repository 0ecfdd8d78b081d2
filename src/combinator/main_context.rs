//! Redirect completion onto the main context.

use super::wrapped::Relay;
use crate::call::{CallRef, Sink};

/// Relay that delivers the inner outcome from the main context.
///
/// Delivery is always queued, even when the inner call already completes on
/// the main context, so the outer callback never runs inside `start`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MainContext;

impl<T: Send + 'static> Relay<T, T> for MainContext {
    const NAME: &'static str = "main_context";

    fn launch(&self, inner: &CallRef<T>, sink: Sink<T>) {
        let dispatcher = inner.dispatcher().clone();
        inner.start(Box::new(move |outcome| {
            dispatcher.main(move || {
                sink.finish(outcome);
            });
        }));
    }
}
