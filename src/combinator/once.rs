//! Idempotent start.

use super::wrapped::Relay;
use crate::call::{CallRef, Sink};
use std::sync::atomic::{AtomicBool, Ordering};

/// Relay that admits only the first `start`.
///
/// Later starts are ignored for the life of the decorator, even after the
/// first attempt has finished or been cancelled.
#[derive(Debug, Default)]
pub struct Once {
    called: AtomicBool,
}

impl Once {
    /// Creates the relay.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            called: AtomicBool::new(false),
        }
    }

    /// True once a start has been admitted.
    #[must_use]
    pub fn is_called(&self) -> bool {
        self.called.load(Ordering::Acquire)
    }
}

impl<T: Send + 'static> Relay<T, T> for Once {
    const NAME: &'static str = "once";

    fn admit(&self) -> bool {
        !self.called.swap(true, Ordering::AcqRel)
    }

    fn launch(&self, inner: &CallRef<T>, sink: Sink<T>) {
        inner.start(Box::new(move |outcome| {
            sink.finish(outcome);
        }));
    }
}
