//! Timeout combinator: race an inner call against a deadline.
//!
//! Starting the decorator starts the inner call and arms a one-shot deadline
//! on the main context. Whichever of the two is observed first wins:
//!
//! - inner completes first: its outcome is delivered and the deadline, when
//!   it fires later, does nothing. The inner call is never cancelled by the
//!   timeout path.
//! - deadline fires first: the inner call is cancelled and the decorator
//!   finishes with [`CallError::timeout`].
//!
//! Each start arms its own deadline, so a restarted decorator is not timed
//! out by the deadline of an earlier attempt.

use super::wrapped::Relay;
use crate::call::{CallRef, Sink};
use crate::error::CallError;
use crate::tracing_compat::{debug, trace};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Relay finishing with a timeout error if the inner call is too slow.
#[derive(Debug, Clone, Copy)]
pub struct Timeout {
    duration: Duration,
}

impl Timeout {
    /// Creates the relay.
    #[must_use]
    pub const fn new(duration: Duration) -> Self {
        Self { duration }
    }

    /// The configured deadline, relative to start.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }
}

impl<T: Send + 'static> Relay<T, T> for Timeout {
    const NAME: &'static str = "timeout";

    fn launch(&self, inner: &CallRef<T>, sink: Sink<T>) {
        let settled = Arc::new(AtomicBool::new(false));

        let on_complete = Arc::clone(&settled);
        let deliver = sink.clone();
        inner.start(Box::new(move |outcome| {
            if on_complete.swap(true, Ordering::AcqRel) {
                trace!("inner completed after timeout; dropped");
                return;
            }
            deliver.finish(outcome);
        }));

        if settled.load(Ordering::Acquire) {
            return;
        }

        let target = Arc::downgrade(inner);
        let duration = self.duration;
        inner.dispatcher().main_after(duration, move || {
            if settled.swap(true, Ordering::AcqRel) || sink.is_cancelled() {
                return;
            }
            debug!(timeout_ms = duration.as_millis(), "call timed out");
            if let Some(inner) = target.upgrade() {
                inner.cancel();
            }
            sink.fail(CallError::timeout());
        });
    }
}
