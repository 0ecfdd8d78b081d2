//! Delayed one-shot trigger on the main context.
//!
//! [`after`] schedules a closure to run on the main context once the delay
//! has elapsed and returns a [`Delay`] handle. The handle is
//! [`Depositable`]: deposited under an owner, it is dropped unfired when the
//! owner dies, and a pressure pass evicts it once it has fired.

use crate::lifetime::Depositable;
use crate::runtime::Dispatcher;
use crate::tracing_compat::trace;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

type Trigger = Box<dyn FnOnce() + Send + 'static>;

/// A scheduled trigger.
pub struct Delay {
    trigger: Mutex<Option<Trigger>>,
    fired: AtomicBool,
    delay: Duration,
}

impl Delay {
    /// True once the trigger has run.
    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// True while the trigger is still armed.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.trigger.lock().is_some()
    }

    /// The configured delay.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Drops the trigger so it never runs. Returns true if it was armed.
    pub fn cancel(&self) -> bool {
        let trigger = self.trigger.lock().take();
        trigger.is_some()
    }

    fn fire(&self) {
        let trigger = self.trigger.lock().take();
        if let Some(trigger) = trigger {
            trigger();
            trace!(delay_ms = self.delay.as_millis(), "delay fired");
        }
        self.fired.store(true, Ordering::Release);
    }
}

impl Depositable for Delay {
    fn should_remove(&self) -> bool {
        self.has_fired()
    }

    fn will_remove(&self) {
        self.cancel();
    }
}

impl fmt::Debug for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delay")
            .field("delay", &self.delay)
            .field("pending", &self.is_pending())
            .field("fired", &self.has_fired())
            .finish()
    }
}

/// Runs `trigger` on the main context after `delay`.
pub fn after(
    dispatcher: &Dispatcher,
    delay: Duration,
    trigger: impl FnOnce() + Send + 'static,
) -> Arc<Delay> {
    let handle = Arc::new(Delay {
        trigger: Mutex::new(Some(Box::new(trigger))),
        fired: AtomicBool::new(false),
        delay,
    });
    let armed = Arc::clone(&handle);
    dispatcher.main_after(delay, move || armed.fire());
    handle
}
