//! Test utilities for lifecall.
//!
//! This module provides shared helpers for unit and integration tests:
//! - Consistent tracing-based logging initialization
//! - Phase/section macros for readable test output
//! - Small recorders for completions delivered by calls
//!
//! # Example
//! ```
//! use lifecall::test_utils::init_test_logging;
//!
//! init_test_logging();
//! lifecall::test_phase!("example");
//! ```

use crate::call::Callback;
use crate::types::Outcome;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::sync::Once;
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
///
/// The first call wins; later calls are no-ops.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// Collects every outcome delivered to the callbacks it hands out.
///
/// Used to assert the at-most-once delivery contract.
pub struct Recorder<T> {
    inner: Arc<(Mutex<Vec<Outcome<T>>>, Condvar)>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> Recorder<T> {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(Vec::new()), Condvar::new())),
        }
    }

    /// Returns a callback that records into this recorder.
    #[must_use]
    pub fn callback(&self) -> Callback<T> {
        let inner = Arc::clone(&self.inner);
        Box::new(move |outcome| {
            let (lock, cvar) = &*inner;
            lock.lock().push(outcome);
            cvar.notify_all();
        })
    }

    /// Number of outcomes delivered so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.0.lock().len()
    }

    /// Removes and returns every recorded outcome.
    pub fn take(&self) -> Vec<Outcome<T>> {
        std::mem::take(&mut *self.inner.0.lock())
    }

    /// Blocks until at least `n` outcomes arrived or `timeout` elapses.
    ///
    /// Returns true if the count was reached.
    pub fn wait_for(&self, n: usize, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let mut guard = lock.lock();
        let deadline = std::time::Instant::now() + timeout;
        while guard.len() < n {
            if cvar.wait_until(&mut guard, deadline).timed_out() {
                return guard.len() >= n;
            }
        }
        true
    }
}

impl<T: Send + 'static> Default for Recorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Log a test phase transition with a visual separator.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Log a section within a test phase.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::debug!(section = %$name, "--- {} ---", $name);
    };
}

/// Log test completion with summary.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
    ($name:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(
            test = %$name,
            $($key = %$value,)*
            "test completed successfully: {}",
            $name
        );
    };
}

/// Log before assertions for context.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        tracing::debug!(
            expected = ?$expected,
            actual = ?$actual,
            "Asserting: {}",
            $msg
        );
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}
