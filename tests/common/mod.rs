#![allow(dead_code)]
#![allow(unused_imports)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```
//! mod common;
//! use common::*;
//! ```

use lifecall::call::{BaseCall, CallRef, Sink};
use lifecall::lifetime::Depositable;
use lifecall::runtime::Dispatcher;
use parking_lot::Mutex;
use proptest::prelude::ProptestConfig;
use proptest::test_runner::RngSeed;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub use lifecall::test_utils::{Recorder, init_test_logging};

/// Default seed for property tests when running under CI.
pub const DEFAULT_PROPTEST_SEED: u64 = 0x5EED_5EED;

const PROPTEST_SEED_ENV: &str = "LIFECALL_PROPTEST_SEED";

/// Initialize logging and announce the test.
pub fn init_test(name: &str) {
    init_test_logging();
    lifecall::test_phase!(name);
}

/// Build a ProptestConfig that is deterministic under CI.
#[must_use]
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    let mut config = ProptestConfig::with_cases(cases);
    if matches!(config.rng_seed, RngSeed::Random) {
        let seed = std::env::var(PROPTEST_SEED_ENV)
            .ok()
            .and_then(|raw| raw.parse().ok())
            .or_else(|| std::env::var_os("CI").map(|_| DEFAULT_PROPTEST_SEED));
        if let Some(seed) = seed {
            config.rng_seed = RngSeed::Fixed(seed);
        }
    }
    config
}

/// A call completed by hand through the sink it captured on start.
pub struct ManualCall<T> {
    pub call: CallRef<T>,
    sink: Arc<Mutex<Option<Sink<T>>>>,
    starts: Arc<AtomicUsize>,
    cancels: Arc<AtomicUsize>,
}

impl<T: Send + 'static> ManualCall<T> {
    pub fn new(dispatcher: Dispatcher) -> Self {
        let sink = Arc::new(Mutex::new(None));
        let starts = Arc::new(AtomicUsize::new(0));
        let cancels = Arc::new(AtomicUsize::new(0));
        let slot = Arc::clone(&sink);
        let started = Arc::clone(&starts);
        let cancelled = Arc::clone(&cancels);
        let call = BaseCall::new(dispatcher, move |s: Sink<T>| {
            *slot.lock() = Some(s);
            started.fetch_add(1, Ordering::SeqCst);
        })
        .on_cancel(move || {
            cancelled.fetch_add(1, Ordering::SeqCst);
        })
        .into_ref();
        Self {
            call,
            sink,
            starts,
            cancels,
        }
    }

    /// The sink of the latest attempt.
    pub fn sink(&self) -> Sink<T> {
        self.sink.lock().clone().expect("call was never started")
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

/// A depositable that records every notification it receives.
#[derive(Default)]
pub struct Probe {
    removable: AtomicBool,
    added: AtomicUsize,
    removed: AtomicUsize,
}

impl Probe {
    pub fn new(removable: bool) -> Arc<Self> {
        Arc::new(Self {
            removable: AtomicBool::new(removable),
            ..Self::default()
        })
    }

    pub fn set_removable(&self, removable: bool) {
        self.removable.store(removable, Ordering::SeqCst);
    }

    pub fn added(&self) -> usize {
        self.added.load(Ordering::SeqCst)
    }

    pub fn removed(&self) -> usize {
        self.removed.load(Ordering::SeqCst)
    }
}

impl Depositable for Probe {
    fn should_remove(&self) -> bool {
        self.removable.load(Ordering::SeqCst)
    }

    fn will_remove(&self) {
        self.removed.fetch_add(1, Ordering::SeqCst);
    }

    fn did_add(&self) {
        self.added.fetch_add(1, Ordering::SeqCst);
    }
}
