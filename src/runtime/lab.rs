//! Deterministic lab executor.
//!
//! Nothing runs until the test drives it. Submitted jobs sit in FIFO queues;
//! [`LabExecutor::run_until_idle`] drains them on the calling thread and
//! [`LabExecutor::advance`] moves virtual time forward, releasing delayed
//! main-context jobs in deadline order. Wall-clock time is never consulted,
//! so timeouts and delays are reproducible.
//!
//! # Example
//!
//! ```
//! use lifecall::runtime::LabExecutor;
//! use std::time::Duration;
//!
//! let lab = LabExecutor::new();
//! let dispatcher = lab.dispatcher();
//! dispatcher.main_after(Duration::from_millis(10), || {});
//! lab.run_until_idle();
//! assert_eq!(lab.pending_timers(), 1);
//! lab.advance(Duration::from_millis(10));
//! assert_eq!(lab.pending_timers(), 0);
//! ```
//!
//! Blocking decorators such as `sync` cannot be driven by the lab: the
//! blocked thread is the one that would have to run the queue.

use super::timer::TimerHeap;
use super::{Dispatcher, Executor, Job};
use crate::tracing_compat::trace;
use crate::types::Time;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

#[derive(Default)]
struct LabState {
    now: Time,
    work: VecDeque<Job>,
    main: VecDeque<Job>,
    delayed: TimerHeap<Job>,
    steps: u64,
}

#[derive(Default)]
struct LabInner {
    state: Mutex<LabState>,
    // Thread currently running a main-context job, if any.
    in_main: Mutex<Option<ThreadId>>,
}

impl Executor for LabInner {
    fn execute(&self, job: Job) {
        self.state.lock().work.push_back(job);
    }

    fn execute_main(&self, job: Job) {
        self.state.lock().main.push_back(job);
    }

    fn execute_main_after(&self, delay: Duration, job: Job) {
        let mut state = self.state.lock();
        let deadline = state.now + delay;
        state.delayed.insert(deadline, job);
    }

    fn is_main_context(&self) -> bool {
        *self.in_main.lock() == Some(thread::current().id())
    }
}

enum Step {
    Work(Job),
    Main(Job),
}

/// Manually driven executor with virtual time.
///
/// Cloning yields another handle to the same queues.
#[derive(Clone, Default)]
pub struct LabExecutor {
    inner: Arc<LabInner>,
}

impl LabExecutor {
    /// Creates an idle executor at virtual time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a dispatcher bound to this executor.
    #[must_use]
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(Arc::clone(&self.inner) as Arc<dyn Executor>)
    }

    /// Current virtual time.
    #[must_use]
    pub fn now(&self) -> Time {
        self.inner.state.lock().now
    }

    /// Total jobs run so far.
    #[must_use]
    pub fn steps(&self) -> u64 {
        self.inner.state.lock().steps
    }

    /// Work-queue jobs not yet run.
    #[must_use]
    pub fn pending_work(&self) -> usize {
        self.inner.state.lock().work.len()
    }

    /// Ready main-context jobs not yet run.
    #[must_use]
    pub fn pending_main(&self) -> usize {
        self.inner.state.lock().main.len()
    }

    /// Delayed main-context jobs whose deadline has not been reached.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.inner.state.lock().delayed.len()
    }

    /// True when no job is queued and no timer is pending.
    #[must_use]
    pub fn is_quiescent(&self) -> bool {
        let state = self.inner.state.lock();
        state.work.is_empty() && state.main.is_empty() && state.delayed.is_empty()
    }

    /// Runs one job. Work-queue jobs go before main-context jobs.
    ///
    /// Returns false when both queues are empty.
    pub fn step(&self) -> bool {
        let next = {
            let mut state = self.inner.state.lock();
            let next = state
                .work
                .pop_front()
                .map(Step::Work)
                .or_else(|| state.main.pop_front().map(Step::Main));
            if next.is_some() {
                state.steps += 1;
            }
            next
        };
        match next {
            Some(Step::Work(job)) => {
                job();
                true
            }
            Some(Step::Main(job)) => {
                self.run_main(job);
                true
            }
            None => false,
        }
    }

    /// Runs jobs until both queues are empty. Time does not move.
    ///
    /// Returns the number of jobs run.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.step() {
            ran += 1;
        }
        ran
    }

    /// Moves virtual time forward by `delta`, running everything that
    /// becomes due along the way.
    ///
    /// Delayed jobs fire in deadline order with the clock set to their
    /// deadline. Jobs scheduled while advancing fire too if their deadline
    /// falls inside the window.
    pub fn advance(&self, delta: Duration) -> usize {
        let target = self.now() + delta;
        let mut ran = self.run_until_idle();
        loop {
            {
                let mut state = self.inner.state.lock();
                match state.delayed.peek_deadline() {
                    Some(deadline) if deadline <= target => {
                        state.now = deadline;
                        let due = state.delayed.pop_expired(deadline);
                        trace!(now = %deadline, due = due.len(), "lab timers fired");
                        state.main.extend(due);
                    }
                    _ => break,
                }
            }
            ran += self.run_until_idle();
        }
        self.inner.state.lock().now = target;
        ran
    }

    fn run_main(&self, job: Job) {
        let me = thread::current().id();
        let previous = self.inner.in_main.lock().replace(me);
        job();
        *self.inner.in_main.lock() = previous;
    }
}

impl fmt::Debug for LabExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("LabExecutor")
            .field("now", &state.now)
            .field("work", &state.work.len())
            .field("main", &state.main.len())
            .field("delayed", &state.delayed.len())
            .field("steps", &state.steps)
            .finish()
    }
}
