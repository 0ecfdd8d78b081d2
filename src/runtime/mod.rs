//! Execution contexts that calls are dispatched onto.
//!
//! Calls never own threads. They assume two collaborators, bundled behind the
//! [`Executor`] trait:
//!
//! - a **work queue**: concurrent, no ordering among independent jobs
//! - a **main context**: one serial context that runs jobs strictly in
//!   submission order, optionally after a delay
//!
//! A [`Dispatcher`] is the cloneable capability handle every call carries.
//! Two executors ship with the crate:
//!
//! - [`ThreadedRuntime`]: a worker pool plus a dedicated main thread
//! - [`LabExecutor`]: a deterministic, manually driven executor with virtual
//!   time for tests

pub mod builder;
pub mod config;
pub mod global_queue;
pub mod lab;
pub mod threaded;
pub mod timer;

pub use builder::RuntimeBuilder;
pub use config::RuntimeConfig;
pub use global_queue::GlobalQueue;
pub use lab::LabExecutor;
pub use threaded::ThreadedRuntime;
pub use timer::TimerHeap;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A unit of work submitted to an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// The scheduling surface calls depend on.
pub trait Executor: Send + Sync + 'static {
    /// Submits a job to the concurrent work queue.
    fn execute(&self, job: Job);

    /// Submits a job to the main context, after all previously submitted ones.
    fn execute_main(&self, job: Job);

    /// Submits a job to the main context once `delay` has elapsed.
    fn execute_main_after(&self, delay: Duration, job: Job);

    /// True if the calling thread is currently running on the main context.
    fn is_main_context(&self) -> bool;
}

/// Cloneable handle to an [`Executor`].
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<dyn Executor>,
}

impl Dispatcher {
    /// Wraps an executor.
    #[must_use]
    pub fn new(inner: Arc<dyn Executor>) -> Self {
        Self { inner }
    }

    /// Runs `f` on the work queue.
    pub fn spawn(&self, f: impl FnOnce() + Send + 'static) {
        self.inner.execute(Box::new(f));
    }

    /// Runs `f` on the main context.
    pub fn main(&self, f: impl FnOnce() + Send + 'static) {
        self.inner.execute_main(Box::new(f));
    }

    /// Runs `f` on the main context after `delay`.
    pub fn main_after(&self, delay: Duration, f: impl FnOnce() + Send + 'static) {
        self.inner.execute_main_after(delay, Box::new(f));
    }

    /// True if the calling thread is on the main context.
    #[must_use]
    pub fn is_main_context(&self) -> bool {
        self.inner.is_main_context()
    }

    /// Returns the underlying executor.
    #[must_use]
    pub fn executor(&self) -> Arc<dyn Executor> {
        Arc::clone(&self.inner)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("inner", &format_args!("Arc<dyn Executor>(..)"))
            .finish()
    }
}
