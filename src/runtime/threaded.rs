//! Threaded runtime: a worker pool plus one dedicated main thread.
//!
//! Workers drain a shared [`GlobalQueue`] and park on a condition variable
//! when it is empty. The main thread owns a FIFO of ready jobs and a
//! [`TimerHeap`] of delayed ones; it sleeps until the next deadline or the
//! next submission, whichever comes first.
//!
//! A job that panics is caught and logged. The thread that ran it keeps
//! serving its queue.
//!
//! Dropping the runtime (or calling [`ThreadedRuntime::shutdown`]) stops
//! every thread. Jobs already queued on the work pool are drained first;
//! main-context jobs that are ready run, delayed ones still pending are
//! discarded. Jobs submitted after shutdown are dropped without running.

use super::builder::ThreadHook;
use super::config::RuntimeConfig;
use super::global_queue::GlobalQueue;
use super::timer::TimerHeap;
use super::{Dispatcher, Executor, Job};
use crate::error::ConfigError;
use crate::tracing_compat::{debug, error, trace};
use crate::types::Time;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

// Idle workers re-check the queue at least this often.
const WORKER_PARK_TIMEOUT: Duration = Duration::from_millis(50);

#[derive(Default)]
struct MainState {
    ready: VecDeque<Job>,
    delayed: TimerHeap<Job>,
}

struct Shared {
    work: GlobalQueue,
    work_lock: Mutex<()>,
    work_available: Condvar,
    main: Mutex<MainState>,
    main_available: Condvar,
    main_thread: OnceLock<ThreadId>,
    shutdown: AtomicBool,
    epoch: Instant,
}

impl Shared {
    fn now(&self) -> Time {
        let nanos = u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX);
        Time::from_nanos(nanos)
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    fn wake_workers(&self) {
        let _guard = self.work_lock.lock();
        self.work_available.notify_one();
    }

    fn wake_main(&self, _state: &MutexGuard<'_, MainState>) {
        self.main_available.notify_one();
    }
}

impl Executor for Shared {
    fn execute(&self, job: Job) {
        if self.is_shutdown() {
            debug!("work job submitted after shutdown; dropped");
            return;
        }
        self.work.push(job);
        self.wake_workers();
    }

    fn execute_main(&self, job: Job) {
        if self.is_shutdown() {
            debug!("main job submitted after shutdown; dropped");
            return;
        }
        let mut state = self.main.lock();
        state.ready.push_back(job);
        self.wake_main(&state);
    }

    fn execute_main_after(&self, delay: Duration, job: Job) {
        if self.is_shutdown() {
            debug!("delayed main job submitted after shutdown; dropped");
            return;
        }
        let deadline = self.now() + delay;
        let mut state = self.main.lock();
        state.delayed.insert(deadline, job);
        self.wake_main(&state);
    }

    fn is_main_context(&self) -> bool {
        self.main_thread
            .get()
            .is_some_and(|id| *id == thread::current().id())
    }
}

/// A running worker pool plus main thread.
///
/// Built with [`RuntimeBuilder`](super::RuntimeBuilder).
pub struct ThreadedRuntime {
    shared: Arc<Shared>,
    threads: Mutex<Vec<JoinHandle<()>>>,
    config: RuntimeConfig,
}

impl ThreadedRuntime {
    /// Builds a runtime with default configuration.
    pub fn new() -> Result<Self, ConfigError> {
        super::RuntimeBuilder::new().build()
    }

    pub(crate) fn start(
        config: RuntimeConfig,
        on_start: Option<ThreadHook>,
        on_stop: Option<ThreadHook>,
    ) -> Result<Self, ConfigError> {
        let shared = Arc::new(Shared {
            work: GlobalQueue::new(),
            work_lock: Mutex::new(()),
            work_available: Condvar::new(),
            main: Mutex::new(MainState::default()),
            main_available: Condvar::new(),
            main_thread: OnceLock::new(),
            shutdown: AtomicBool::new(false),
            epoch: Instant::now(),
        });
        let runtime = Self {
            shared,
            threads: Mutex::new(Vec::with_capacity(config.worker_threads + 1)),
            config,
        };

        // On error the partially built runtime drops and joins what started.
        let main_name = runtime.config.main_thread_name.clone();
        runtime.spawn_thread(main_name, on_start.as_ref(), on_stop.as_ref(), main_loop)?;
        for index in 0..runtime.config.worker_threads {
            let name = format!("{}-{index}", runtime.config.thread_name_prefix);
            runtime.spawn_thread(name, on_start.as_ref(), on_stop.as_ref(), worker_loop)?;
        }

        debug!(
            workers = runtime.config.worker_threads,
            "threaded runtime started"
        );
        Ok(runtime)
    }

    fn spawn_thread(
        &self,
        name: String,
        on_start: Option<&ThreadHook>,
        on_stop: Option<&ThreadHook>,
        body: fn(&Shared),
    ) -> Result<(), ConfigError> {
        let shared = Arc::clone(&self.shared);
        let on_start = on_start.cloned();
        let on_stop = on_stop.cloned();
        let handle = thread::Builder::new()
            .name(name.clone())
            .stack_size(self.config.thread_stack_size)
            .spawn(move || {
                if let Some(hook) = &on_start {
                    hook();
                }
                body(&shared);
                if let Some(hook) = &on_stop {
                    hook();
                }
            })
            .map_err(|source| ConfigError::Spawn { name, source })?;
        self.threads.lock().push(handle);
        Ok(())
    }

    /// Returns a dispatcher bound to this runtime.
    #[must_use]
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(Arc::clone(&self.shared) as Arc<dyn Executor>)
    }

    /// Returns the normalized configuration the runtime runs with.
    #[must_use]
    pub const fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Jobs queued on the work pool and not yet picked up.
    #[must_use]
    pub fn pending_work(&self) -> usize {
        self.shared.work.len()
    }

    /// Main-context jobs waiting to run, ready or delayed.
    #[must_use]
    pub fn pending_main(&self) -> usize {
        let state = self.shared.main.lock();
        state.ready.len() + state.delayed.len()
    }

    /// True once shutdown has been requested.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shared.is_shutdown()
    }

    /// Stops every thread and waits for them to exit.
    ///
    /// Idempotent. When called from one of the runtime's own threads that
    /// thread is not joined.
    pub fn shutdown(&self) {
        if !self.shared.shutdown.swap(true, Ordering::AcqRel) {
            debug!("threaded runtime shutting down");
        }
        {
            let _guard = self.shared.work_lock.lock();
            self.shared.work_available.notify_all();
        }
        {
            let _state = self.shared.main.lock();
            self.shared.main_available.notify_all();
        }

        let current = thread::current().id();
        let handles: Vec<_> = self.threads.lock().drain(..).collect();
        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                error!("runtime thread exited by panic");
            }
        }
    }
}

impl Drop for ThreadedRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for ThreadedRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadedRuntime")
            .field("config", &self.config)
            .field("pending_work", &self.pending_work())
            .field("shutdown", &self.is_shutdown())
            .finish_non_exhaustive()
    }
}

fn run_job(job: Job) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        let message = payload
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "<non-string panic payload>".to_string());
        error!(panic = %message, "job panicked");
    }
}

fn worker_loop(shared: &Shared) {
    trace!("worker started");
    loop {
        if let Some(job) = shared.work.pop() {
            run_job(job);
            continue;
        }
        if shared.is_shutdown() {
            break;
        }
        let mut guard = shared.work_lock.lock();
        if shared.work.is_empty() && !shared.is_shutdown() {
            let _ = shared
                .work_available
                .wait_for(&mut guard, WORKER_PARK_TIMEOUT);
        }
    }
    trace!("worker stopped");
}

fn main_loop(shared: &Shared) {
    let _ = shared.main_thread.set(thread::current().id());
    trace!("main context started");
    let mut state = shared.main.lock();
    loop {
        let now = shared.now();
        let due = state.delayed.pop_expired(now);
        state.ready.extend(due);

        if let Some(job) = state.ready.pop_front() {
            MutexGuard::unlocked(&mut state, || run_job(job));
            continue;
        }
        if shared.is_shutdown() {
            let discarded = state.delayed.len();
            state.delayed.clear();
            if discarded > 0 {
                debug!(discarded, "delayed main jobs discarded at shutdown");
            }
            break;
        }
        match state.delayed.peek_deadline() {
            Some(deadline) => {
                let wait = deadline.duration_since(now);
                let _ = shared.main_available.wait_for(&mut state, wait);
            }
            None => shared.main_available.wait(&mut state),
        }
    }
    trace!("main context stopped");
}
