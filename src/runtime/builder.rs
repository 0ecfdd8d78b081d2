//! Runtime builder.

use crate::error::ConfigError;
use crate::runtime::config::RuntimeConfig;
use crate::runtime::threaded::ThreadedRuntime;
use std::fmt;
use std::sync::Arc;

/// Hook run on every runtime thread when it starts or stops.
pub type ThreadHook = Arc<dyn Fn() + Send + Sync + 'static>;

/// Builder for constructing a [`ThreadedRuntime`] with custom configuration.
///
/// Settings apply in call order, so programmatic setters called after
/// [`with_env_overrides`](Self::with_env_overrides) win over the environment.
#[derive(Clone, Default)]
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    on_thread_start: Option<ThreadHook>,
    on_thread_stop: Option<ThreadHook>,
}

impl RuntimeBuilder {
    /// Create a new builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an explicit configuration.
    #[must_use]
    pub fn from_config(config: RuntimeConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Start from a TOML document.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(Self::from_config(RuntimeConfig::from_toml_str(toml_str)?))
    }

    /// Apply `LIFECALL_*` environment overrides to the current settings.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        self.config.apply_env_overrides()?;
        Ok(self)
    }

    /// Set the number of worker threads.
    #[must_use]
    pub fn worker_threads(mut self, n: usize) -> Self {
        self.config.worker_threads = n;
        self
    }

    /// Set the thread stack size.
    #[must_use]
    pub fn thread_stack_size(mut self, size: usize) -> Self {
        self.config.thread_stack_size = size;
        self
    }

    /// Set the worker thread name prefix.
    #[must_use]
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    /// Set the main-context thread name.
    #[must_use]
    pub fn main_thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.main_thread_name = name.into();
        self
    }

    /// Register a callback to run when each runtime thread starts.
    #[must_use]
    pub fn on_thread_start<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_thread_start = Some(Arc::new(f));
        self
    }

    /// Register a callback to run when each runtime thread stops.
    #[must_use]
    pub fn on_thread_stop<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_thread_stop = Some(Arc::new(f));
        self
    }

    /// Returns the configuration as currently set.
    #[must_use]
    pub const fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Build the runtime, spawning its threads.
    pub fn build(self) -> Result<ThreadedRuntime, ConfigError> {
        let mut config = self.config;
        config.normalize();
        ThreadedRuntime::start(config, self.on_thread_start, self.on_thread_stop)
    }

    /// Single worker plus the main thread.
    #[must_use]
    pub fn single_worker() -> Self {
        Self::new().worker_threads(1)
    }
}

impl fmt::Debug for RuntimeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeBuilder")
            .field("config", &self.config)
            .field("on_thread_start", &self.on_thread_start.is_some())
            .field("on_thread_stop", &self.on_thread_stop.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn setters_override_defaults() {
        let builder = RuntimeBuilder::new()
            .worker_threads(3)
            .thread_name_prefix("pool")
            .main_thread_name("ui");
        assert_eq!(builder.config().worker_threads, 3);
        assert_eq!(builder.config().thread_name_prefix, "pool");
        assert_eq!(builder.config().main_thread_name, "ui");
    }

    #[test]
    fn build_normalizes_zero_workers() {
        let runtime = RuntimeBuilder::new()
            .worker_threads(0)
            .build()
            .expect("runtime builds");
        assert_eq!(runtime.config().worker_threads, 1);
    }

    #[test]
    fn thread_hooks_run_for_every_thread() {
        let started = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicUsize::new(0));
        let runtime = {
            let started = Arc::clone(&started);
            let stopped = Arc::clone(&stopped);
            RuntimeBuilder::new()
                .worker_threads(2)
                .on_thread_start(move || {
                    started.fetch_add(1, Ordering::SeqCst);
                })
                .on_thread_stop(move || {
                    stopped.fetch_add(1, Ordering::SeqCst);
                })
                .build()
                .expect("runtime builds")
        };
        runtime.shutdown();
        // Two workers plus the main thread.
        assert_eq!(started.load(Ordering::SeqCst), 3);
        assert_eq!(stopped.load(Ordering::SeqCst), 3);
    }
}
