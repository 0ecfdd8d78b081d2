//! Runtime configuration types.
//!
//! These types hold the concrete values that drive the threaded runtime. In
//! most cases you should use [`RuntimeBuilder`](super::builder::RuntimeBuilder)
//! rather than creating a [`RuntimeConfig`] directly.
//!
//! # Configuration Precedence
//!
//! Builder settings apply in call order, later ones winning. The usual chain
//! (file, then `with_env_overrides`, then setters) gives:
//!
//! 1. **Programmatic**: values set via builder methods
//! 2. **Environment variables**: `LIFECALL_*`
//! 3. **Config file**: TOML (requires the `config-file` feature)
//! 4. **Defaults**: [`RuntimeConfig::default()`]
//!
//! # Defaults
//!
//! | Field | Default | Environment variable |
//! |-------|---------|----------------------|
//! | `worker_threads` | available CPU parallelism | `LIFECALL_WORKER_THREADS` |
//! | `thread_stack_size` | 2 MiB | `LIFECALL_THREAD_STACK_SIZE` |
//! | `thread_name_prefix` | `"lifecall-worker"` | `LIFECALL_THREAD_NAME_PREFIX` |
//! | `main_thread_name` | `"lifecall-main"` | `LIFECALL_MAIN_THREAD_NAME` |

use crate::error::ConfigError;

/// Environment variable name for worker thread count.
pub const ENV_WORKER_THREADS: &str = "LIFECALL_WORKER_THREADS";
/// Environment variable name for thread stack size.
pub const ENV_THREAD_STACK_SIZE: &str = "LIFECALL_THREAD_STACK_SIZE";
/// Environment variable name for worker thread name prefix.
pub const ENV_THREAD_NAME_PREFIX: &str = "LIFECALL_THREAD_NAME_PREFIX";
/// Environment variable name for the main-context thread name.
pub const ENV_MAIN_THREAD_NAME: &str = "LIFECALL_MAIN_THREAD_NAME";

const DEFAULT_STACK_SIZE: usize = 2 * 1024 * 1024;
const MIN_STACK_SIZE: usize = 64 * 1024;

/// Threaded runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Number of worker threads serving the work queue.
    pub worker_threads: usize,
    /// Stack size per spawned thread.
    pub thread_stack_size: usize,
    /// Name prefix for worker threads.
    pub thread_name_prefix: String,
    /// Name of the main-context thread.
    pub main_thread_name: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: std::thread::available_parallelism().map_or(1, |n| n.get()),
            thread_stack_size: DEFAULT_STACK_SIZE,
            thread_name_prefix: "lifecall-worker".to_string(),
            main_thread_name: "lifecall-main".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Normalize configuration values to safe defaults.
    pub fn normalize(&mut self) {
        if self.worker_threads == 0 {
            self.worker_threads = 1;
        }
        if self.thread_stack_size < MIN_STACK_SIZE {
            self.thread_stack_size = MIN_STACK_SIZE;
        }
        if self.thread_name_prefix.is_empty() {
            self.thread_name_prefix = "lifecall-worker".to_string();
        }
        if self.main_thread_name.is_empty() {
            self.main_thread_name = "lifecall-main".to_string();
        }
    }

    /// Apply `LIFECALL_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Only keys that resolve are applied; an unparseable value is an error.
    pub fn apply_overrides_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = lookup(ENV_WORKER_THREADS) {
            self.worker_threads = parse_usize("worker_threads", &val)?;
        }
        if let Some(val) = lookup(ENV_THREAD_STACK_SIZE) {
            self.thread_stack_size = parse_usize("thread_stack_size", &val)?;
        }
        if let Some(val) = lookup(ENV_THREAD_NAME_PREFIX) {
            self.thread_name_prefix = val;
        }
        if let Some(val) = lookup(ENV_MAIN_THREAD_NAME) {
            self.main_thread_name = val;
        }
        Ok(())
    }

    /// Parses a TOML document into a config, starting from defaults.
    ///
    /// ```toml
    /// [runtime]
    /// worker_threads = 4
    /// thread_name_prefix = "io"
    /// ```
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let parsed: RuntimeToml = toml::from_str(toml_str)?;
        let mut config = Self::default();
        config.apply_toml(&parsed.runtime);
        Ok(config)
    }

    #[cfg(feature = "config-file")]
    fn apply_toml(&mut self, section: &RuntimeSection) {
        if let Some(v) = section.worker_threads {
            self.worker_threads = v;
        }
        if let Some(v) = section.thread_stack_size {
            self.thread_stack_size = v;
        }
        if let Some(ref v) = section.thread_name_prefix {
            self.thread_name_prefix.clone_from(v);
        }
        if let Some(ref v) = section.main_thread_name {
            self.main_thread_name.clone_from(v);
        }
    }
}

/// Top-level TOML document.
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
struct RuntimeToml {
    #[serde(default)]
    runtime: RuntimeSection,
}

/// `[runtime]` section of the TOML config.
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
struct RuntimeSection {
    worker_threads: Option<usize>,
    thread_stack_size: Option<usize>,
    thread_name_prefix: Option<String>,
    main_thread_name: Option<String>,
}

fn parse_usize(field: &'static str, val: &str) -> Result<usize, ConfigError> {
    val.trim()
        .parse::<usize>()
        .map_err(|e| ConfigError::InvalidValue {
            field,
            reason: format!("{val:?}: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_sane() {
        let config = RuntimeConfig::default();
        assert!(config.worker_threads >= 1);
        assert_eq!(config.thread_stack_size, DEFAULT_STACK_SIZE);
        assert_eq!(config.main_thread_name, "lifecall-main");
    }

    #[test]
    fn normalize_clamps_invalid_values() {
        let mut config = RuntimeConfig {
            worker_threads: 0,
            thread_stack_size: 1,
            thread_name_prefix: String::new(),
            main_thread_name: String::new(),
        };
        config.normalize();
        assert_eq!(config.worker_threads, 1);
        assert_eq!(config.thread_stack_size, MIN_STACK_SIZE);
        assert_eq!(config.thread_name_prefix, "lifecall-worker");
        assert_eq!(config.main_thread_name, "lifecall-main");
    }

    #[test]
    fn overrides_apply_only_present_keys() {
        let mut config = RuntimeConfig::default();
        config
            .apply_overrides_from(lookup(&[
                (ENV_WORKER_THREADS, "3"),
                (ENV_MAIN_THREAD_NAME, "ui"),
            ]))
            .expect("valid overrides");
        assert_eq!(config.worker_threads, 3);
        assert_eq!(config.main_thread_name, "ui");
        assert_eq!(config.thread_name_prefix, "lifecall-worker");
    }

    #[test]
    fn unparseable_override_is_an_error() {
        let mut config = RuntimeConfig::default();
        let err = config
            .apply_overrides_from(lookup(&[(ENV_WORKER_THREADS, "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("worker_threads"));
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn toml_overrides_defaults() {
        let config = RuntimeConfig::from_toml_str(
            "[runtime]\nworker_threads = 2\nthread_name_prefix = \"io\"\n",
        )
        .expect("valid toml");
        assert_eq!(config.worker_threads, 2);
        assert_eq!(config.thread_name_prefix, "io");
        assert_eq!(config.main_thread_name, "lifecall-main");
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn bad_toml_is_an_error() {
        assert!(RuntimeConfig::from_toml_str("[runtime\n").is_err());
    }
}
