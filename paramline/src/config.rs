//! Worker configuration.
//!
//! Defaults suit the demonstration driver. `from_env` lets a deployment
//! tune the idle backoff and pin the worker without recompiling.

use std::time::Duration;

use thiserror::Error;

/// Environment variable overriding [`WorkerConfig::idle_backoff`], in microseconds.
pub const ENV_IDLE_BACKOFF_US: &str = "PARAMLINE_IDLE_BACKOFF_US";

/// Environment variable selecting the CPU core to pin the worker to.
pub const ENV_WORKER_CORE: &str = "PARAMLINE_WORKER_CORE";

/// Default sleep between polls of an empty queue.
pub const DEFAULT_IDLE_BACKOFF: Duration = Duration::from_micros(50);

/// Default name of the worker thread.
pub const DEFAULT_THREAD_NAME: &str = "paramline-worker";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable held something that is not a valid number.
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Configuration for the worker thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Sleep between polls while the queue is empty. Trades latency for CPU.
    pub idle_backoff: Duration,
    /// Name given to the spawned thread.
    pub thread_name: String,
    /// Core to pin the worker to, if any. Pinning failures are logged and ignored.
    pub core: Option<usize>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            idle_backoff: DEFAULT_IDLE_BACKOFF,
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
            core: None,
        }
    }
}

impl WorkerConfig {
    /// Defaults overridden by `PARAMLINE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable is set but does
    /// not parse as an unsigned integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(us) = parse_var::<u64>(&lookup, ENV_IDLE_BACKOFF_US)? {
            config.idle_backoff = Duration::from_micros(us);
        }
        if let Some(core) = parse_var::<usize>(&lookup, ENV_WORKER_CORE)? {
            config.core = Some(core);
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_idle_backoff(mut self, idle_backoff: Duration) -> Self {
        self.idle_backoff = idle_backoff;
        self
    }

    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    #[must_use]
    pub fn with_core(mut self, core: usize) -> Self {
        self.core = Some(core);
        self
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}
