//! Configuration for schedulers and verification runs.
//!
//! # Configuration Precedence
//!
//! Settings are resolved in this order (highest priority first):
//!
//! 1. **Programmatic**: values set via builder methods (`worker_threads(4)`)
//! 2. **Environment variables**: values from `CTXSCOPE_*` env vars
//! 3. **Defaults**: built-in defaults from [`SchedulerConfig::default()`]
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `CTXSCOPE_WORKER_THREADS` | `usize` | `SchedulerConfig::worker_threads` |
//! | `CTXSCOPE_THREAD_NAME_PREFIX` | `String` | `SchedulerConfig::thread_name_prefix` |
//! | `CTXSCOPE_VERIFY_TIMEOUT_MS` | `u64` | `VerifierOptions::timeout` |

use crate::error::{Error, Result};
use std::time::Duration;

/// Environment variable name for worker thread count.
pub const ENV_WORKER_THREADS: &str = "CTXSCOPE_WORKER_THREADS";
/// Environment variable name for the worker thread name prefix.
pub const ENV_THREAD_NAME_PREFIX: &str = "CTXSCOPE_THREAD_NAME_PREFIX";
/// Environment variable name for the default verification timeout.
pub const ENV_VERIFY_TIMEOUT_MS: &str = "CTXSCOPE_VERIFY_TIMEOUT_MS";

/// Default number of worker threads in a [`ParallelScheduler`](crate::scheduler::ParallelScheduler).
pub const DEFAULT_WORKER_THREADS: usize = 4;
/// Default thread name prefix.
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "ctxscope-worker";
/// Default verification timeout.
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for a thread-backed scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Number of worker threads.
    pub worker_threads: usize,
    /// Prefix used when naming worker threads.
    pub thread_name_prefix: String,
}

impl SchedulerConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            worker_threads: DEFAULT_WORKER_THREADS,
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
        }
    }

    /// Creates the default configuration with environment overrides applied.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new();
        apply_env_overrides(&mut config)?;
        Ok(config)
    }

    /// Sets the worker thread count. Zero is clamped to one.
    #[must_use]
    pub const fn worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = if threads == 0 { 1 } else { threads };
        self
    }

    /// Sets the thread name prefix.
    #[must_use]
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply environment variable overrides to a [`SchedulerConfig`].
///
/// Only variables that are set in the environment are applied.
/// Returns an error if a variable is set but contains an unparseable value.
pub fn apply_env_overrides(config: &mut SchedulerConfig) -> Result<()> {
    if let Some(val) = read_env(ENV_WORKER_THREADS) {
        let threads = parse_usize(ENV_WORKER_THREADS, &val)?;
        if threads == 0 {
            return Err(Error::invalid_config(format!(
                "invalid value for {ENV_WORKER_THREADS}: must be at least 1"
            )));
        }
        config.worker_threads = threads;
    }
    if let Some(val) = read_env(ENV_THREAD_NAME_PREFIX) {
        config.thread_name_prefix = val;
    }
    Ok(())
}

/// Reads the verification timeout override, if set.
pub fn verify_timeout_from_env() -> Result<Option<Duration>> {
    read_env(ENV_VERIFY_TIMEOUT_MS)
        .map(|val| parse_u64(ENV_VERIFY_TIMEOUT_MS, &val).map(Duration::from_millis))
        .transpose()
}

/// Read an environment variable, returning `None` if unset.
fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_usize(var_name: &str, val: &str) -> Result<usize> {
    val.trim().parse::<usize>().map_err(|e| {
        Error::invalid_config(format!(
            "invalid value for {var_name}: expected unsigned integer, got {val:?} ({e})"
        ))
    })
}

fn parse_u64(var_name: &str, val: &str) -> Result<u64> {
    val.trim().parse::<u64>().map_err(|e| {
        Error::invalid_config(format!(
            "invalid value for {var_name}: expected u64, got {val:?} ({e})"
        ))
    })
}
