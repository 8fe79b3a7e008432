//! Test utilities for ctxscope.
//!
//! This module provides shared helpers for unit and integration tests:
//! - Consistent tracing-based logging initialization
//! - Phase/section macros for readable test output
//! - Registry and scheduler constructors
//!
//! # Example
//! ```
//! use ctxscope::test_utils::{init_test_logging, test_registry, test_scheduler};
//!
//! init_test_logging();
//! let registry = test_registry();
//! let scheduler = test_scheduler("example", 2, &registry).expect("scheduler");
//! assert_eq!(scheduler.worker_count(), 2);
//! ```

use crate::config::SchedulerConfig;
use crate::error::Result;
use crate::scheduler::{HookRegistry, ParallelScheduler};
use parking_lot::{Mutex, MutexGuard};
use std::sync::{Arc, Once};
use tracing_subscriber::fmt::format::FmtSpan;

static INIT_LOGGING: Once = Once::new();
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Thread name prefix used by [`test_scheduler`].
pub const TEST_THREAD_PREFIX: &str = "ctxscope-test";

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
            .with_thread_names(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// Acquire the global environment lock for tests that mutate env vars.
pub(crate) fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock()
}

/// Fresh, empty hook registry.
#[must_use]
pub fn test_registry() -> Arc<HookRegistry> {
    HookRegistry::shared()
}

/// Parallel scheduler with `threads` workers named after `name`.
pub fn test_scheduler(
    name: &str,
    threads: usize,
    registry: &Arc<HookRegistry>,
) -> Result<Arc<ParallelScheduler>> {
    let config = SchedulerConfig::new()
        .worker_threads(threads)
        .thread_name_prefix(TEST_THREAD_PREFIX);
    ParallelScheduler::new(name, &config, Arc::clone(registry)).map(Arc::new)
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

/// Assert that a [`TestReport`](crate::tck::TestReport) holds a passing
/// record for each listed name, in order.
#[macro_export]
macro_rules! assert_report_passed {
    ($report:expr, [$($name:expr),* $(,)?]) => {{
        let report = &$report;
        let expected: Vec<&str> = vec![$($name),*];
        assert_eq!(report.names(), expected, "generated test names");
        for record in &report.records {
            assert_eq!(
                record.status,
                $crate::tck::TestStatus::Passed,
                "{} failed: {:?}",
                record.name,
                record.message
            );
        }
    }};
}
