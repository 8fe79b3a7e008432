#![allow(dead_code)]
#![allow(unused_imports)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```
//! mod common;
//! use common::*;
//! ```

pub use ctxscope::test_utils::{
    init_test_logging, init_test_logging_with_level, test_registry, test_scheduler,
};
pub use ctxscope::{assert_report_passed, assert_with_log, test_complete, test_phase, test_section};

use ctxscope::scheduler::{ParallelScheduler, Scheduler};
use ctxscope::tck::{ScheduledContextCase, TestOutcome, CAPTURE_DEFAULT};
use proptest::prelude::ProptestConfig;
use proptest::test_runner::RngSeed;
use std::fmt::Display;
use std::sync::Arc;

/// Default seed for property tests when running under CI.
pub const DEFAULT_PROPTEST_SEED: u64 = 0x5EED_5EED;

const PROPTEST_SEED_ENV: &str = "CTXSCOPE_PROPTEST_SEED";

/// Build a ProptestConfig with deterministic seed support for CI.
#[must_use]
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    let mut config = ProptestConfig::with_cases(cases);
    // Honor existing PROPTEST_RNG_SEED, otherwise apply our own.
    if matches!(config.rng_seed, RngSeed::Random) {
        if let Some(seed) = read_proptest_seed() {
            config.rng_seed = RngSeed::Fixed(seed);
        }
    }
    config
}

fn read_proptest_seed() -> Option<u64> {
    if let Ok(value) = std::env::var(PROPTEST_SEED_ENV) {
        return value.parse::<u64>().ok();
    }
    if std::env::var("CI").is_ok() {
        return Some(DEFAULT_PROPTEST_SEED);
    }
    None
}

/// Erases a concrete scheduler for use in pipelines.
pub fn as_dyn(scheduler: &Arc<ParallelScheduler>) -> Arc<dyn Scheduler> {
    Arc::clone(scheduler) as Arc<dyn Scheduler>
}

/// Executor checking that every item of `expected` comes out suffixed with
/// the propagated context value.
pub fn expect_customized<T, R>(
    expected: Vec<T>,
) -> impl Fn(ScheduledContextCase<T, R>) -> TestOutcome + 'static
where
    T: Display + std::fmt::Debug + Send + 'static,
    R: Send + Sync + 'static,
{
    move |case: ScheduledContextCase<T, R>| -> TestOutcome {
        let suffixed = expected.iter().map(|v| format!("{v}customized"));
        case.mapping_test()?
            .expect_next_sequence(suffixed)
            .verify_complete()?;
        Ok(())
    }
}

/// Disposes `scheduler`, which drains and joins its threads, then asserts
/// that none of them still holds a captured value for `case`.
pub fn assert_capture_cleared<T, R>(case: &ScheduledContextCase<T, R>, scheduler: &ParallelScheduler)
where
    T: std::fmt::Debug + Send + 'static,
    R: Send + Sync + 'static,
{
    scheduler.dispose();
    for id in scheduler.thread_ids() {
        assert_eq!(
            case.companion().capture().get_for(*id),
            CAPTURE_DEFAULT,
            "{} leaked a captured value on {id:?}",
            case.name()
        );
    }
}
