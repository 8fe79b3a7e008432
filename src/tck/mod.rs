//! Generated "scheduled with context in scope" test families.
//!
//! For an operator that hops onto a scheduler, the generator builds one or
//! two named test variants. Each variant installs a capture hook under its own
//! name right before assembling its pipeline, so that scheduled work stores
//! the subscription's `"key"` context value in a per-thread capture cell for
//! the duration of that work. Tests then check that items produced on the
//! worker observe `"customized"` rather than the `"none"` default.
//!
//! ```
//! use ctxscope::scheduler::{HookRegistry, ImmediateScheduler, Scheduler};
//! use ctxscope::tck::{generate_simple_scheduled_with_context_tests, run_all};
//! use ctxscope::Sequence;
//! use std::sync::Arc;
//!
//! let registry = HookRegistry::shared();
//! let scheduler: Arc<dyn Scheduler> = Arc::new(ImmediateScheduler::new(Arc::clone(&registry)));
//! let tests = generate_simple_scheduled_with_context_tests(
//!     &registry,
//!     "publishOn",
//!     || Sequence::from_iter(vec![1, 2, 3]),
//!     move |source: Sequence<i32>| source.publish_on(Arc::clone(&scheduler)),
//!     |case| {
//!         case.mapping_test()?
//!             .expect_next_sequence(["1customized", "2customized", "3customized"].map(String::from))
//!             .verify_complete()?;
//!         Ok(())
//!     },
//! );
//! let report = run_all(tests);
//! assert_eq!(report.passed(), 2);
//! ```

pub mod case;
pub mod companion;
pub mod dynamic;
pub mod interceptor;
pub mod planner;

pub use case::{PipelineFactory, ScheduledContextCase};
pub use companion::{CaptureCell, Companion, CAPTURE_DEFAULT};
pub use dynamic::{run_all, DynamicTest, Named, TestOutcome, TestRecord, TestReport, TestStatus};
pub use interceptor::{install, scoped_context, CONTEXT_FALLBACK, CONTEXT_KEY, CONTEXT_VALUE};
pub use planner::{
    generate_scheduled_with_context_tests, generate_simple_scheduled_with_context_tests,
    plan_variants, FUSED_SUFFIX, TEST_NAME_SUFFIX,
};
