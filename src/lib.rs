//! ctxscope: generated test families checking that subscription context
//! survives scheduler hops.
//!
//! # Overview
//!
//! A pipeline stage that hops onto a scheduler must hand the subscription's
//! [`ContextMap`] along with the work it submits, so hooks installed on the
//! scheduling subsystem can observe it. Stages that take part in the fused
//! fast path may skip their per-signal scheduling entirely, which makes it
//! easy to lose the context on one path while the other path still works.
//! The [`tck`] module assembles each operator once and generates one test
//! variant per execution path that needs checking.
//!
//! # Module Structure
//!
//! - [`context`]: Immutable, copy-on-write context maps
//! - [`scheduler`]: Named schedule hooks, inline and thread-pool schedulers
//! - [`flow`]: Push-based sequences with an optional fused fast path
//! - [`verify`]: Step-by-step verification of a sequence's signals
//! - [`tck`]: Fast-path check, variant planning, capture hook and dynamic tests
//! - [`config`]: Scheduler and verifier configuration with env overrides
//! - [`error`]: Error types
//! - [`test_utils`]: Logging init and helpers shared by tests

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

pub mod config;
pub mod context;
pub mod error;
pub mod flow;
pub mod scheduler;
pub mod tck;
pub mod test_utils;
pub mod verify;

// Re-exports for convenient access to core types
pub use config::SchedulerConfig;
pub use context::ContextMap;
pub use error::{Error, ErrorCategory, ErrorKind, Result};
pub use flow::{Sequence, Stage, Subscriber};
pub use scheduler::{HookRegistry, ImmediateScheduler, ParallelScheduler, Scheduler, Worker};
pub use tck::{
    generate_scheduled_with_context_tests, generate_simple_scheduled_with_context_tests,
    run_all, Companion, DynamicTest, ScheduledContextCase, TestReport,
};
pub use verify::{StepVerifier, VerificationError, VerifierOptions};
