//! Schedulers that run units of work, decorated by named hooks.
//!
//! A [`Scheduler`] hands out [`Worker`]s. A worker runs its tasks one at a
//! time, in submission order, possibly on a thread other than the submitting
//! one. Every task is passed through the scheduler's [`HookRegistry`] at
//! submission time together with the requesting subscription's
//! [`ContextMap`].
//!
//! - [`ImmediateScheduler`]: runs work inline on the submitting thread
//! - [`ParallelScheduler`]: a fixed pool of named worker threads

mod hooks;
mod immediate;
mod parallel;

pub use hooks::{HookRegistry, ScheduleHook, Task};
pub use immediate::ImmediateScheduler;
pub use parallel::ParallelScheduler;

use crate::context::ContextMap;
use crate::error::Result;
use std::sync::Arc;

/// A serial executor obtained from a [`Scheduler`].
pub trait Worker: Send + Sync {
    /// Submits `task` on behalf of a subscription carrying `ctx`.
    ///
    /// Returns [`ErrorKind::SchedulerDisposed`](crate::error::ErrorKind::SchedulerDisposed)
    /// when the owning scheduler no longer accepts work; the task is dropped.
    fn schedule(&self, task: Task, ctx: &ContextMap) -> Result<()>;
}

/// Source of [`Worker`]s.
pub trait Scheduler: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Returns a worker bound to this scheduler.
    fn create_worker(&self) -> Result<Arc<dyn Worker>>;

    /// Stops accepting work and releases underlying resources.
    fn dispose(&self);

    /// Returns true once [`dispose`](Self::dispose) has been called.
    fn is_disposed(&self) -> bool;
}
