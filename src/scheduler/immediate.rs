//! Scheduler that runs work inline.

use super::{HookRegistry, Scheduler, Task, Worker};
use crate::context::ContextMap;
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Runs every task on the submitting thread, after hook decoration.
#[derive(Debug)]
pub struct ImmediateScheduler {
    registry: Arc<HookRegistry>,
    disposed: Arc<AtomicBool>,
}

impl ImmediateScheduler {
    /// Creates a scheduler consulting `registry`.
    #[must_use]
    pub fn new(registry: Arc<HookRegistry>) -> Self {
        Self {
            registry,
            disposed: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Scheduler for ImmediateScheduler {
    fn name(&self) -> &str {
        "immediate"
    }

    fn create_worker(&self) -> Result<Arc<dyn Worker>> {
        if self.is_disposed() {
            return Err(Error::scheduler_disposed(self.name()));
        }
        Ok(Arc::new(ImmediateWorker {
            registry: Arc::clone(&self.registry),
            disposed: Arc::clone(&self.disposed),
        }))
    }

    fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

struct ImmediateWorker {
    registry: Arc<HookRegistry>,
    disposed: Arc<AtomicBool>,
}

impl Worker for ImmediateWorker {
    fn schedule(&self, task: Task, ctx: &ContextMap) -> Result<()> {
        if self.disposed.load(Ordering::Acquire) {
            tracing::warn!(scheduler = "immediate", "rejected work after dispose");
            return Err(Error::scheduler_disposed("immediate"));
        }
        let task = self.registry.decorate(task, ctx);
        task();
        Ok(())
    }
}
