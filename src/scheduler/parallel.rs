//! Fixed pool of worker threads.
//!
//! Each thread owns its own FIFO queue, so a [`Worker`] handed out by
//! [`ParallelScheduler::create_worker`] always runs its tasks on the same
//! thread, one at a time, in submission order. Workers are assigned round
//! robin. Idle threads park on a condition variable.
//!
//! Disposing the scheduler stops intake, lets every thread drain what is
//! already queued, and joins the threads.

use super::{HookRegistry, Scheduler, Task, Worker};
use crate::config::SchedulerConfig;
use crate::context::ContextMap;
use crate::error::{Error, Result};
use crossbeam_queue::SegQueue;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

/// Scheduler backed by a fixed set of OS threads.
pub struct ParallelScheduler {
    name: String,
    registry: Arc<HookRegistry>,
    lanes: Vec<Arc<Lane>>,
    next_lane: AtomicUsize,
    disposed: Arc<AtomicBool>,
    threads: Mutex<Vec<JoinHandle<()>>>,
    thread_ids: Vec<ThreadId>,
}

/// Per-thread queue and parking state.
///
/// `shutdown` is only written, and only acted upon, while `mutex` is held, so
/// a push either lands before the thread decides to exit or is refused.
struct Lane {
    queue: SegQueue<Task>,
    mutex: Mutex<()>,
    condvar: Condvar,
    shutdown: AtomicBool,
}

impl Lane {
    fn new() -> Self {
        Self {
            queue: SegQueue::new(),
            mutex: Mutex::new(()),
            condvar: Condvar::new(),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Enqueues `task`, or hands it back once the lane is shut down.
    fn push(&self, task: Task) -> std::result::Result<(), Task> {
        let _guard = self.mutex.lock();
        if self.shutdown.load(Ordering::Acquire) {
            return Err(task);
        }
        self.queue.push(task);
        self.condvar.notify_one();
        Ok(())
    }

    fn stop(&self) {
        let _guard = self.mutex.lock();
        self.shutdown.store(true, Ordering::Release);
        self.condvar.notify_all();
    }

    /// Blocks until a task is available, or returns `None` once shut down and drained.
    fn next_task(&self) -> Option<Task> {
        loop {
            if let Some(task) = self.queue.pop() {
                return Some(task);
            }
            let mut guard = self.mutex.lock();
            if let Some(task) = self.queue.pop() {
                return Some(task);
            }
            if self.shutdown.load(Ordering::Acquire) {
                return None;
            }
            self.condvar.wait(&mut guard);
        }
    }
}

impl ParallelScheduler {
    /// Spawns `config.worker_threads` threads consulting `registry`.
    pub fn new(
        name: impl Into<String>,
        config: &SchedulerConfig,
        registry: Arc<HookRegistry>,
    ) -> Result<Self> {
        let name = name.into();
        let count = config.worker_threads.max(1);
        let mut lanes = Vec::with_capacity(count);
        let mut threads = Vec::with_capacity(count);
        let mut thread_ids = Vec::with_capacity(count);

        for index in 0..count {
            let lane = Arc::new(Lane::new());
            let thread_lane = Arc::clone(&lane);
            let thread_name = format!("{}-{name}-{index}", config.thread_name_prefix);
            let label = thread_name.clone();
            let handle = thread::Builder::new()
                .name(thread_name)
                .spawn(move || run_lane(&label, &thread_lane))
                .map_err(|e| {
                    Error::invalid_config(format!("failed to spawn worker thread {index}"))
                        .with_source(e)
                })?;
            thread_ids.push(handle.thread().id());
            threads.push(handle);
            lanes.push(lane);
        }

        tracing::debug!(scheduler = %name, threads = count, "parallel scheduler started");
        Ok(Self {
            name,
            registry,
            lanes,
            next_lane: AtomicUsize::new(0),
            disposed: Arc::new(AtomicBool::new(false)),
            threads: Mutex::new(threads),
            thread_ids,
        })
    }

    /// Identifiers of the worker threads, in lane order.
    #[must_use]
    pub fn thread_ids(&self) -> &[ThreadId] {
        &self.thread_ids
    }

    /// Number of worker threads.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.lanes.len()
    }
}

fn run_lane(label: &str, lane: &Lane) {
    tracing::trace!(worker = %label, "worker thread started");
    while let Some(task) = lane.next_task() {
        if catch_unwind(AssertUnwindSafe(task)).is_err() {
            tracing::error!(worker = %label, "scheduled task panicked");
        }
    }
    tracing::trace!(worker = %label, "worker thread stopped");
}

impl Scheduler for ParallelScheduler {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_worker(&self) -> Result<Arc<dyn Worker>> {
        if self.is_disposed() {
            return Err(Error::scheduler_disposed(&self.name));
        }
        let index = self.next_lane.fetch_add(1, Ordering::Relaxed) % self.lanes.len();
        Ok(Arc::new(LaneWorker {
            scheduler: self.name.clone(),
            lane: Arc::clone(&self.lanes[index]),
            registry: Arc::clone(&self.registry),
            disposed: Arc::clone(&self.disposed),
        }))
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        for lane in &self.lanes {
            lane.stop();
        }
        let current = thread::current().id();
        let handles = std::mem::take(&mut *self.threads.lock());
        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                tracing::error!(scheduler = %self.name, "worker thread panicked during shutdown");
            }
        }
        tracing::debug!(scheduler = %self.name, "parallel scheduler disposed");
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl Drop for ParallelScheduler {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for ParallelScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelScheduler")
            .field("name", &self.name)
            .field("workers", &self.lanes.len())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

struct LaneWorker {
    scheduler: String,
    lane: Arc<Lane>,
    registry: Arc<HookRegistry>,
    disposed: Arc<AtomicBool>,
}

impl Worker for LaneWorker {
    fn schedule(&self, task: Task, ctx: &ContextMap) -> Result<()> {
        if self.disposed.load(Ordering::Acquire) {
            tracing::warn!(scheduler = %self.scheduler, "rejected work after dispose");
            return Err(Error::scheduler_disposed(&self.scheduler));
        }
        if self.lane.push(self.registry.decorate(task, ctx)).is_err() {
            tracing::warn!(scheduler = %self.scheduler, "rejected work after dispose");
            return Err(Error::scheduler_disposed(&self.scheduler));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::mpsc;
    use std::time::Duration;

    fn init_test(name: &str) {
        crate::test_utils::init_test_logging();
        crate::test_phase!(name);
    }

    fn scheduler(threads: usize) -> ParallelScheduler {
        let config = SchedulerConfig::new().worker_threads(threads);
        ParallelScheduler::new("test", &config, HookRegistry::shared()).expect("spawn")
    }

    #[test]
    fn runs_off_the_calling_thread() {
        init_test("runs_off_the_calling_thread");
        let scheduler = scheduler(2);
        let worker = scheduler.create_worker().expect("worker");
        let (tx, rx) = mpsc::channel();
        worker
            .schedule(
                Box::new(move || tx.send(thread::current().id()).expect("send")),
                &ContextMap::empty(),
            )
            .expect("scheduled");
        let ran_on = rx.recv_timeout(Duration::from_secs(5)).expect("ran");
        assert_ne!(ran_on, thread::current().id());
        assert!(scheduler.thread_ids().contains(&ran_on));
        crate::test_complete!("runs_off_the_calling_thread");
    }

    #[test]
    fn worker_preserves_submission_order() {
        init_test("worker_preserves_submission_order");
        let scheduler = scheduler(3);
        let worker = scheduler.create_worker().expect("worker");
        let (tx, rx) = mpsc::channel();
        for i in 0..50 {
            let tx = tx.clone();
            worker
                .schedule(Box::new(move || tx.send(i).expect("send")), &ContextMap::empty())
                .expect("scheduled");
        }
        let got: Vec<i32> = (0..50)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).expect("item"))
            .collect();
        assert_eq!(got, (0..50).collect::<Vec<_>>());
        crate::test_complete!("worker_preserves_submission_order");
    }

    #[test]
    fn workers_are_round_robin() {
        init_test("workers_are_round_robin");
        let scheduler = scheduler(2);
        let (tx, rx) = mpsc::channel();
        for _ in 0..2 {
            let worker = scheduler.create_worker().expect("worker");
            let tx = tx.clone();
            worker
                .schedule(
                    Box::new(move || tx.send(thread::current().id()).expect("send")),
                    &ContextMap::empty(),
                )
                .expect("scheduled");
        }
        let first = rx.recv_timeout(Duration::from_secs(5)).expect("first");
        let second = rx.recv_timeout(Duration::from_secs(5)).expect("second");
        assert_ne!(first, second);
        assert_eq!(scheduler.worker_count(), 2);
        crate::test_complete!("workers_are_round_robin");
    }

    #[test]
    fn dispose_drains_and_rejects() {
        init_test("dispose_drains_and_rejects");
        let scheduler = scheduler(1);
        let worker = scheduler.create_worker().expect("worker");
        let (tx, rx) = mpsc::channel();
        worker
            .schedule(Box::new(move || tx.send(()).expect("send")), &ContextMap::empty())
            .expect("scheduled");
        scheduler.dispose();
        assert!(rx.try_recv().is_ok(), "queued work drains before join");
        let err = worker
            .schedule(Box::new(|| {}), &ContextMap::empty())
            .expect_err("disposed");
        assert_eq!(err.kind(), ErrorKind::SchedulerDisposed);
        assert!(scheduler.create_worker().is_err());
        crate::test_complete!("dispose_drains_and_rejects");
    }

    #[test]
    fn panicking_task_does_not_kill_worker() {
        init_test("panicking_task_does_not_kill_worker");
        let scheduler = scheduler(1);
        let worker = scheduler.create_worker().expect("worker");
        worker
            .schedule(Box::new(|| panic!("task failure")), &ContextMap::empty())
            .expect("scheduled");
        let (tx, rx) = mpsc::channel();
        worker
            .schedule(Box::new(move || tx.send(7).expect("send")), &ContextMap::empty())
            .expect("scheduled");
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).expect("survived"), 7);
        crate::test_complete!("panicking_task_does_not_kill_worker");
    }

    #[test]
    fn work_racing_dispose_is_either_run_or_rejected() {
        init_test("work_racing_dispose_is_either_run_or_rejected");
        for round in 0..200 {
            let scheduler = Arc::new(scheduler(2));
            let ran = Arc::new(AtomicUsize::new(0));
            let accepted = Arc::new(AtomicUsize::new(0));
            let submitters: Vec<_> = (0..4)
                .map(|_| {
                    let worker = scheduler.create_worker().expect("worker");
                    let ran = Arc::clone(&ran);
                    let accepted = Arc::clone(&accepted);
                    thread::spawn(move || {
                        for _ in 0..50 {
                            let ran = Arc::clone(&ran);
                            let task: Task = Box::new(move || {
                                ran.fetch_add(1, Ordering::SeqCst);
                            });
                            match worker.schedule(task, &ContextMap::empty()) {
                                Ok(()) => {
                                    accepted.fetch_add(1, Ordering::SeqCst);
                                }
                                Err(err) => {
                                    assert_eq!(err.kind(), ErrorKind::SchedulerDisposed);
                                }
                            }
                        }
                    })
                })
                .collect();
            scheduler.dispose();
            for handle in submitters {
                handle.join().expect("submitter");
            }
            assert_eq!(
                ran.load(Ordering::SeqCst),
                accepted.load(Ordering::SeqCst),
                "round {round}: accepted work was dropped"
            );
        }
        crate::test_complete!("work_racing_dispose_is_either_run_or_rejected");
    }
}
