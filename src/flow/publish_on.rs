//! Publish-on stage: hops signals onto a scheduler worker.
//!
//! Two internal paths:
//!
//! - **Boxed**: the upstream pushes signals through a subscriber; each signal is
//!   wrapped into its own task and submitted to the worker.
//! - **Fused**: the upstream is converted into a [`FusedQueue`] and a single
//!   drain task, submitted to the worker, pulls and delivers every item.
//!
//! Either way the subscription's context travels with every submitted task, so
//! scheduling hooks observe it. A rejected submission terminates the
//! downstream with the scheduler's error.

use super::{BoxSubscriber, FusedQueue, Stage, Subscriber};
use crate::context::ContextMap;
use crate::error::Error;
use crate::scheduler::{Scheduler, Worker};
use parking_lot::Mutex;
use std::sync::Arc;

/// Stage for the [`publish_on`](super::Sequence::publish_on) operator.
#[must_use = "sequences do nothing unless subscribed"]
pub struct PublishOn<T> {
    upstream: Box<dyn Stage<T>>,
    scheduler: Arc<dyn Scheduler>,
}

impl<T> PublishOn<T> {
    pub(crate) fn new(upstream: Box<dyn Stage<T>>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            upstream,
            scheduler,
        }
    }
}

type SharedSubscriber<T> = Arc<Mutex<BoxSubscriber<T>>>;

impl<T: Send + 'static> Stage<T> for PublishOn<T> {
    fn label(&self) -> &'static str {
        "publish_on"
    }

    fn subscribe(self: Box<Self>, mut subscriber: BoxSubscriber<T>) {
        let Self {
            upstream,
            scheduler,
        } = *self;
        let worker = match scheduler.create_worker() {
            Ok(worker) => worker,
            Err(error) => {
                subscriber.on_error(error);
                return;
            }
        };
        let ctx = subscriber.context().clone();
        let downstream: SharedSubscriber<T> = Arc::new(Mutex::new(subscriber));

        let upstream = if upstream.supports_fast_path() {
            match upstream.into_fused() {
                Ok(queue) => {
                    tracing::trace!(scheduler = %scheduler.name(), "publish_on fused with upstream");
                    drain_fused(queue, &worker, &ctx, downstream);
                    return;
                }
                Err(upstream) => upstream,
            }
        } else {
            upstream
        };

        upstream.subscribe(Box::new(PublishOnSubscriber {
            ctx,
            worker,
            downstream,
            terminated: false,
        }));
    }

    fn supports_fast_path(&self) -> bool {
        self.upstream.supports_fast_path()
    }

    fn into_fused(self: Box<Self>) -> Result<FusedQueue<T>, Box<dyn Stage<T>>> {
        // Asynchronous boundary: only a subscriber can be served from the worker.
        Err(self)
    }
}

fn drain_fused<T: Send + 'static>(
    queue: FusedQueue<T>,
    worker: &Arc<dyn Worker>,
    ctx: &ContextMap,
    downstream: SharedSubscriber<T>,
) {
    let target = Arc::clone(&downstream);
    let drain = Box::new(move || {
        let mut subscriber = target.lock();
        for item in queue {
            subscriber.on_next(item);
        }
        subscriber.on_complete();
    });
    if let Err(error) = worker.schedule(drain, ctx) {
        downstream.lock().on_error(error);
    }
}

struct PublishOnSubscriber<T> {
    ctx: ContextMap,
    worker: Arc<dyn Worker>,
    downstream: SharedSubscriber<T>,
    terminated: bool,
}

impl<T: Send + 'static> PublishOnSubscriber<T> {
    fn submit<F>(&mut self, signal: F)
    where
        F: FnOnce(&mut BoxSubscriber<T>) + Send + 'static,
    {
        if self.terminated {
            return;
        }
        let target = Arc::clone(&self.downstream);
        let task = Box::new(move || {
            let mut guard = target.lock();
            signal(&mut *guard);
        });
        if let Err(error) = self.worker.schedule(task, &self.ctx) {
            self.terminated = true;
            self.downstream.lock().on_error(error);
        }
    }
}

impl<T: Send + 'static> Subscriber<T> for PublishOnSubscriber<T> {
    fn context(&self) -> &ContextMap {
        &self.ctx
    }

    fn on_next(&mut self, item: T) {
        self.submit(move |downstream| downstream.on_next(item));
    }

    fn on_error(&mut self, error: Error) {
        self.submit(move |downstream| downstream.on_error(error));
        self.terminated = true;
    }

    fn on_complete(&mut self) {
        self.submit(|downstream| downstream.on_complete());
        self.terminated = true;
    }
}
