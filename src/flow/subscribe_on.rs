//! Subscribe-on stage: performs the upstream subscription on a scheduler worker.
//!
//! Synchronous upstreams therefore emit every signal from inside the single
//! scheduled subscription task. Never fusable.

use super::{BoxSubscriber, FusedQueue, Stage};
use crate::scheduler::Scheduler;
use parking_lot::Mutex;
use std::sync::Arc;

/// Stage for the [`subscribe_on`](super::Sequence::subscribe_on) operator.
#[must_use = "sequences do nothing unless subscribed"]
pub struct SubscribeOn<T> {
    upstream: Box<dyn Stage<T>>,
    scheduler: Arc<dyn Scheduler>,
}

impl<T> SubscribeOn<T> {
    pub(crate) fn new(upstream: Box<dyn Stage<T>>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            upstream,
            scheduler,
        }
    }
}

impl<T: Send + 'static> Stage<T> for SubscribeOn<T> {
    fn label(&self) -> &'static str {
        "subscribe_on"
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
        // Parked here so a rejected submission can hand the subscriber back.
        let pending = Arc::new(Mutex::new(Some((upstream, subscriber))));
        let slot = Arc::clone(&pending);
        let task = Box::new(move || {
            let taken = slot.lock().take();
            if let Some((upstream, subscriber)) = taken {
                upstream.subscribe(subscriber);
            }
        });
        if let Err(error) = worker.schedule(task, &ctx) {
            let taken = pending.lock().take();
            if let Some((_, mut subscriber)) = taken {
                subscriber.on_error(error);
            }
        }
    }

    fn supports_fast_path(&self) -> bool {
        false
    }

    fn into_fused(self: Box<Self>) -> Result<FusedQueue<T>, Box<dyn Stage<T>>> {
        Err(self)
    }
}
