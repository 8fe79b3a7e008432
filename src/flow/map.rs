//! Map stage.

use super::{BoxSubscriber, FusedQueue, Stage, Subscriber};
use crate::context::ContextMap;
use crate::error::Error;
use std::marker::PhantomData;

/// Stage for the [`map`](super::Sequence::map) operator.
#[must_use = "sequences do nothing unless subscribed"]
pub struct Map<U, T, F> {
    upstream: Box<dyn Stage<U>>,
    f: F,
    _output: PhantomData<fn() -> T>,
}

impl<U, T, F> Map<U, T, F> {
    pub(crate) fn new(upstream: Box<dyn Stage<U>>, f: F) -> Self {
        Self {
            upstream,
            f,
            _output: PhantomData,
        }
    }
}

impl<U, T, F> Stage<T> for Map<U, T, F>
where
    U: Send + 'static,
    T: Send + 'static,
    F: FnMut(U) -> T + Send + 'static,
{
    fn label(&self) -> &'static str {
        "map"
    }

    fn subscribe(self: Box<Self>, subscriber: BoxSubscriber<T>) {
        let this = *self;
        this.upstream.subscribe(Box::new(MapSubscriber {
            downstream: subscriber,
            f: this.f,
        }));
    }

    fn supports_fast_path(&self) -> bool {
        self.upstream.supports_fast_path()
    }

    fn into_fused(self: Box<Self>) -> Result<FusedQueue<T>, Box<dyn Stage<T>>> {
        let this = *self;
        match this.upstream.into_fused() {
            Ok(queue) => Ok(Box::new(queue.map(this.f))),
            Err(upstream) => Err(Box::new(Self::new(upstream, this.f))),
        }
    }
}

struct MapSubscriber<T, F> {
    downstream: BoxSubscriber<T>,
    f: F,
}

impl<U, T, F> Subscriber<U> for MapSubscriber<T, F>
where
    T: Send + 'static,
    F: FnMut(U) -> T + Send + 'static,
{
    fn context(&self) -> &ContextMap {
        self.downstream.context()
    }

    fn on_next(&mut self, item: U) {
        let mapped = (self.f)(item);
        self.downstream.on_next(mapped);
    }

    fn on_error(&mut self, error: Error) {
        self.downstream.on_error(error);
    }

    fn on_complete(&mut self) {
        self.downstream.on_complete();
    }
}
