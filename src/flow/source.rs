//! Source stages.

use super::{BoxSubscriber, FusedQueue, Stage};
use crate::context::ContextMap;
use crate::error::Error;

/// Source emitting the items of an iterator. Fusable.
#[derive(Debug)]
pub struct IterSource<I> {
    iter: I,
}

impl<I> IterSource<I> {
    pub(crate) fn new(iter: I) -> Self {
        Self { iter }
    }
}

impl<I> Stage<I::Item> for IterSource<I>
where
    I: Iterator + Send + 'static,
    I::Item: Send + 'static,
{
    fn label(&self) -> &'static str {
        "iter"
    }

    fn subscribe(self: Box<Self>, mut subscriber: BoxSubscriber<I::Item>) {
        for item in self.iter {
            subscriber.on_next(item);
        }
        subscriber.on_complete();
    }

    fn supports_fast_path(&self) -> bool {
        true
    }

    fn into_fused(self: Box<Self>) -> Result<FusedQueue<I::Item>, Box<dyn Stage<I::Item>>> {
        Ok(Box::new(self.iter))
    }
}

/// Source failing immediately.
#[derive(Debug)]
pub struct ErrorSource {
    error: Error,
}

impl ErrorSource {
    pub(crate) fn new(error: Error) -> Self {
        Self { error }
    }
}

impl<T: Send + 'static> Stage<T> for ErrorSource {
    fn label(&self) -> &'static str {
        "error"
    }

    fn subscribe(self: Box<Self>, mut subscriber: BoxSubscriber<T>) {
        subscriber.on_error(self.error);
    }

    fn supports_fast_path(&self) -> bool {
        false
    }

    fn into_fused(self: Box<Self>) -> Result<FusedQueue<T>, Box<dyn Stage<T>>> {
        Err(self)
    }
}

/// Handle used by [`Create`] producers to push signals.
///
/// Signals after a terminal one are ignored. A producer returning without
/// terminating completes the sequence.
pub struct Emitter<T> {
    subscriber: BoxSubscriber<T>,
    done: bool,
}

impl<T: 'static> Emitter<T> {
    /// Context of the subscription being served.
    #[must_use]
    pub fn context(&self) -> &ContextMap {
        self.subscriber.context()
    }

    /// Pushes one item.
    pub fn next(&mut self, item: T) {
        if !self.done {
            self.subscriber.on_next(item);
        }
    }

    /// Fails the sequence.
    pub fn error(&mut self, error: Error) {
        if !self.done {
            self.done = true;
            self.subscriber.on_error(error);
        }
    }

    /// Completes the sequence.
    pub fn complete(&mut self) {
        if !self.done {
            self.done = true;
            self.subscriber.on_complete();
        }
    }

    /// Returns true once a terminal signal was sent.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }
}

/// Callback-driven source. Not fusable.
pub struct Create<F> {
    producer: F,
}

impl<F> Create<F> {
    pub(crate) fn new(producer: F) -> Self {
        Self { producer }
    }
}

impl<T, F> Stage<T> for Create<F>
where
    T: Send + 'static,
    F: FnOnce(&mut Emitter<T>) + Send + 'static,
{
    fn label(&self) -> &'static str {
        "create"
    }

    fn subscribe(self: Box<Self>, subscriber: BoxSubscriber<T>) {
        let mut emitter = Emitter {
            subscriber,
            done: false,
        };
        (self.producer)(&mut emitter);
        emitter.complete();
    }

    fn supports_fast_path(&self) -> bool {
        false
    }

    fn into_fused(self: Box<Self>) -> Result<FusedQueue<T>, Box<dyn Stage<T>>> {
        Err(self)
    }
}
