//! Push-based asynchronous sequences.
//!
//! A [`Sequence`] is a lazily assembled pipeline: nothing runs until
//! [`Sequence::subscribe`] is called. Each stage forwards signals to the
//! [`Subscriber`] below it, and every subscriber exposes the [`ContextMap`] of
//! the subscription so stages that hop onto a scheduler can hand it along with
//! the work they submit.
//!
//! # Fast path
//!
//! Some stages can be *fused*: instead of pushing signals one by one through
//! subscribers, a downstream consumer pulls items straight out of a
//! synchronous [`FusedQueue`]. A stage advertises this through
//! [`Stage::supports_fast_path`] and performs the conversion in
//! [`Stage::into_fused`]. [`Sequence::hide`] forces the boxed path.
//!
//! | Stage | Fast path |
//! |-------|-----------|
//! | [`Sequence::from_iter`] and friends | yes |
//! | [`Sequence::map`], [`Sequence::filter`] | when upstream has it |
//! | [`Sequence::publish_on`] | when upstream has it (drains in one task) |
//! | [`Sequence::create`], [`Sequence::error`] | no |
//! | [`Sequence::hide`], [`Sequence::subscribe_on`] | no |

mod filter;
mod hide;
mod map;
mod publish_on;
mod source;
mod subscribe_on;

pub use filter::Filter;
pub use hide::Hide;
pub use map::Map;
pub use publish_on::PublishOn;
pub use source::{Create, Emitter, ErrorSource, IterSource};
pub use subscribe_on::SubscribeOn;

use crate::context::ContextMap;
use crate::error::Error;
use crate::scheduler::Scheduler;
use std::fmt;
use std::sync::Arc;

/// Receiver of the signals of one subscription.
pub trait Subscriber<T>: Send + 'static {
    /// Context attached to this subscription.
    fn context(&self) -> &ContextMap;

    /// Delivers one item.
    fn on_next(&mut self, item: T);

    /// Terminates the subscription with an error.
    fn on_error(&mut self, error: Error);

    /// Terminates the subscription normally.
    fn on_complete(&mut self);
}

/// Boxed subscriber, as passed between stages.
pub type BoxSubscriber<T> = Box<dyn Subscriber<T>>;

/// Synchronous pull queue produced by a fused stage.
pub type FusedQueue<T> = Box<dyn Iterator<Item = T> + Send>;

/// One stage of a pipeline.
pub trait Stage<T>: Send + 'static {
    /// Short label used in `Debug` output.
    fn label(&self) -> &'static str;

    /// Starts pushing signals to `subscriber`.
    fn subscribe(self: Box<Self>, subscriber: BoxSubscriber<T>);

    /// Whether this stage takes part in the fused protocol.
    fn supports_fast_path(&self) -> bool;

    /// Converts this stage into a pull queue, or hands it back unchanged when
    /// it cannot be drained synchronously.
    fn into_fused(self: Box<Self>) -> Result<FusedQueue<T>, Box<dyn Stage<T>>>;
}

/// A lazily assembled pipeline producing items of type `T`.
#[must_use = "sequences do nothing unless subscribed"]
pub struct Sequence<T> {
    stage: Box<dyn Stage<T>>,
}

impl<T: Send + 'static> Sequence<T> {
    /// Wraps an arbitrary stage.
    pub fn from_stage(stage: impl Stage<T>) -> Self {
        Self {
            stage: Box::new(stage),
        }
    }

    /// Wraps an already boxed stage.
    pub fn from_boxed(stage: Box<dyn Stage<T>>) -> Self {
        Self { stage }
    }

    /// Emits every item of `items`, then completes. Fusable.
    pub fn from_iter<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self::from_stage(IterSource::new(items.into_iter()))
    }

    /// Emits a single item, then completes. Fusable.
    pub fn just(item: T) -> Self {
        Self::from_iter(std::iter::once(item))
    }

    /// Completes immediately. Fusable.
    pub fn empty() -> Self {
        Self::from_iter(std::iter::empty())
    }

    /// Fails immediately with `error`.
    pub fn error(error: Error) -> Self {
        Self::from_stage(ErrorSource::new(error))
    }

    /// Builds a source from a callback driving an [`Emitter`]. Not fusable.
    pub fn create<F>(producer: F) -> Self
    where
        F: FnOnce(&mut Emitter<T>) + Send + 'static,
    {
        Self::from_stage(Create::new(producer))
    }

    /// Transforms each item.
    pub fn map<U, F>(self, f: F) -> Sequence<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> U + Send + 'static,
    {
        Sequence::from_stage(Map::new(self.stage, f))
    }

    /// Keeps only items matching `predicate`.
    pub fn filter<P>(self, predicate: P) -> Self
    where
        P: FnMut(&T) -> bool + Send + 'static,
    {
        Self::from_stage(Filter::new(self.stage, predicate))
    }

    /// Disables the fast path, forcing downstream stages onto the boxed path.
    pub fn hide(self) -> Self {
        Self::from_stage(Hide::new(self.stage))
    }

    /// Delivers signals to downstream stages from a worker of `scheduler`.
    pub fn publish_on(self, scheduler: Arc<dyn Scheduler>) -> Self {
        Self::from_stage(PublishOn::new(self.stage, scheduler))
    }

    /// Subscribes to the upstream from a worker of `scheduler`.
    pub fn subscribe_on(self, scheduler: Arc<dyn Scheduler>) -> Self {
        Self::from_stage(SubscribeOn::new(self.stage, scheduler))
    }

    /// Whether the outermost stage advertises the fast path.
    #[must_use]
    pub fn supports_fast_path(&self) -> bool {
        self.stage.supports_fast_path()
    }

    /// Subscribes `subscriber`, starting the pipeline.
    pub fn subscribe(self, subscriber: impl Subscriber<T>) {
        self.stage.subscribe(Box::new(subscriber));
    }

    /// Subscribes an already boxed subscriber.
    pub fn subscribe_boxed(self, subscriber: BoxSubscriber<T>) {
        self.stage.subscribe(subscriber);
    }

    /// Unwraps the outermost stage.
    pub fn into_stage(self) -> Box<dyn Stage<T>> {
        self.stage
    }
}

impl<T: 'static> fmt::Debug for Sequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("stage", &self.stage.label())
            .field("fast_path", &self.stage.supports_fast_path())
            .finish()
    }
}
