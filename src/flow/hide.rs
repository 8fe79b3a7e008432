//! Hide stage: strips the fast path from its upstream.

use super::{BoxSubscriber, FusedQueue, Stage};

/// Stage for the [`hide`](super::Sequence::hide) operator.
#[must_use = "sequences do nothing unless subscribed"]
pub struct Hide<T> {
    upstream: Box<dyn Stage<T>>,
}

impl<T> Hide<T> {
    pub(crate) fn new(upstream: Box<dyn Stage<T>>) -> Self {
        Self { upstream }
    }
}

impl<T: Send + 'static> Stage<T> for Hide<T> {
    fn label(&self) -> &'static str {
        "hide"
    }

    fn subscribe(self: Box<Self>, subscriber: BoxSubscriber<T>) {
        self.upstream.subscribe(subscriber);
    }

    fn supports_fast_path(&self) -> bool {
        false
    }

    fn into_fused(self: Box<Self>) -> Result<FusedQueue<T>, Box<dyn Stage<T>>> {
        Err(self)
    }
}
