//! Filter stage.

use super::{BoxSubscriber, FusedQueue, Stage, Subscriber};
use crate::context::ContextMap;
use crate::error::Error;

/// Stage for the [`filter`](super::Sequence::filter) operator.
#[must_use = "sequences do nothing unless subscribed"]
pub struct Filter<T, P> {
    upstream: Box<dyn Stage<T>>,
    predicate: P,
}

impl<T, P> Filter<T, P> {
    pub(crate) fn new(upstream: Box<dyn Stage<T>>, predicate: P) -> Self {
        Self {
            upstream,
            predicate,
        }
    }
}

impl<T, P> Stage<T> for Filter<T, P>
where
    T: Send + 'static,
    P: FnMut(&T) -> bool + Send + 'static,
{
    fn label(&self) -> &'static str {
        "filter"
    }

    fn subscribe(self: Box<Self>, subscriber: BoxSubscriber<T>) {
        let this = *self;
        this.upstream.subscribe(Box::new(FilterSubscriber {
            downstream: subscriber,
            predicate: this.predicate,
        }));
    }

    fn supports_fast_path(&self) -> bool {
        self.upstream.supports_fast_path()
    }

    fn into_fused(self: Box<Self>) -> Result<FusedQueue<T>, Box<dyn Stage<T>>> {
        let this = *self;
        match this.upstream.into_fused() {
            Ok(queue) => Ok(Box::new(queue.filter(this.predicate))),
            Err(upstream) => Err(Box::new(Self::new(upstream, this.predicate))),
        }
    }
}

struct FilterSubscriber<T, P> {
    downstream: BoxSubscriber<T>,
    predicate: P,
}

impl<T, P> Subscriber<T> for FilterSubscriber<T, P>
where
    T: Send + 'static,
    P: FnMut(&T) -> bool + Send + 'static,
{
    fn context(&self) -> &ContextMap {
        self.downstream.context()
    }

    fn on_next(&mut self, item: T) {
        if (self.predicate)(&item) {
            self.downstream.on_next(item);
        }
    }

    fn on_error(&mut self, error: Error) {
        self.downstream.on_error(error);
    }

    fn on_complete(&mut self) {
        self.downstream.on_complete();
    }
}

#[cfg(test)]
mod tests {
    use crate::context::ContextMap;
    use crate::flow::test_support::{drain, recorder, Event};
    use crate::flow::{Sequence, Stage};

    fn init_test(name: &str) {
        crate::test_utils::init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn keeps_matching_items() {
        init_test("keeps_matching_items");
        let (sub, rx) = recorder(ContextMap::empty());
        Sequence::from_iter(1..=6).filter(|v| v % 2 == 0).subscribe(sub);
        let (items, terminal) = drain(&rx);
        assert_eq!(items, vec![2, 4, 6]);
        assert!(matches!(terminal, Event::Complete));
        crate::test_complete!("keeps_matching_items");
    }

    #[test]
    fn fused_queue_filters() {
        init_test("fused_queue_filters");
        let stage = Sequence::from_iter(1..=5).filter(|v| v % 2 == 1).into_stage();
        let queue = stage.into_fused().ok().expect("fusable");
        assert_eq!(queue.collect::<Vec<_>>(), vec![1, 3, 5]);
        crate::test_complete!("fused_queue_filters");
    }

    #[test]
    fn hidden_upstream_is_not_fusable() {
        init_test("hidden_upstream_is_not_fusable");
        let seq = Sequence::from_iter(1..=5).hide().filter(|v| *v > 2);
        assert!(!seq.supports_fast_path());
        crate::test_complete!("hidden_upstream_is_not_fusable");
    }
}
