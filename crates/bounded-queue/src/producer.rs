use std::time::Duration;

use tracing::{debug, info, warn};

use crate::{
    cancel::{pace, CancelToken},
    queue::BoundedQueue,
    worker::{Announce, Observer, ProducerReport, WorkStatus},
};

/// Drains an ordered source into a [`BoundedQueue`].
///
/// A producer never marks the queue done. With several producers feeding one
/// queue, whoever joins all of them (see [`crate::Pipeline`]) is responsible
/// for calling [`BoundedQueue::mark_producers_done`] exactly once.
pub struct Producer<I: Iterator> {
    name: String,
    source: I,
    queue: BoundedQueue<I::Item>,
    delay: Duration,
    announce: Option<Announce<I::Item>>,
    token: Option<CancelToken>,
}

impl<I> Producer<I>
where
    I: Iterator,
    I::Item: Send + 'static,
{
    pub fn new<S>(queue: BoundedQueue<I::Item>, source: S) -> Self
    where
        S: IntoIterator<IntoIter = I>,
    {
        Self {
            name: "producer".into(),
            source: source.into_iter(),
            queue,
            delay: Duration::ZERO,
            announce: None,
            token: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Pause after every enqueued item. Only useful to make interleaving
    /// visible, ordering never depends on it.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.token = Some(token);
        self
    }

    pub(crate) fn with_announce(mut self, announce: Announce<I::Item>) -> Self {
        self.announce = Some(announce);
        self
    }

    /// Enqueues every item of the source in order.
    ///
    /// Stops early with [`WorkStatus::Cancelled`] when the token fires or the
    /// queue rejects an item because producers were already marked done.
    pub fn run(self) -> ProducerReport {
        let Self {
            name,
            source,
            queue,
            delay,
            announce,
            token,
        } = self;

        let span = tracing::info_span!("producer", name = name.as_str());
        let _entered = span.enter();
        info!("producer: starting");

        let mut produced = 0;
        let mut status = WorkStatus::Completed;

        for item in source {
            let copy = announce.as_ref().map(|(snapshot, _)| snapshot(&item));
            let enqueued = match &token {
                Some(token) => token
                    .check()
                    .map_err(|reason| reason.to_string())
                    .and_then(|_| {
                        queue
                            .enqueue_cancellable(item, token)
                            .map_err(|rejected| rejected.reason.to_string())
                    }),
                None => queue
                    .enqueue(item)
                    .map_err(|rejected| rejected.reason.to_string()),
            };

            if let Err(reason) = enqueued {
                warn!("producer: stopping after {} items, {}", produced, reason);
                status = WorkStatus::Cancelled;
                break;
            }

            produced += 1;
            debug!(produced, "producer: enqueued item");
            if let (Some(copy), Some((_, observer))) = (copy, &announce) {
                observer(&copy);
            }

            if let Err(reason) = pace(delay, token.as_ref()) {
                warn!("producer: stopping after {} items, {}", produced, reason);
                status = WorkStatus::Cancelled;
                break;
            }
        }

        info!(produced, ?status, "producer: finished");

        ProducerReport {
            name,
            produced,
            status,
        }
    }
}

impl<I> Producer<I>
where
    I: Iterator,
    I::Item: Clone + Send + 'static,
{
    /// Called with every item after it was enqueued. Items that the queue
    /// rejects are never observed.
    pub fn with_observer(self, observer: Observer<I::Item>) -> Self {
        let snapshot: fn(&I::Item) -> I::Item = Clone::clone;
        self.with_announce((snapshot, observer))
    }
}
