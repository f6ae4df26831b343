use std::time::Duration;

use tracing::{debug, info, warn};

use crate::{
    cancel::{pace, CancelToken},
    destination::Destination,
    error::QueueError,
    queue::BoundedQueue,
    worker::{ConsumerReport, Observer, WorkStatus},
};

/// Drains a [`BoundedQueue`] into a [`Destination`] until the queue reports
/// end of stream.
pub struct Consumer<T, D> {
    name: String,
    queue: BoundedQueue<T>,
    destination: D,
    delay: Duration,
    observer: Option<Observer<T>>,
    token: Option<CancelToken>,
}

impl<T, D> Consumer<T, D>
where
    T: Send + 'static,
    D: Destination<T>,
{
    pub fn new(queue: BoundedQueue<T>, destination: D) -> Self {
        Self {
            name: "consumer".into(),
            queue,
            destination,
            delay: Duration::ZERO,
            observer: None,
            token: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Called with every received item right before it is appended.
    pub fn with_observer(mut self, observer: Observer<T>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Runs until the queue is drained and done, or until cancelled.
    /// The destination is handed back in the report either way.
    pub fn run(self) -> ConsumerReport<D> {
        let Self {
            name,
            queue,
            mut destination,
            delay,
            observer,
            token,
        } = self;

        let span = tracing::info_span!("consumer", name = name.as_str());
        let _entered = span.enter();
        info!("consumer: starting");

        let mut consumed = 0;
        let status = loop {
            let next = match &token {
                Some(token) => token.check().and_then(|_| queue.dequeue_cancellable(token)),
                None => Ok(queue.dequeue()),
            };

            let item = match next {
                Ok(Some(item)) => item,
                Ok(None) => break WorkStatus::Completed,
                Err(QueueError::Cancelled) => {
                    warn!("consumer: cancelled after {} items", consumed);
                    break WorkStatus::Cancelled;
                }
                Err(e) => {
                    warn!("consumer: stopping after {} items, {}", consumed, e);
                    break WorkStatus::Cancelled;
                }
            };

            if let Some(observer) = &observer {
                observer(&item);
            }
            destination.append(item);
            consumed += 1;
            debug!(consumed, "consumer: appended item");

            if pace(delay, token.as_ref()).is_err() {
                warn!("consumer: cancelled after {} items", consumed);
                break WorkStatus::Cancelled;
            }
        };

        info!(consumed, ?status, "consumer: finished");

        ConsumerReport {
            name,
            consumed,
            status,
            destination,
        }
    }
}
