use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use tracing::{error, info};

use crate::{
    cancel::CancelToken,
    consumer::Consumer,
    destination::Destination,
    error::{QueueError, QueueResult},
    producer::Producer,
    queue::BoundedQueue,
    worker::{Announce, ConsumerReport, Observer, ProducerReport},
};

type Source<T> = Box<dyn Iterator<Item = T> + Send>;

/// Runs any number of producers and consumers against one shared queue.
///
/// The pipeline is the only party that marks the queue done: it joins every
/// producer thread first and then calls
/// [`BoundedQueue::mark_producers_done`] once, so no producer can be cut off
/// by a peer that finished earlier. The one exception is a consumer thread
/// that panics: the queue is closed right away so producers waiting for a
/// free slot are released.
pub struct Pipeline<T, D> {
    queue: BoundedQueue<T>,
    sources: Vec<Source<T>>,
    destinations: Vec<D>,
    producer_delay: Duration,
    consumer_delay: Duration,
    observer: Option<Observer<T>>,
    announce: Option<Announce<T>>,
    token: Option<CancelToken>,
}

#[derive(Debug)]
pub struct PipelineReport<D> {
    pub producers: Vec<ProducerReport>,
    pub consumers: Vec<ConsumerReport<D>>,
}

impl<D> PipelineReport<D> {
    pub fn total_produced(&self) -> usize {
        self.producers.iter().map(|p| p.produced).sum()
    }

    pub fn total_consumed(&self) -> usize {
        self.consumers.iter().map(|c| c.consumed).sum()
    }

    /// True if no worker was cancelled.
    pub fn is_complete(&self) -> bool {
        self.producers.iter().all(|p| p.status.is_completed())
            && self.consumers.iter().all(|c| c.status.is_completed())
    }

    pub fn into_destinations(self) -> Vec<D> {
        self.consumers.into_iter().map(|c| c.destination).collect()
    }
}

impl<T, D> Pipeline<T, D>
where
    T: Send + 'static,
    D: Destination<T> + Send + 'static,
{
    pub fn new(queue: BoundedQueue<T>) -> Self {
        Self {
            queue,
            sources: vec![],
            destinations: vec![],
            producer_delay: Duration::ZERO,
            consumer_delay: Duration::ZERO,
            observer: None,
            announce: None,
            token: None,
        }
    }

    /// Adds a producer draining `source`.
    pub fn producer<S>(mut self, source: S) -> Self
    where
        S: IntoIterator<Item = T>,
        S::IntoIter: Send + 'static,
    {
        self.sources.push(Box::new(source.into_iter()));
        self
    }

    /// Adds a consumer appending to `destination`.
    pub fn consumer(mut self, destination: D) -> Self {
        self.destinations.push(destination);
        self
    }

    pub fn producer_delay(mut self, delay: Duration) -> Self {
        self.producer_delay = delay;
        self
    }

    pub fn consumer_delay(mut self, delay: Duration) -> Self {
        self.consumer_delay = delay;
        self
    }

    /// Observer shared by all consumers, called with every received item.
    pub fn observer(mut self, observer: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Spawns one thread per worker and blocks until all of them finished.
    ///
    /// Fails with [`QueueError::InvalidArgument`] if producers are configured
    /// without any consumer, since they could block forever.
    pub fn run(self) -> QueueResult<PipelineReport<D>> {
        let Self {
            queue,
            sources,
            destinations,
            producer_delay,
            consumer_delay,
            observer,
            announce,
            token,
        } = self;

        if destinations.is_empty() && !sources.is_empty() {
            return Err(QueueError::InvalidArgument(
                "a pipeline with producers needs at least one consumer".into(),
            ));
        }

        info!(
            producers = sources.len(),
            consumers = destinations.len(),
            capacity = queue.capacity(),
            "pipeline: starting"
        );

        let mut failure = None;

        // Consumers go first so that every producer that gets spawned has
        // someone draining the queue.
        let mut consumer_handles = vec![];
        for (i, destination) in destinations.into_iter().enumerate() {
            let name = format!("consumer-{}", i);
            let mut consumer = Consumer::new(queue.clone(), destination)
                .with_name(name.clone())
                .with_delay(consumer_delay);
            if let Some(observer) = &observer {
                consumer = consumer.with_observer(Arc::clone(observer));
            }
            if let Some(token) = &token {
                consumer = consumer.with_cancel_token(token.clone());
            }

            let guard = CloseOnPanic {
                name: name.clone(),
                queue: queue.clone(),
            };
            match spawn(&name, move || {
                let _guard = guard;
                consumer.run()
            }) {
                Ok(handle) => consumer_handles.push((name, handle)),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        let mut producer_handles = vec![];
        if failure.is_none() {
            for (i, source) in sources.into_iter().enumerate() {
                let name = format!("producer-{}", i);
                let mut producer = Producer::new(queue.clone(), source)
                    .with_name(name.clone())
                    .with_delay(producer_delay);
                if let Some((snapshot, observer)) = &announce {
                    producer = producer.with_announce((*snapshot, Arc::clone(observer)));
                }
                if let Some(token) = &token {
                    producer = producer.with_cancel_token(token.clone());
                }

                match spawn(&name, move || producer.run()) {
                    Ok(handle) => producer_handles.push((name, handle)),
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
        }

        let producers = join_all(producer_handles, &mut failure);

        // Every producer has stopped, nothing can be enqueued anymore.
        queue.mark_producers_done();

        let consumers = join_all(consumer_handles, &mut failure);

        if let Some(e) = failure {
            return Err(e);
        }

        let report = PipelineReport {
            producers,
            consumers,
        };

        info!(
            produced = report.total_produced(),
            consumed = report.total_consumed(),
            complete = report.is_complete(),
            "pipeline: finished"
        );

        Ok(report)
    }
}

/// Marks the queue done when a consumer thread unwinds, so producers blocked
/// on a full queue get [`QueueError::Closed`] instead of waiting for a drain
/// that never comes.
struct CloseOnPanic<T> {
    name: String,
    queue: BoundedQueue<T>,
}

impl<T> Drop for CloseOnPanic<T> {
    fn drop(&mut self) {
        if thread::panicking() {
            error!("pipeline: {} panicked, closing the queue", self.name);
            self.queue.mark_producers_done();
        }
    }
}

fn spawn<R, F>(name: &str, work: F) -> QueueResult<JoinHandle<R>>
where
    R: Send + 'static,
    F: FnOnce() -> R + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(work)
        .map_err(|e| {
            error!("pipeline: failed to spawn {}: {}", name, e);
            QueueError::Spawn(format!("{}: {}", name, e))
        })
}

fn join_all<R>(handles: Vec<(String, JoinHandle<R>)>, failure: &mut Option<QueueError>) -> Vec<R> {
    let mut reports = Vec::with_capacity(handles.len());
    for (name, handle) in handles {
        match handle.join() {
            Ok(report) => reports.push(report),
            Err(_) => {
                error!("pipeline: worker {} panicked", name);
                failure.get_or_insert(QueueError::WorkerPanicked(name));
            }
        }
    }
    reports
}

impl<T, D> Pipeline<T, D>
where
    T: Clone + Send + 'static,
    D: Destination<T> + Send + 'static,
{
    /// Observer shared by all producers, called with every item once it was
    /// enqueued.
    pub fn producer_observer(mut self, observer: impl Fn(&T) + Send + Sync + 'static) -> Self {
        let snapshot: fn(&T) -> T = Clone::clone;
        let observer: Observer<T> = Arc::new(observer);
        self.announce = Some((snapshot, observer));
        self
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{mpsc, Arc, Mutex},
        thread,
        time::Duration,
    };

    use super::{Pipeline, PipelineReport};
    use crate::{
        cancel::CancelToken,
        destination::Destination,
        error::{QueueError, QueueResult},
        queue::BoundedQueue,
        worker::WorkStatus,
    };

    #[test]
    fn test_single_producer_single_consumer_preserves_order() {
        let queue = BoundedQueue::new(2).unwrap();
        let report = Pipeline::new(queue.clone())
            .producer(0..50)
            .consumer(Vec::new())
            .run()
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.total_produced(), 50);
        let destinations = report.into_destinations();
        assert_eq!(destinations[0], (0..50).collect::<Vec<_>>());
        assert!(queue.is_done());
        assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn test_no_producers_finishes_immediately() {
        let queue = BoundedQueue::<u8>::new(1).unwrap();
        let report = Pipeline::new(queue)
            .consumer(Vec::<u8>::new())
            .consumer(Vec::new())
            .run()
            .unwrap();

        assert_eq!(report.total_consumed(), 0);
        assert!(report.is_complete());
    }

    #[test]
    fn test_producers_without_consumers_are_rejected() {
        let queue = BoundedQueue::new(1).unwrap();
        let result = Pipeline::<_, Vec<i32>>::new(queue.clone())
            .producer(0..10)
            .run();

        assert!(matches!(result, Err(QueueError::InvalidArgument(_))));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_observer_runs_for_every_consumed_item() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);

        let report = Pipeline::new(BoundedQueue::new(3).unwrap())
            .producer(vec!["apple", "banana"])
            .consumer(Vec::new())
            .observer(move |item: &&str| log.lock().unwrap().push(item.to_string()))
            .run()
            .unwrap();

        assert_eq!(report.total_consumed(), 2);
        assert_eq!(*seen.lock().unwrap(), vec!["apple", "banana"]);
    }

    #[test]
    fn test_producer_observer_sees_every_enqueued_item() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);

        let report = Pipeline::new(BoundedQueue::new(1).unwrap())
            .producer(vec!["Capsicum", "Dates"])
            .consumer(Vec::new())
            .producer_observer(move |item: &&str| log.lock().unwrap().push(item.to_string()))
            .run()
            .unwrap();

        assert_eq!(report.total_produced(), 2);
        assert_eq!(*seen.lock().unwrap(), vec!["Capsicum", "Dates"]);
    }

    #[test]
    fn test_cancel_stops_a_paced_pipeline() {
        let token = CancelToken::new();
        let canceller = token.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            canceller.cancel();
        });

        let report = Pipeline::new(BoundedQueue::new(2).unwrap())
            .producer(0..1000)
            .consumer(Vec::new())
            .producer_delay(Duration::from_millis(10))
            .consumer_delay(Duration::from_millis(10))
            .cancel_token(token)
            .run()
            .unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.producers[0].status, WorkStatus::Cancelled);
        assert!(report.total_produced() < 1000);
        assert!(report.total_consumed() <= report.total_produced());
    }

    fn run_in_background<T, D>(
        pipeline: Pipeline<T, D>,
    ) -> mpsc::Receiver<QueueResult<PipelineReport<D>>>
    where
        T: Send + 'static,
        D: Destination<T> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || tx.send(pipeline.run()).unwrap());
        rx
    }

    #[test]
    fn test_panicking_source_surfaces_as_worker_panicked() {
        let source = (0..10).map(|i| {
            if i == 3 {
                panic!("source failed at {}", i);
            }
            i
        });
        let pipeline = Pipeline::new(BoundedQueue::new(2).unwrap())
            .producer(source)
            .producer(10..20)
            .consumer(Vec::new());

        let result = run_in_background(pipeline)
            .recv_timeout(Duration::from_secs(5))
            .unwrap();
        assert_eq!(
            result.unwrap_err(),
            QueueError::WorkerPanicked("producer-0".into())
        );
    }

    #[test]
    fn test_panicking_consumer_does_not_strand_blocked_producer() {
        let queue = BoundedQueue::new(2).unwrap();
        let pipeline = Pipeline::new(queue.clone())
            .producer(0..10)
            .consumer(Vec::new())
            .observer(|item: &i32| {
                if *item == 0 {
                    panic!("observer failed");
                }
            });

        let result = run_in_background(pipeline)
            .recv_timeout(Duration::from_secs(5))
            .unwrap();
        assert_eq!(
            result.unwrap_err(),
            QueueError::WorkerPanicked("consumer-0".into())
        );
        assert!(queue.is_done());
    }
}
