//! A bounded, blocking FIFO queue for handing items from producer threads to
//! consumer threads, with a one-way "producers are done" signal.
//!
//! ```text
//! Producer ─┐                      ┌─> Consumer ─> Destination
//! Producer ─┼─> BoundedQueue<T> ───┼─> Consumer ─> Destination
//! Producer ─┘   (capacity, done)   └─> Consumer ─> Destination
//! ```
//!
//! Consumers drain until [`BoundedQueue::dequeue`] returns `None`, which
//! happens exactly once the queue was marked done and is empty. With more than
//! one producer, marking done is left to whoever joins all producers, which is
//! what [`Pipeline`] does.
//!
//! Blocking calls can be interrupted through a [`CancelToken`]. Cancellation
//! is reported as [`QueueError::Cancelled`] or [`WorkStatus::Cancelled`] and is
//! never confused with end of stream.
//!
//! ```rust,no_run
//! use bounded_queue::{BoundedQueue, Pipeline};
//!
//! # fn main() -> Result<(), bounded_queue::QueueError> {
//! let queue = BoundedQueue::new(5)?;
//! let report = Pipeline::new(queue)
//!     .producer(vec!["apple", "banana"])
//!     .producer(vec!["Capsicum", "Dates"])
//!     .consumer(Vec::<&str>::new())
//!     .run()?;
//!
//! assert_eq!(report.total_consumed(), 4);
//! # Ok(())
//! # }
//! ```

mod cancel;
mod consumer;
mod destination;
mod error;
mod pipeline;
mod producer;
mod queue;
mod worker;

pub use cancel::CancelToken;
pub use consumer::Consumer;
pub use destination::Destination;
pub use error::{QueueError, QueueResult, Rejected};
pub use pipeline::{Pipeline, PipelineReport};
pub use producer::Producer;
pub use queue::{BoundedQueue, QueueState};
pub use worker::{ConsumerReport, Observer, ProducerReport, WorkStatus};
