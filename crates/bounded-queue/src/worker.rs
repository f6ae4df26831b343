use std::sync::Arc;

/// Side-effect only callback invoked with every item a worker hands over.
pub type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Observer of enqueued items. The item moves into the queue, so a copy is
/// taken first and shown to the observer once the enqueue succeeded.
pub(crate) type Announce<T> = (fn(&T) -> T, Observer<T>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkStatus {
    /// The worker ran its loop to the natural end.
    Completed,
    /// The worker stopped early. Whatever it already handed over stays put.
    Cancelled,
}

impl WorkStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, WorkStatus::Completed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerReport {
    pub name: String,
    pub produced: usize,
    pub status: WorkStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerReport<D> {
    pub name: String,
    pub consumed: usize,
    pub status: WorkStatus,
    pub destination: D,
}
