use std::fmt::{Debug, Display};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("operation was cancelled")]
    Cancelled,
    #[error("operation timed out")]
    Timeout,
    #[error("producers are done, queue accepts no more items")]
    Closed,
    #[error("queue is full")]
    Full,
    #[error("queue is empty")]
    Empty,
    #[error("failed to spawn worker thread {0}")]
    Spawn(String),
    #[error("worker thread {0} panicked")]
    WorkerPanicked(String),
}

/// An item that could not be enqueued, handed back to the caller together
/// with the reason it was rejected.
pub struct Rejected<T> {
    pub item: T,
    pub reason: QueueError,
}

impl<T> Rejected<T> {
    pub(crate) fn new(item: T, reason: QueueError) -> Self {
        Self { item, reason }
    }

    pub fn into_inner(self) -> T {
        self.item
    }
}

// Items are not required to be `Debug`, so only the reason is printed.
impl<T> Debug for Rejected<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rejected")
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

impl<T> Display for Rejected<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "item rejected: {}", self.reason)
    }
}

impl<T> std::error::Error for Rejected<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.reason)
    }
}

pub type QueueResult<T> = Result<T, QueueError>;

#[cfg(test)]
mod tests {
    use super::{QueueError, Rejected};

    #[test]
    fn test_rejected_display_and_debug_hide_item() {
        let rejected = Rejected::new(vec![1, 2, 3], QueueError::Closed);
        assert_eq!(
            format!("{}", rejected),
            "item rejected: producers are done, queue accepts no more items"
        );
        assert_eq!(format!("{:?}", rejected), "Rejected { reason: Closed, .. }");
        assert_eq!(rejected.into_inner(), vec![1, 2, 3]);
    }
}
