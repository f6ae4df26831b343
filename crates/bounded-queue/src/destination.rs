use std::sync::{Arc, Mutex, PoisonError};

/// Where a consumer puts the items it drains.
///
/// The queue does not synchronize destinations. A `Vec` belongs to exactly
/// one consumer; consumers that must share a collection use
/// `Arc<Mutex<Vec<T>>>`.
pub trait Destination<T> {
    fn append(&mut self, item: T);
}

impl<T> Destination<T> for Vec<T> {
    fn append(&mut self, item: T) {
        self.push(item);
    }
}

impl<T> Destination<T> for Arc<Mutex<Vec<T>>> {
    fn append(&mut self, item: T) {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(item);
    }
}
