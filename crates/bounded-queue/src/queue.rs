use std::{
    collections::VecDeque,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak},
    time::{Duration, Instant},
};

use crate::{
    cancel::{CancelToken, Interrupt},
    error::{QueueError, QueueResult, Rejected},
};

/// Lifecycle of a [`BoundedQueue`]. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// Producers may still enqueue.
    Active,
    /// Producers are done, items remain to be drained.
    Draining,
    /// Producers are done and the queue is empty. Terminal.
    Closed,
}

/// Fixed-capacity FIFO queue shared between producer and consumer threads.
///
/// The queue is a handle: cloning it is cheap and every clone refers to the
/// same underlying buffer. All state lives behind one mutex, with one condition
/// variable for "an item arrived or producers finished" and one for "a slot
/// was freed".
///
/// Consumers drain with [`BoundedQueue::dequeue`] until it yields `None`,
/// which only happens once [`BoundedQueue::mark_producers_done`] was called
/// and every queued item has been handed out.
pub struct BoundedQueue<T> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

struct State<T> {
    items: VecDeque<T>,
    done: bool,
}

/// How long a blocking operation is allowed to wait.
enum Wait<'a> {
    Forever,
    Until(Instant),
    Token(&'a CancelToken),
    Never,
}

impl Wait<'_> {
    /// A deadline too far out to be represented never expires.
    fn after(timeout: Duration) -> Wait<'static> {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => Wait::Until(deadline),
            None => Wait::Forever,
        }
    }

    /// Called with the lock held, right before parking.
    fn check(&self, would_block: QueueError) -> QueueResult<()> {
        match self {
            Wait::Forever => Ok(()),
            Wait::Until(deadline) if Instant::now() >= *deadline => Err(QueueError::Timeout),
            Wait::Until(_) => Ok(()),
            Wait::Token(token) => token.check(),
            Wait::Never => Err(would_block),
        }
    }

    fn park<'g, T>(
        &self,
        signal: &Condvar,
        guard: MutexGuard<'g, State<T>>,
    ) -> MutexGuard<'g, State<T>> {
        match self {
            Wait::Until(deadline) => {
                let timeout = deadline.saturating_duration_since(Instant::now());
                signal
                    .wait_timeout(guard, timeout)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
            _ => signal.wait(guard).unwrap_or_else(PoisonError::into_inner),
        }
    }
}

impl<T> Shared<T> {
    // Every critical section below is panic free, so a poisoned lock still
    // guards consistent state and is safe to keep using.
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Send> Interrupt for Shared<T> {
    fn interrupt(&self) {
        let _state = self.lock();
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }
}

impl<T> BoundedQueue<T> {
    /// Creates an empty, active queue holding at most `capacity` items.
    pub fn new(capacity: usize) -> QueueResult<Self> {
        if capacity < 1 {
            return Err(QueueError::InvalidArgument(format!(
                "capacity must be at least 1, got {}",
                capacity
            )));
        }

        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    items: VecDeque::with_capacity(capacity),
                    done: false,
                }),
                not_empty: Condvar::new(),
                not_full: Condvar::new(),
                capacity,
            }),
        })
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Appends `item`, blocking while the queue is full.
    ///
    /// The item is handed back with [`QueueError::Closed`] if producers were
    /// already marked done, or are marked done while this call waits.
    pub fn enqueue(&self, item: T) -> Result<(), Rejected<T>> {
        self.push(item, Wait::Forever)
    }

    /// Like [`BoundedQueue::enqueue`] but gives up with
    /// [`QueueError::Timeout`] after `timeout`.
    pub fn enqueue_timeout(&self, item: T, timeout: Duration) -> Result<(), Rejected<T>> {
        self.push(item, Wait::after(timeout))
    }

    /// Appends `item` only if there is room right now, otherwise hands it
    /// back with [`QueueError::Full`].
    pub fn try_enqueue(&self, item: T) -> Result<(), Rejected<T>> {
        self.push(item, Wait::Never)
    }

    /// Removes the head item, blocking while the queue is empty and producers
    /// are not done yet.
    ///
    /// Returns `None` once producers are done and the queue is drained; every
    /// later call returns `None` immediately.
    pub fn dequeue(&self) -> Option<T> {
        match self.pop(Wait::Forever) {
            Ok(item) => item,
            // Waiting forever has no failure path.
            Err(_) => None,
        }
    }

    /// Like [`BoundedQueue::dequeue`] but gives up with
    /// [`QueueError::Timeout`] after `timeout`.
    pub fn dequeue_timeout(&self, timeout: Duration) -> QueueResult<Option<T>> {
        self.pop(Wait::after(timeout))
    }

    /// Non-blocking dequeue. Fails with [`QueueError::Empty`] if nothing is
    /// queued but producers are still active.
    pub fn try_dequeue(&self) -> QueueResult<Option<T>> {
        self.pop(Wait::Never)
    }

    /// Signals that no producer will enqueue again and wakes every waiter.
    /// Calling it more than once has no further effect.
    pub fn mark_producers_done(&self) {
        let mut state = self.shared.lock();
        if !state.done {
            state.done = true;
            tracing::debug!(
                remaining = state.items.len(),
                "queue: producers marked done"
            );
        }
        self.shared.not_empty.notify_all();
        self.shared.not_full.notify_all();
    }

    pub fn is_done(&self) -> bool {
        self.shared.lock().done
    }

    pub fn len(&self) -> usize {
        self.shared.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.lock().items.is_empty()
    }

    pub fn state(&self) -> QueueState {
        let state = self.shared.lock();
        match (state.done, state.items.is_empty()) {
            (false, _) => QueueState::Active,
            (true, false) => QueueState::Draining,
            (true, true) => QueueState::Closed,
        }
    }

    fn push(&self, item: T, wait: Wait<'_>) -> Result<(), Rejected<T>> {
        let shared = &*self.shared;
        let mut state = shared.lock();

        loop {
            if state.done {
                return Err(Rejected::new(item, QueueError::Closed));
            }

            if state.items.len() < shared.capacity {
                break;
            }

            // The slot check above runs before giving up, so a waiter that
            // was woken for a freed slot always takes it.
            if let Err(reason) = wait.check(QueueError::Full) {
                return Err(Rejected::new(item, reason));
            }

            state = wait.park(&shared.not_full, state);
        }

        state.items.push_back(item);
        debug_assert!(state.items.len() <= shared.capacity);
        shared.not_empty.notify_one();

        Ok(())
    }

    fn pop(&self, wait: Wait<'_>) -> QueueResult<Option<T>> {
        let shared = &*self.shared;
        let mut state = shared.lock();

        loop {
            if let Some(item) = state.items.pop_front() {
                shared.not_full.notify_one();
                return Ok(Some(item));
            }

            if state.done {
                return Ok(None);
            }

            wait.check(QueueError::Empty)?;

            state = wait.park(&shared.not_empty, state);
        }
    }
}

impl<T: Send + 'static> BoundedQueue<T> {
    /// Like [`BoundedQueue::enqueue`] but returns [`QueueError::Cancelled`]
    /// (handing the item back) once `token` is cancelled while waiting.
    pub fn enqueue_cancellable(&self, item: T, token: &CancelToken) -> Result<(), Rejected<T>> {
        token.register(self.listener());
        self.push(item, Wait::Token(token))
    }

    /// Like [`BoundedQueue::dequeue`] but returns [`QueueError::Cancelled`]
    /// once `token` is cancelled while waiting. `Ok(None)` still means the
    /// queue is drained for good.
    pub fn dequeue_cancellable(&self, token: &CancelToken) -> QueueResult<Option<T>> {
        token.register(self.listener());
        self.pop(Wait::Token(token))
    }

    fn listener(&self) -> Weak<dyn Interrupt> {
        let weak: Weak<Shared<T>> = Arc::downgrade(&self.shared);
        weak
    }
}

impl<T> Clone for BoundedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> std::fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("BoundedQueue")
            .field("capacity", &self.shared.capacity)
            .field("len", &state.items.len())
            .field("done", &state.done)
            .finish()
    }
}
