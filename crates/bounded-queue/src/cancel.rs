use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Condvar, Mutex, PoisonError, Weak,
    },
    time::{Duration, Instant},
};

use crate::error::{QueueError, QueueResult};

/// Something that parks threads and can be asked to wake all of them so they
/// re-check their wait condition.
pub(crate) trait Interrupt: Send + Sync {
    fn interrupt(&self);
}

/// Cloneable one-way cancellation signal.
///
/// Threads blocked in [`BoundedQueue::enqueue_cancellable`],
/// [`BoundedQueue::dequeue_cancellable`] or [`CancelToken::sleep`] return
/// [`QueueError::Cancelled`] once any clone of the token is cancelled.
///
/// [`BoundedQueue::enqueue_cancellable`]: crate::BoundedQueue::enqueue_cancellable
/// [`BoundedQueue::dequeue_cancellable`]: crate::BoundedQueue::dequeue_cancellable
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<TokenInner>,
}

#[derive(Default)]
struct TokenInner {
    cancelled: AtomicBool,
    sleep_lock: Mutex<()>,
    sleep_signal: Condvar,
    listeners: Mutex<Vec<Weak<dyn Interrupt>>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Err(QueueError::Cancelled)` if the token has fired.
    pub fn check(&self) -> QueueResult<()> {
        if self.is_cancelled() {
            Err(QueueError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Cancels the token and wakes every thread parked on it. Idempotent.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::debug!("cancel token fired");

        {
            // Sleepers test the flag while holding this lock, so taking it
            // here orders the notification after their check.
            let _guard = self
                .inner
                .sleep_lock
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            self.inner.sleep_signal.notify_all();
        }

        let listeners = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(Weak::upgrade)
            .collect::<Vec<_>>();

        for listener in listeners {
            listener.interrupt();
        }
    }

    /// Sleeps for `duration` unless the token is cancelled first.
    /// A zero duration only checks the token.
    pub fn sleep(&self, duration: Duration) -> QueueResult<()> {
        if duration.is_zero() {
            return self.check();
        }

        let deadline = Instant::now() + duration;
        let mut guard = self
            .inner
            .sleep_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        loop {
            self.check()?;

            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }

            guard = self
                .inner
                .sleep_signal
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    pub(crate) fn register(&self, listener: Weak<dyn Interrupt>) {
        let mut listeners = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        listeners.retain(|l| l.strong_count() > 0);
        if !listeners.iter().any(|l| Weak::ptr_eq(l, &listener)) {
            listeners.push(listener);
        }
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Sleeps for the pacing delay, interruptibly if a token is given.
pub(crate) fn pace(delay: Duration, token: Option<&CancelToken>) -> QueueResult<()> {
    match token {
        Some(token) => token.sleep(delay),
        None => {
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
            Ok(())
        }
    }
}
