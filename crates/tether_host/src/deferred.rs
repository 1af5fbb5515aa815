//! Host-side deferred
//!
//! A [`Deferred`] is a future-like cell that completes exactly once, either
//! fulfilled with an optional host object or rejected with a
//! [`HostException`]. It may be completed from any thread.

use crate::object::{HostException, HostObject};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

type Listener = Box<dyn FnOnce(&Outcome) + Send>;

static NEXT_DEFERRED_ID: AtomicU64 = AtomicU64::new(1);

/// Terminal result of a deferred.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// `None` is a fulfilled `null`.
    Fulfilled(Option<Arc<HostObject>>),
    Rejected(HostException),
}

impl Outcome {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Outcome::Fulfilled(_))
    }
}

enum State {
    Pending(Vec<Listener>),
    Complete(Outcome),
}

struct Inner {
    id: u64,
    state: Mutex<State>,
    completed: Notify,
}

/// Single-assignment completion cell shared between the two runtimes.
#[derive(Clone)]
pub struct Deferred {
    inner: Arc<Inner>,
}

impl Deferred {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                id: NEXT_DEFERRED_ID.fetch_add(1, Ordering::Relaxed),
                state: Mutex::new(State::Pending(Vec::new())),
                completed: Notify::new(),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn same_as(&self, other: &Deferred) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Complete the deferred. Returns `false` if it had already completed, in
    /// which case `outcome` is discarded.
    pub fn complete(&self, outcome: Outcome) -> bool {
        let listeners = {
            let mut state = self.lock();
            match &mut *state {
                State::Complete(_) => {
                    tracing::debug!(deferred = self.id(), "ignoring second completion");
                    return false;
                }
                State::Pending(listeners) => {
                    let listeners = std::mem::take(listeners);
                    *state = State::Complete(outcome.clone());
                    listeners
                }
            }
        };

        tracing::trace!(
            deferred = self.id(),
            fulfilled = outcome.is_fulfilled(),
            "deferred completed"
        );
        // Listeners run outside the lock so they may inspect the deferred.
        for listener in listeners {
            listener(&outcome);
        }
        self.inner.completed.notify_waiters();
        true
    }

    pub fn resolve(&self, value: Option<Arc<HostObject>>) -> bool {
        self.complete(Outcome::Fulfilled(value))
    }

    pub fn reject(&self, exception: HostException) -> bool {
        self.complete(Outcome::Rejected(exception))
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match &*self.lock() {
            State::Pending(_) => None,
            State::Complete(outcome) => Some(outcome.clone()),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(&*self.lock(), State::Complete(_))
    }

    /// Run `listener` once the deferred completes, on the completing thread.
    /// Runs immediately if the deferred is already complete.
    pub fn on_complete(&self, listener: impl FnOnce(&Outcome) + Send + 'static) {
        let outcome = {
            let mut state = self.lock();
            match &mut *state {
                State::Pending(listeners) => {
                    listeners.push(Box::new(listener));
                    return;
                }
                State::Complete(outcome) => outcome.clone(),
            }
        };
        listener(&outcome);
    }

    /// Wait for completion without blocking the thread.
    pub async fn wait(&self) -> Outcome {
        loop {
            let notified = self.inner.completed.notified();
            if let Some(outcome) = self.outcome() {
                return outcome;
            }
            notified.await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Deferred {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("id", &self.id())
            .field("completed", &self.is_completed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn completes_only_once() {
        let deferred = Deferred::new();
        assert!(deferred.resolve(Some(Arc::new(HostObject::Integer(1)))));
        assert!(!deferred.reject(HostException::new("late")));
        assert_eq!(
            deferred.outcome(),
            Some(Outcome::Fulfilled(Some(Arc::new(HostObject::Integer(1)))))
        );
    }

    #[test]
    fn listeners_fire_once_and_late_listeners_fire_immediately() {
        let deferred = Deferred::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let early = calls.clone();
        deferred.on_complete(move |outcome| {
            assert!(!outcome.is_fulfilled());
            early.fetch_add(1, Ordering::SeqCst);
        });
        deferred.reject(HostException::new("nope"));
        deferred.reject(HostException::new("again"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let late = calls.clone();
        deferred.on_complete(move |_| {
            late.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn wait_resolves_from_another_thread() {
        let deferred = Deferred::new();
        let completer = deferred.clone();
        let handle = std::thread::spawn(move || {
            completer.resolve(Some(Arc::new(HostObject::String("done".into()))));
        });

        let outcome = deferred.wait().await;
        handle.join().unwrap();
        assert_eq!(
            outcome,
            Outcome::Fulfilled(Some(Arc::new(HostObject::String("done".into()))))
        );
    }
}
