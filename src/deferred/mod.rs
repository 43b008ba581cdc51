//! One-shot deferred values.
//!
//! A [`Deferred<T, E>`] is a shared handle on a `Result<T, E>` that settles
//! exactly once. Its write side is a [`Completer`]; the first settlement
//! wins and every later attempt is ignored. Any number of clones may await
//! the same settlement, each receiving a clone of the outcome. Awaiting never
//! restarts the work that produces the value.
//!
//! Both halves are `Send + Sync` when `T` and `E` are, so a value can be
//! settled from another thread while a runtime awaits it.
//!
//! ```
//! use franken_deferred::deferred::Deferred;
//! use franken_deferred::runtime::LocalRuntime;
//!
//! let rt = LocalRuntime::virtual_time();
//! let out = rt
//!     .block_on(async {
//!         let (value, completer) = Deferred::<u8, String>::new();
//!         assert!(completer.fulfill(3));
//!         assert!(!completer.reject("too late".into()));
//!         value.await
//!     })
//!     .unwrap();
//! assert_eq!(out, Ok(3));
//! ```

mod probe;
mod source;

pub use probe::{StateProbe, promise_state};
pub use source::ValueSource;

use crate::error::Result as RuntimeResult;
use crate::runtime;
use crate::types::SettlementState;
use parking_lot::Mutex;
use slab::Slab;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

struct Shared<T, E> {
    outcome: Option<Result<T, E>>,
    observers: Slab<Waker>,
}

/// Read side of a one-shot settlement.
pub struct Deferred<T, E> {
    shared: Arc<Mutex<Shared<T, E>>>,
}

/// Write side of a [`Deferred`]. Cloning it yields another writer of the
/// same settlement.
pub struct Completer<T, E> {
    shared: Arc<Mutex<Shared<T, E>>>,
}

impl<T, E> Deferred<T, E> {
    /// Creates a pending value together with its completer.
    #[must_use]
    pub fn new() -> (Self, Completer<T, E>) {
        let shared = Arc::new(Mutex::new(Shared {
            outcome: None,
            observers: Slab::new(),
        }));
        (
            Self {
                shared: Arc::clone(&shared),
            },
            Completer { shared },
        )
    }

    /// Creates a value that is already settled with `outcome`.
    #[must_use]
    pub fn settled_with(outcome: Result<T, E>) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                outcome: Some(outcome),
                observers: Slab::new(),
            })),
        }
    }

    /// Creates a value already fulfilled with `value`.
    #[must_use]
    pub fn fulfilled(value: T) -> Self {
        Self::settled_with(Ok(value))
    }

    /// Creates a value already rejected with `error`.
    #[must_use]
    pub fn rejected(error: E) -> Self {
        Self::settled_with(Err(error))
    }

    /// Runs `future` as a task on the current runtime and settles with its
    /// output.
    ///
    /// # Panics
    ///
    /// Panics outside a runtime. See [`try_spawn`](Self::try_spawn).
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + 'static,
        T: 'static,
        E: 'static,
    {
        match Self::try_spawn(future) {
            Ok(deferred) => deferred,
            Err(err) => panic!("Deferred::spawn: {err}"),
        }
    }

    /// Runs `future` as a task on the current runtime and settles with its
    /// output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRuntime`](crate::Error::NoRuntime) outside a runtime.
    pub fn try_spawn<F>(future: F) -> RuntimeResult<Self>
    where
        F: Future<Output = Result<T, E>> + 'static,
        T: 'static,
        E: 'static,
    {
        let (deferred, completer) = Self::new();
        runtime::try_spawn(async move {
            let outcome = future.await;
            completer.settle(outcome);
        })?
        .detach();
        Ok(deferred)
    }

    /// Returns the current settlement state without suspending.
    #[must_use]
    pub fn state(&self) -> SettlementState {
        self.shared
            .lock()
            .outcome
            .as_ref()
            .map_or(SettlementState::Pending, SettlementState::of)
    }

    /// Returns true while the value has not settled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state().is_pending()
    }

    /// Returns a future that resolves to a clone of the outcome.
    pub fn settled(&self) -> Settled<T, E> {
        Settled {
            shared: Arc::clone(&self.shared),
            slot: None,
        }
    }

    /// Returns true if both handles observe the same settlement.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<T: Clone, E: Clone> Deferred<T, E> {
    /// Returns a clone of the outcome if it has settled.
    #[must_use]
    pub fn try_outcome(&self) -> Option<Result<T, E>> {
        self.shared.lock().outcome.clone()
    }
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, E> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<T: Clone, E: Clone> IntoFuture for Deferred<T, E> {
    type Output = Result<T, E>;
    type IntoFuture = Settled<T, E>;

    fn into_future(self) -> Self::IntoFuture {
        Settled {
            shared: self.shared,
            slot: None,
        }
    }
}

impl<T, E> Completer<T, E> {
    /// Settles the value. Returns false if it had already settled.
    pub fn settle(&self, outcome: Result<T, E>) -> bool {
        let observers = {
            let mut shared = self.shared.lock();
            if shared.outcome.is_some() {
                return false;
            }
            shared.outcome = Some(outcome);
            shared.observers.drain().collect::<Vec<_>>()
        };
        for waker in observers {
            waker.wake();
        }
        true
    }

    /// Settles the value as fulfilled.
    pub fn fulfill(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Settles the value as rejected.
    pub fn reject(&self, error: E) -> bool {
        self.settle(Err(error))
    }

    /// Returns a read handle on the value this completer settles.
    #[must_use]
    pub fn deferred(&self) -> Deferred<T, E> {
        Deferred {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Returns true once the value has settled.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.shared.lock().outcome.is_some()
    }
}

impl<T, E> Clone for Completer<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, E> fmt::Debug for Completer<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer")
            .field("settled", &self.is_settled())
            .finish_non_exhaustive()
    }
}

/// Future returned by [`Deferred::settled`] and by awaiting a `Deferred`.
#[must_use = "futures do nothing unless polled"]
pub struct Settled<T, E> {
    shared: Arc<Mutex<Shared<T, E>>>,
    slot: Option<usize>,
}

impl<T: Clone, E: Clone> Future for Settled<T, E> {
    type Output = Result<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        let mut shared = this.shared.lock();
        if let Some(outcome) = &shared.outcome {
            let outcome = outcome.clone();
            this.slot = None;
            return Poll::Ready(outcome);
        }
        match this.slot.and_then(|key| shared.observers.get_mut(key)) {
            Some(waker) => {
                if !waker.will_wake(cx.waker()) {
                    waker.clone_from(cx.waker());
                }
            }
            None => this.slot = Some(shared.observers.insert(cx.waker().clone())),
        }
        Poll::Pending
    }
}

impl<T, E> Drop for Settled<T, E> {
    fn drop(&mut self) {
        if let Some(key) = self.slot.take() {
            let mut shared = self.shared.lock();
            if shared.outcome.is_none() {
                shared.observers.try_remove(key);
            }
        }
    }
}

impl<T, E> fmt::Debug for Settled<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settled")
            .field("registered", &self.slot.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{self, LocalRuntime};
    use crate::time::sleep;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    #[test]
    fn first_settlement_wins() {
        crate::test_utils::init_test_logging();
        crate::test_phase!("first_settlement_wins");
        let (value, completer) = Deferred::<u8, &str>::new();
        assert_eq!(value.state(), SettlementState::Pending);
        assert!(completer.reject("first"));
        assert!(!completer.fulfill(1));
        assert!(!completer.clone().reject("third"));
        assert_eq!(value.state(), SettlementState::Rejected);
        assert_eq!(value.try_outcome(), Some(Err("first")));
        crate::test_complete!("first_settlement_wins");
    }

    #[test]
    fn every_clone_observes_the_same_outcome() {
        let rt = LocalRuntime::virtual_time();
        let (value, completer) = Deferred::<String, ()>::new();
        let out = rt
            .block_on(async move {
                let observers: Vec<_> = (0..3)
                    .map(|_| runtime::spawn(value.clone().into_future()))
                    .collect();
                runtime::spawn(async move {
                    sleep(Duration::from_millis(5)).await;
                    completer.fulfill("ready".to_string());
                })
                .detach();
                let mut outs = Vec::new();
                for observer in observers {
                    outs.push(observer.await);
                }
                outs
            })
            .unwrap();
        assert_eq!(out, vec![Ok("ready".to_string()); 3]);
    }

    #[test]
    fn spawn_runs_the_computation_once() {
        let rt = LocalRuntime::virtual_time();
        let runs = Rc::new(Cell::new(0));
        let out = rt
            .block_on({
                let runs = Rc::clone(&runs);
                async move {
                    let value = Deferred::<u32, ()>::spawn(async move {
                        runs.set(runs.get() + 1);
                        Ok(9)
                    });
                    let a = value.clone().await;
                    let b = value.await;
                    (a, b)
                }
            })
            .unwrap();
        assert_eq!(out, (Ok(9), Ok(9)));
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn dropped_observer_deregisters() {
        let (value, completer) = Deferred::<u8, ()>::new();
        let rt = LocalRuntime::virtual_time();
        rt.block_on(async {
            let mut observer = value.settled();
            assert!(
                futures_lite::future::poll_once(&mut observer)
                    .await
                    .is_none()
            );
            assert_eq!(value.shared.lock().observers.len(), 1);
            drop(observer);
            assert_eq!(value.shared.lock().observers.len(), 0);
        })
        .unwrap();
        assert!(completer.fulfill(1));
    }

    #[test]
    fn spawn_outside_runtime_is_an_error() {
        let err = Deferred::<(), ()>::try_spawn(async { Ok(()) }).unwrap_err();
        assert_eq!(err, crate::Error::NoRuntime);
    }

    #[test]
    fn ready_constructors() {
        assert_eq!(
            Deferred::<u8, ()>::fulfilled(1).state(),
            SettlementState::Fulfilled
        );
        let rejected = Deferred::<u8, &str>::rejected("x");
        assert_eq!(rejected.state(), SettlementState::Rejected);
        assert!(rejected.ptr_eq(&rejected.clone()));
        assert!(!rejected.ptr_eq(&Deferred::rejected("x")));
        assert!(format!("{rejected:?}").contains("Rejected"));
    }
}
