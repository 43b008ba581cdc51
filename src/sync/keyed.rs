//! Per-key serialization of asynchronous operations.
//!
//! A [`LockRegistry`] maps each key to the deferred value of the most recent
//! operation registered under it. [`LockRegistry::synchronized`] reads that
//! entry and replaces it with the new operation's deferred value under a
//! single lock hold, so two calls for the same key never chain on the same
//! predecessor. The new operation then either:
//!
//! - runs at once, if the key had no entry or its entry already settled, or
//! - waits for the pending predecessor and runs after it settles.
//!
//! Each operation is told about its predecessor through [`Predecessor`].
//! Entries are never removed automatically; callers bound the key space or
//! call [`LockRegistry::clear`].
//!
//! # Example
//!
//! ```
//! use franken_deferred::runtime::LocalRuntime;
//! use franken_deferred::sync::LockRegistry;
//! use franken_deferred::time::sleep;
//! use std::time::Duration;
//!
//! let rt = LocalRuntime::virtual_time();
//! let registry = LockRegistry::<&str, u32, ()>::new();
//! let out = rt
//!     .block_on(async {
//!         let first = registry.synchronized("account", |_| async {
//!             sleep(Duration::from_millis(10)).await;
//!             Ok(1)
//!         });
//!         let second = registry.synchronized("account", |previous| async move {
//!             Ok(previous.map_or(0, |p| p.outcome.unwrap_or(0)) + 1)
//!         });
//!         (first.await, second.await)
//!     })
//!     .unwrap();
//! assert_eq!(out, (Ok(1), Ok(2)));
//! ```

use crate::deferred::Deferred;
use crate::runtime;
use crate::tracing_compat::trace;
use crate::types::SettlementState;
use hashbrown::HashMap;
use parking_lot::Mutex;
use std::fmt;
use std::future::IntoFuture;
use std::hash::Hash;

/// What an operation learns about the one registered before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predecessor<T, E> {
    /// State observed when this operation was registered.
    pub state: SettlementState,
    /// State the predecessor finally settled to.
    pub settled: SettlementState,
    /// The predecessor's outcome.
    pub outcome: Result<T, E>,
}

impl<T, E> Predecessor<T, E> {
    fn observed(state: SettlementState, outcome: Result<T, E>) -> Self {
        Self {
            state,
            settled: SettlementState::of(&outcome),
            outcome,
        }
    }

    /// Returns true if this operation had to wait for the predecessor.
    #[must_use]
    pub const fn was_pending(&self) -> bool {
        self.state.is_pending()
    }
}

/// Table of the latest deferred value per key.
pub struct LockRegistry<K, T, E> {
    table: Mutex<HashMap<K, Deferred<T, E>>>,
}

impl<K, T, E> LockRegistry<K, T, E>
where
    K: Eq + Hash,
{
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the number of keys ever registered since the last clear.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    /// Returns true if no key is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.lock().is_empty()
    }

    /// Returns true if `key` has an entry.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.table.lock().contains_key(key)
    }

    /// Returns the settlement state of the latest operation for `key`.
    #[must_use]
    pub fn state_of(&self, key: &K) -> Option<SettlementState> {
        self.table.lock().get(key).map(Deferred::state)
    }

    /// Forgets every entry. Operations already running are unaffected.
    pub fn clear(&self) {
        self.table.lock().clear();
    }
}

impl<K, T, E> LockRegistry<K, T, E>
where
    K: Eq + Hash,
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Runs `operation` after every operation previously registered for
    /// `key`, and returns its deferred value.
    ///
    /// With no entry, or a settled one, `operation` is called before this
    /// returns. With a pending entry it is called once that entry settles.
    ///
    /// # Panics
    ///
    /// Panics outside a runtime.
    pub fn synchronized<Op, Fut>(&self, key: K, operation: Op) -> Deferred<T, E>
    where
        Op: FnOnce(Option<Predecessor<T, E>>) -> Fut + 'static,
        Fut: IntoFuture<Output = Result<T, E>>,
        Fut::IntoFuture: 'static,
    {
        let (current, completer) = Deferred::new();
        let previous = {
            let mut table = self.table.lock();
            table
                .insert(key, current.clone())
                .map(|previous| (previous.try_outcome(), previous))
        };

        match previous {
            None => {
                let pending = operation(None).into_future();
                runtime::spawn(async move {
                    completer.settle(pending.await);
                })
                .detach();
            }
            Some((Some(outcome), _)) => {
                let state = SettlementState::of(&outcome);
                let pending = operation(Some(Predecessor::observed(state, outcome))).into_future();
                runtime::spawn(async move {
                    completer.settle(pending.await);
                })
                .detach();
            }
            Some((None, predecessor)) => {
                trace!("chaining on pending predecessor");
                runtime::spawn(async move {
                    let outcome = predecessor.await;
                    let previous = Predecessor::observed(SettlementState::Pending, outcome);
                    completer.settle(operation(Some(previous)).await);
                })
                .detach();
            }
        }
        current
    }

    /// Alias of [`synchronized`](Self::synchronized).
    ///
    /// # Panics
    ///
    /// Panics outside a runtime.
    pub fn synchronised<Op, Fut>(&self, key: K, operation: Op) -> Deferred<T, E>
    where
        Op: FnOnce(Option<Predecessor<T, E>>) -> Fut + 'static,
        Fut: IntoFuture<Output = Result<T, E>>,
        Fut::IntoFuture: 'static,
    {
        self.synchronized(key, operation)
    }
}

impl<K: Eq + Hash, T, E> Default for LockRegistry<K, T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T, E> fmt::Debug for LockRegistry<K, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockRegistry")
            .field("keys", &self.table.lock().len())
            .finish()
    }
}
