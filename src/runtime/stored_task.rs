//! Stored task type for runtime future storage.
//!
//! `StoredTask` wraps a type-erased, thread-local future together with the
//! waker that re-schedules it. The future is taken out of its slot while it
//! is polled, so a task may spawn other tasks without re-entering the slab
//! borrow that holds it.

use crate::runtime::waker::TaskWaker;
use crate::types::TaskId;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

type LocalFuture = Pin<Box<dyn Future<Output = ()>>>;

/// A type-erased future stored in the runtime.
pub(crate) struct StoredTask {
    id: TaskId,
    future: Option<LocalFuture>,
    waker: Arc<TaskWaker>,
}

impl StoredTask {
    /// Creates a new stored task from a future.
    ///
    /// The future should already be wrapped to hand its output to the
    /// task's `JoinHandle`.
    pub(crate) fn new<F>(id: TaskId, future: F, waker: Arc<TaskWaker>) -> Self
    where
        F: Future<Output = ()> + 'static,
    {
        Self {
            id,
            future: Some(Box::pin(future)),
            waker,
        }
    }

    pub(crate) const fn id(&self) -> TaskId {
        self.id
    }

    pub(crate) fn waker(&self) -> &Arc<TaskWaker> {
        &self.waker
    }

    /// Moves the future out of the slot for polling.
    pub(crate) fn take_future(&mut self) -> Option<LocalFuture> {
        self.future.take()
    }

    /// Puts a still-pending future back into its slot.
    pub(crate) fn restore_future(&mut self, future: LocalFuture) {
        self.future = Some(future);
    }
}

/// Polls a detached task future once with the task's own waker.
pub(crate) fn poll_detached(future: &mut LocalFuture, waker: &Arc<TaskWaker>) -> Poll<()> {
    waker.clear_scheduled();
    let waker = Waker::from(Arc::clone(waker));
    let mut cx = Context::from_waker(&waker);
    future.as_mut().poll(&mut cx)
}

impl std::fmt::Debug for StoredTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredTask")
            .field("id", &self.id)
            .field("in_slot", &self.future.is_some())
            .finish_non_exhaustive()
    }
}
