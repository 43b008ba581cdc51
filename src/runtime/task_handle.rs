//! `JoinHandle` for awaiting spawned task results.
//!
//! Dropping a handle detaches the task: it keeps running and its output is
//! discarded when it finishes.

use crate::types::TaskId;
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

#[derive(Debug)]
pub(crate) struct JoinState<T> {
    output: Option<T>,
    finished: bool,
    waker: Option<Waker>,
}

impl<T> JoinState<T> {
    pub(crate) const fn new() -> Self {
        Self {
            output: None,
            finished: false,
            waker: None,
        }
    }

    /// Stores the task's output and returns the joiner to wake.
    pub(crate) fn complete(&mut self, output: T) -> Option<Waker> {
        self.output = Some(output);
        self.finished = true;
        self.waker.take()
    }
}

/// A handle to a spawned task that can be awaited for its output.
///
/// # Example
///
/// ```
/// use franken_deferred::runtime::{self, LocalRuntime};
///
/// let rt = LocalRuntime::virtual_time();
/// let sum = rt
///     .block_on(async {
///         let handle = runtime::spawn(async { 40 + 2 });
///         handle.await
///     })
///     .unwrap();
/// assert_eq!(sum, 42);
/// ```
#[derive(Debug)]
#[must_use = "dropping a JoinHandle detaches the task"]
pub struct JoinHandle<T> {
    task_id: TaskId,
    state: Rc<RefCell<JoinState<T>>>,
}

impl<T> JoinHandle<T> {
    pub(crate) const fn new(task_id: TaskId, state: Rc<RefCell<JoinState<T>>>) -> Self {
        Self { task_id, state }
    }

    /// Returns the id of the spawned task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns true once the task has produced its output.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.borrow().finished
    }

    /// Detaches the task explicitly.
    pub fn detach(self) {}
}

impl<T> Future for JoinHandle<T> {
    type Output = T;

    /// Resolves to the task's output.
    ///
    /// # Panics
    ///
    /// Panics if polled again after it already returned the output.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let mut state = self.state.borrow_mut();
        if let Some(output) = state.output.take() {
            return Poll::Ready(output);
        }
        assert!(!state.finished, "JoinHandle polled after completion");
        match &mut state.waker {
            Some(waker) if waker.will_wake(cx.waker()) => {}
            slot => *slot = Some(cx.waker().clone()),
        }
        Poll::Pending
    }
}
