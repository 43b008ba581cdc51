//! Waker implementation with deduplication.
//!
//! Every task owns one [`TaskWaker`]. Waking pushes the task id onto the
//! shared [`ReadyQueue`] at most once per poll: the `scheduled` flag is set
//! on wake and cleared by the executor right before it polls the task. The
//! root future of `block_on` is queued as [`Ready::Root`] under its own flag,
//! so it runs in wake order with the tasks.
//!
//! Wakers are `Send + Sync`, so a deferred value settled on another thread
//! wakes the runtime thread, which is unparked if it is idle.

use crate::types::TaskId;
use crossbeam_queue::SegQueue;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Wake, Waker};
use std::thread::Thread;

/// An entry in the ready queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ready {
    Task(TaskId),
    Root,
}

/// FIFO queue of tasks that were woken since their last poll.
#[derive(Debug, Default)]
pub(crate) struct ReadyQueue {
    entries: SegQueue<Ready>,
    root_woken: AtomicBool,
    parked: Mutex<Option<Thread>>,
}

impl ReadyQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records the thread to unpark on wake.
    pub(crate) fn bind_current_thread(&self) {
        *self.parked.lock() = Some(std::thread::current());
    }

    pub(crate) fn push(&self, task: TaskId) {
        self.entries.push(Ready::Task(task));
        self.unpark();
    }

    pub(crate) fn pop(&self) -> Option<Ready> {
        self.entries.pop()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Queues the root future unless it is already queued.
    pub(crate) fn wake_root(&self) {
        if !self.root_woken.swap(true, Ordering::AcqRel) {
            self.entries.push(Ready::Root);
        }
        self.unpark();
    }

    /// Clears the root wake flag once its entry is popped.
    pub(crate) fn take_root_wake(&self) -> bool {
        self.root_woken.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn has_work(&self) -> bool {
        !self.entries.is_empty()
    }

    fn unpark(&self) {
        if let Some(thread) = self.parked.lock().as_ref() {
            thread.unpark();
        }
    }
}

/// A waker for a specific task.
#[derive(Debug)]
pub(crate) struct TaskWaker {
    task: TaskId,
    queue: Arc<ReadyQueue>,
    scheduled: AtomicBool,
}

impl TaskWaker {
    pub(crate) fn new(task: TaskId, queue: Arc<ReadyQueue>) -> Self {
        Self {
            task,
            queue,
            scheduled: AtomicBool::new(false),
        }
    }

    /// Allows the next wake to enqueue the task again.
    pub(crate) fn clear_scheduled(&self) {
        self.scheduled.store(false, Ordering::Release);
    }

    pub(crate) fn schedule(&self) {
        if !self.scheduled.swap(true, Ordering::AcqRel) {
            self.queue.push(self.task);
        }
    }
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.schedule();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.schedule();
    }
}

/// Waker handed to the root future of `block_on`.
#[derive(Debug)]
pub(crate) struct RootWaker {
    queue: Arc<ReadyQueue>,
}

impl RootWaker {
    pub(crate) fn waker(queue: Arc<ReadyQueue>) -> Waker {
        Waker::from(Arc::new(Self { queue }))
    }
}

impl Wake for RootWaker {
    fn wake(self: Arc<Self>) {
        self.queue.wake_root();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.queue.wake_root();
    }
}
