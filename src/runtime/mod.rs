//! Single-threaded cooperative runtime.
//!
//! [`LocalRuntime`] drives one root future plus any number of spawned tasks
//! on the calling thread. It owns:
//!
//! - a slab of type-erased task futures, polled FIFO from a ready queue
//! - a timer heap consulted whenever no task is runnable
//! - a clock: [`VirtualClock`] for deterministic tests, [`WallClock`] for
//!   production
//!
//! With a virtual clock the runtime never sleeps. When every task is blocked
//! it jumps the clock to the earliest deadline, so a test that waits five
//! simulated minutes finishes instantly and timing assertions are exact.
//!
//! # Example
//!
//! ```
//! use franken_deferred::runtime::{self, LocalRuntime};
//! use franken_deferred::time::sleep;
//! use std::time::Duration;
//!
//! let rt = LocalRuntime::virtual_time();
//! let elapsed = rt
//!     .block_on(async {
//!         let start = runtime::now();
//!         sleep(Duration::from_millis(250)).await;
//!         runtime::now().elapsed_since(start)
//!     })
//!     .unwrap();
//! assert_eq!(elapsed, Duration::from_millis(250));
//! ```

mod builder;
pub mod config;
pub(crate) mod context;
pub mod env_config;
mod stored_task;
mod task_handle;
pub mod timer;
mod waker;
mod yield_now;

pub use builder::RuntimeBuilder;
pub use config::{RuntimeConfig, TimeMode};
pub use task_handle::JoinHandle;
pub use timer::{TimerHeap, TimerId};
pub use yield_now::{YieldNow, yield_now};

use crate::error::{Error, Result};
use crate::time::{TimeSource, VirtualClock, WallClock};
use crate::tracing_compat::{debug, trace};
use crate::types::{TaskId, Time};
use slab::Slab;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use stored_task::{StoredTask, poll_detached};
use task_handle::JoinState;
use waker::{Ready, ReadyQueue, RootWaker, TaskWaker};

#[derive(Debug)]
enum Clock {
    Virtual(VirtualClock),
    Wall(WallClock),
}

impl Clock {
    fn now(&self) -> Time {
        match self {
            Self::Virtual(clock) => clock.now(),
            Self::Wall(clock) => clock.now(),
        }
    }
}

/// State shared by a runtime and the tasks it drives.
#[derive(Debug)]
pub(crate) struct Core {
    tasks: RefCell<Slab<StoredTask>>,
    queue: Arc<ReadyQueue>,
    timers: RefCell<TimerHeap>,
    clock: Clock,
    config: RuntimeConfig,
    next_generation: Cell<u64>,
    steps: Cell<u64>,
}

impl Core {
    fn new(config: RuntimeConfig) -> Self {
        let clock = match config.time_mode {
            TimeMode::Virtual => Clock::Virtual(VirtualClock::starting_at(config.start_time)),
            TimeMode::Wall => Clock::Wall(WallClock::new()),
        };
        Self {
            tasks: RefCell::new(Slab::new()),
            queue: Arc::new(ReadyQueue::new()),
            timers: RefCell::new(TimerHeap::new()),
            clock,
            config,
            next_generation: Cell::new(0),
            steps: Cell::new(0),
        }
    }

    pub(crate) fn now(&self) -> Time {
        self.clock.now()
    }

    pub(crate) fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        let state = Rc::new(RefCell::new(JoinState::new()));
        let sink = Rc::clone(&state);
        let id = self.insert_task(async move {
            let output = future.await;
            let joiner = sink.borrow_mut().complete(output);
            if let Some(waker) = joiner {
                waker.wake();
            }
        });
        JoinHandle::new(id, state)
    }

    fn insert_task<F>(&self, future: F) -> TaskId
    where
        F: Future<Output = ()> + 'static,
    {
        let generation = self.next_generation.get();
        self.next_generation.set(generation.wrapping_add(1));

        let (id, waker) = {
            let mut tasks = self.tasks.borrow_mut();
            let entry = tasks.vacant_entry();
            let id = TaskId::new(entry.key(), generation);
            let waker = Arc::new(TaskWaker::new(id, Arc::clone(&self.queue)));
            entry.insert(StoredTask::new(id, future, Arc::clone(&waker)));
            (id, waker)
        };
        waker.schedule();
        trace!(task = %id, "spawned task");
        id
    }

    pub(crate) fn register_timer(&self, deadline: Time, waker: &Waker) -> TimerId {
        self.timers.borrow_mut().insert(deadline, waker.clone())
    }

    pub(crate) fn refresh_timer(&self, id: TimerId, waker: &Waker) -> bool {
        self.timers.borrow_mut().update_waker(id, waker)
    }

    pub(crate) fn cancel_timer(&self, id: TimerId) {
        self.timers.borrow_mut().cancel(id);
    }

    fn live_tasks(&self) -> usize {
        self.tasks.borrow().len()
    }

    fn count_step(&self) -> Result<()> {
        let steps = self.steps.get() + 1;
        self.steps.set(steps);
        match self.config.max_steps {
            Some(limit) if steps > limit => {
                debug!(limit, "step limit exceeded");
                Err(Error::StepLimitExceeded { limit })
            }
            _ => Ok(()),
        }
    }

    fn poll_task(&self, id: TaskId) -> Result<()> {
        self.count_step()?;
        let taken = {
            let mut tasks = self.tasks.borrow_mut();
            match tasks.get_mut(id.index()) {
                Some(slot) if slot.id() == id => slot
                    .take_future()
                    .map(|future| (future, Arc::clone(slot.waker()))),
                _ => None,
            }
        };
        // Stale wake for a finished task whose slot was reused.
        let Some((mut future, waker)) = taken else {
            return Ok(());
        };

        match poll_detached(&mut future, &waker) {
            Poll::Ready(()) => {
                let finished = self.tasks.borrow_mut().try_remove(id.index());
                drop(finished);
                drop(future);
                trace!(task = %id, "task completed");
            }
            Poll::Pending => {
                if let Some(slot) = self.tasks.borrow_mut().get_mut(id.index()) {
                    slot.restore_future(future);
                }
            }
        }
        Ok(())
    }

    /// Polls every entry that was ready when the batch started, in wake
    /// order.
    ///
    /// `root` polls the root future and returns true once it has completed,
    /// which ends the batch.
    fn run_ready(&self, mut root: impl FnMut() -> Result<bool>) -> Result<usize> {
        let budget = self.queue.len();
        let mut polled = 0;
        while polled < budget {
            let Some(entry) = self.queue.pop() else { break };
            polled += 1;
            match entry {
                Ready::Task(id) => self.poll_task(id)?,
                Ready::Root => {
                    self.queue.take_root_wake();
                    if root()? {
                        break;
                    }
                }
            }
        }
        Ok(polled)
    }

    fn fire_due_timers(&self) -> usize {
        let now = self.now();
        let expired = self.timers.borrow_mut().pop_expired(now);
        let fired = expired.len();
        for waker in expired {
            waker.wake();
        }
        fired
    }

    /// Blocks until the next timer is due or a wake arrives.
    ///
    /// Returns false when no event can ever arrive.
    fn wait_for_event(&self, park_without_timers: bool) -> bool {
        let next = self.timers.borrow_mut().peek_deadline();
        match (&self.clock, next) {
            (Clock::Virtual(clock), Some(deadline)) if !clock.is_paused() => {
                trace!(to = %deadline, "advancing virtual clock");
                clock.advance_to(deadline);
                true
            }
            (Clock::Virtual(_), _) => false,
            (Clock::Wall(clock), Some(deadline)) => {
                std::thread::park_timeout(clock.until(deadline));
                true
            }
            (Clock::Wall(_), None) if park_without_timers => {
                std::thread::park();
                true
            }
            (Clock::Wall(_), None) => false,
        }
    }

    fn drop_all_tasks(&self) {
        let tasks = std::mem::take(&mut *self.tasks.borrow_mut());
        drop(tasks);
        self.timers.borrow_mut().clear();
    }
}

/// A single-threaded runtime.
///
/// Dropping the runtime drops every task that has not finished.
#[derive(Debug)]
pub struct LocalRuntime {
    core: Rc<Core>,
}

impl LocalRuntime {
    /// Creates a runtime from a resolved configuration.
    #[must_use]
    pub fn with_config(config: RuntimeConfig) -> Self {
        debug!(
            time_mode = %config.time_mode,
            max_steps = ?config.max_steps,
            "runtime created"
        );
        Self {
            core: Rc::new(Core::new(config)),
        }
    }

    /// Creates a runtime driven by the wall clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::wall_clock())
    }

    /// Creates a runtime driven by a virtual clock starting at zero.
    #[must_use]
    pub fn virtual_time() -> Self {
        Self::with_config(RuntimeConfig::virtual_time())
    }

    /// Returns a builder for a customised runtime.
    #[must_use]
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Returns the configuration this runtime was built with.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.core.config
    }

    /// Returns the runtime's current time.
    #[must_use]
    pub fn now(&self) -> Time {
        self.core.now()
    }

    /// Returns the virtual clock, or `None` in wall-clock mode.
    #[must_use]
    pub fn virtual_clock(&self) -> Option<&VirtualClock> {
        match &self.core.clock {
            Clock::Virtual(clock) => Some(clock),
            Clock::Wall(_) => None,
        }
    }

    /// Returns the number of spawned tasks that have not finished.
    #[must_use]
    pub fn live_tasks(&self) -> usize {
        self.core.live_tasks()
    }

    /// Spawns a task. It starts running at the next `block_on` or
    /// [`run_until_idle`](Self::run_until_idle).
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        self.core.spawn(future)
    }

    /// Runs `future` to completion, driving every spawned task meanwhile.
    ///
    /// Tasks still alive when the root future completes stay in the runtime
    /// and resume on the next call.
    ///
    /// # Errors
    ///
    /// - [`Error::NestedRuntime`] if called from inside another `block_on`.
    /// - [`Error::Stalled`] if, under a virtual clock, the root future is
    ///   pending while no task is runnable and no timer is armed.
    /// - [`Error::StepLimitExceeded`] if the configured poll limit runs out.
    pub fn block_on<F: Future>(&self, future: F) -> Result<F::Output> {
        let _guard = context::enter(Rc::clone(&self.core))?;
        let core = &self.core;
        core.steps.set(0);
        core.queue.bind_current_thread();

        let waker = RootWaker::waker(Arc::clone(&core.queue));
        let mut cx = Context::from_waker(&waker);
        let mut future = pin!(future);
        core.queue.wake_root();

        let mut output = None;
        loop {
            let polled = core.run_ready(|| {
                core.count_step()?;
                match future.as_mut().poll(&mut cx) {
                    Poll::Ready(value) => {
                        output = Some(value);
                        Ok(true)
                    }
                    Poll::Pending => Ok(false),
                }
            })?;
            if let Some(output) = output.take() {
                return Ok(output);
            }
            if polled > 0 || core.fire_due_timers() > 0 || core.queue.has_work() {
                continue;
            }
            if !core.wait_for_event(true) {
                let at = core.now();
                let live_tasks = core.live_tasks();
                debug!(at = %at, live_tasks, "runtime stalled");
                return Err(Error::Stalled { at, live_tasks });
            }
        }
    }

    /// Runs spawned tasks until none is runnable and no timer is armed.
    ///
    /// Tasks blocked on something that can never happen are left in place.
    ///
    /// # Errors
    ///
    /// [`Error::NestedRuntime`] or [`Error::StepLimitExceeded`], as for
    /// [`block_on`](Self::block_on).
    pub fn run_until_idle(&self) -> Result<()> {
        let _guard = context::enter(Rc::clone(&self.core))?;
        let core = &self.core;
        core.steps.set(0);
        core.queue.bind_current_thread();
        loop {
            // A root entry left over from an earlier `block_on` is dropped.
            let polled = core.run_ready(|| Ok(false))?;
            if polled > 0 || core.fire_due_timers() > 0 || core.queue.has_work() {
                continue;
            }
            if !core.wait_for_event(false) {
                return Ok(());
            }
        }
    }
}

impl Default for LocalRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LocalRuntime {
    fn drop(&mut self) {
        self.core.drop_all_tasks();
    }
}

/// Spawns a task on the runtime driving this thread.
///
/// # Panics
///
/// Panics when called outside `block_on`; use [`try_spawn`] to get an error
/// instead.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + 'static,
    F::Output: 'static,
{
    match try_spawn(future) {
        Ok(handle) => handle,
        Err(err) => panic!("spawn: {err}"),
    }
}

/// Spawns a task on the runtime driving this thread.
///
/// # Errors
///
/// Returns [`Error::NoRuntime`] outside `block_on`.
pub fn try_spawn<F>(future: F) -> Result<JoinHandle<F::Output>>
where
    F: Future + 'static,
    F::Output: 'static,
{
    let core = context::current().ok_or(Error::NoRuntime)?;
    Ok(core.spawn(future))
}

/// Returns the current time of the runtime driving this thread.
///
/// # Panics
///
/// Panics when called outside `block_on`.
#[must_use]
pub fn now() -> Time {
    match try_now() {
        Some(now) => now,
        None => panic!("now: {}", Error::NoRuntime),
    }
}

/// Returns the current runtime time, or `None` outside `block_on`.
#[must_use]
pub fn try_now() -> Option<Time> {
    context::current().map(|core| core.now())
}

/// Returns true while a runtime drives this thread.
#[must_use]
pub fn is_active() -> bool {
    context::is_entered()
}
