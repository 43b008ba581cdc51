//! Sleep future for delaying execution.
//!
//! A [`Sleep`] created inside a runtime registers its timer right away, so
//! timers with equal deadlines fire in the order they were created. The
//! first poll swaps in the real waker. A `Sleep` created outside a runtime
//! registers on its first poll instead. Dropping a pending `Sleep` cancels
//! its timer.

use crate::runtime::{Core, TimerId, context};
use crate::types::Time;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
enum Deadline {
    At(Time),
    /// Created outside a runtime; anchored at the first poll.
    After(Duration),
}

/// A future that completes once the runtime clock reaches a deadline.
///
/// # Panics
///
/// Polling a `Sleep` outside [`LocalRuntime::block_on`](crate::runtime::LocalRuntime::block_on)
/// panics.
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct Sleep {
    deadline: Deadline,
    registration: Option<(Weak<Core>, TimerId)>,
}

impl Sleep {
    /// Creates a sleep that completes at `deadline`.
    pub fn until(deadline: Time) -> Self {
        let mut sleep = Self {
            deadline: Deadline::At(deadline),
            registration: None,
        };
        if let Some(core) = context::current() {
            sleep.register(&core, deadline, Waker::noop());
        }
        sleep
    }

    /// Returns the deadline, or `None` if it is not anchored yet.
    #[must_use]
    pub const fn deadline(&self) -> Option<Time> {
        match self.deadline {
            Deadline::At(time) => Some(time),
            Deadline::After(_) => None,
        }
    }

    fn register(&mut self, core: &Rc<Core>, deadline: Time, waker: &Waker) {
        let id = core.register_timer(deadline, waker);
        self.registration = Some((Rc::downgrade(core), id));
    }

    fn unregister(&mut self) {
        if let Some((core, id)) = self.registration.take() {
            if let Some(core) = core.upgrade() {
                core.cancel_timer(id);
            }
        }
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let Some(core) = context::current() else {
            panic!("Sleep polled outside of a runtime");
        };
        let now = core.now();
        let deadline = match self.deadline {
            Deadline::At(time) => time,
            Deadline::After(duration) => {
                let time = now + duration;
                self.deadline = Deadline::At(time);
                time
            }
        };
        if now >= deadline {
            self.unregister();
            return Poll::Ready(());
        }

        let refreshed = match &self.registration {
            Some((owner, id)) => {
                std::ptr::eq(owner.as_ptr(), Rc::as_ptr(&core))
                    && core.refresh_timer(*id, cx.waker())
            }
            None => false,
        };
        if !refreshed {
            self.unregister();
            self.register(&core, deadline, cx.waker());
        }
        Poll::Pending
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        self.unregister();
    }
}

/// Sleeps for `duration` on the current runtime.
///
/// The deadline is taken from the runtime clock at the call, or at the first
/// poll when called outside a runtime.
pub fn sleep(duration: Duration) -> Sleep {
    match crate::runtime::try_now() {
        Some(now) => Sleep::until(now + duration),
        None => Sleep {
            deadline: Deadline::After(duration),
            registration: None,
        },
    }
}

/// Sleeps until the runtime clock reaches `deadline`.
pub fn sleep_until(deadline: Time) -> Sleep {
    Sleep::until(deadline)
}
