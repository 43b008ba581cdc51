//! Time sources for the runtime.
//!
//! The runtime reads the current [`Time`] from a [`TimeSource`]. Production
//! runtimes use [`WallClock`]; tests use [`VirtualClock`], which only moves
//! when the runtime is idle and then jumps straight to the next deadline.

use crate::types::Time;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

#[inline]
fn duration_to_nanos_saturating(duration: Duration) -> u64 {
    duration.as_nanos().min(u128::from(u64::MAX)) as u64
}

/// Time source abstraction for getting the current time.
pub trait TimeSource: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> Time;
}

/// Wall clock time source for production use.
///
/// The epoch is the instant this source was created.
#[derive(Debug)]
pub struct WallClock {
    epoch: std::time::Instant,
}

impl WallClock {
    /// Creates a new wall clock time source.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: std::time::Instant::now(),
        }
    }

    /// Returns how long the caller must wait from now until `deadline`.
    #[must_use]
    pub fn until(&self, deadline: Time) -> Duration {
        deadline.elapsed_since(self.now())
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for WallClock {
    fn now(&self) -> Time {
        Time::from_nanos(duration_to_nanos_saturating(self.epoch.elapsed()))
    }
}

/// Virtual time source for deterministic tests.
///
/// ```
/// use franken_deferred::time::{TimeSource, VirtualClock};
/// use franken_deferred::types::Time;
///
/// let clock = VirtualClock::new();
/// clock.advance_to(Time::from_millis(50));
/// assert_eq!(clock.now(), Time::from_millis(50));
/// ```
#[derive(Debug)]
pub struct VirtualClock {
    now: AtomicU64,
    /// When true, `advance`/`advance_to` are no-ops.
    paused: AtomicBool,
}

impl VirtualClock {
    /// Creates a new virtual clock starting at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(Time::ZERO)
    }

    /// Creates a virtual clock starting at the given time.
    #[must_use]
    pub fn starting_at(time: Time) -> Self {
        Self {
            now: AtomicU64::new(time.as_nanos()),
            paused: AtomicBool::new(false),
        }
    }

    /// Advances time by the given duration.
    ///
    /// No-op when the clock is paused.
    pub fn advance(&self, by: Duration) {
        if !self.paused.load(Ordering::Acquire) {
            self.now
                .fetch_add(duration_to_nanos_saturating(by), Ordering::AcqRel);
        }
    }

    /// Advances time to the given absolute time.
    ///
    /// If the target time is in the past, or the clock is paused, this is a no-op.
    pub fn advance_to(&self, time: Time) {
        if self.paused.load(Ordering::Acquire) {
            return;
        }
        self.now.fetch_max(time.as_nanos(), Ordering::AcqRel);
    }

    /// Freezes the clock; the runtime reports a stall instead of jumping ahead.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resumes a paused clock from where it stopped.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }

    /// Returns true if the clock is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for VirtualClock {
    fn now(&self) -> Time {
        Time::from_nanos(self.now.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_clock_only_moves_forward() {
        let clock = VirtualClock::starting_at(Time::from_millis(100));
        clock.advance_to(Time::from_millis(40));
        assert_eq!(clock.now(), Time::from_millis(100));

        clock.advance(Duration::from_millis(25));
        assert_eq!(clock.now(), Time::from_millis(125));

        clock.advance_to(Time::from_millis(300));
        assert_eq!(clock.now(), Time::from_millis(300));
    }

    #[test]
    fn paused_virtual_clock_ignores_advances() {
        let clock = VirtualClock::new();
        clock.pause();
        assert!(clock.is_paused());
        clock.advance(Duration::from_secs(1));
        clock.advance_to(Time::from_secs(5));
        assert_eq!(clock.now(), Time::ZERO);

        clock.resume();
        clock.advance(Duration::from_millis(7));
        assert_eq!(clock.now(), Time::from_millis(7));
    }

    #[test]
    fn wall_clock_is_monotonic() {
        let clock = WallClock::new();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
        assert_eq!(clock.until(Time::ZERO), Duration::ZERO);
    }
}
