//! Timer heap for deadline management.
//!
//! A min-heap of `(deadline, timer)` pairs. Wakers live in a side table keyed
//! by timer id so a [`Sleep`](crate::time::Sleep) can refresh its waker or
//! cancel itself without touching the heap; cancelled entries are dropped
//! lazily when they reach the top.

use crate::types::Time;
use hashbrown::HashMap;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::task::Waker;

/// Handle to a registered timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone, Eq, PartialEq)]
struct TimerEntry {
    deadline: Time,
    id: TimerId,
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (earliest deadline first, then
        // registration order).
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.id.0.cmp(&self.id.0))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A min-heap of timers ordered by deadline.
#[derive(Debug, Default)]
pub struct TimerHeap {
    heap: BinaryHeap<TimerEntry>,
    wakers: HashMap<TimerId, Waker>,
    next_id: u64,
}

impl TimerHeap {
    /// Creates a new empty timer heap.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live (not cancelled) timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.wakers.len()
    }

    /// Returns true if no live timer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.wakers.is_empty()
    }

    /// Registers a waker to be woken at `deadline`.
    pub fn insert(&mut self, deadline: Time, waker: Waker) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.heap.push(TimerEntry { deadline, id });
        self.wakers.insert(id, waker);
        id
    }

    /// Replaces the waker of a live timer. Returns false if it already fired.
    pub fn update_waker(&mut self, id: TimerId, waker: &Waker) -> bool {
        match self.wakers.get_mut(&id) {
            Some(current) => {
                if !current.will_wake(waker) {
                    current.clone_from(waker);
                }
                true
            }
            None => false,
        }
    }

    /// Cancels a timer. Firing it later becomes a no-op.
    pub fn cancel(&mut self, id: TimerId) {
        self.wakers.remove(&id);
    }

    /// Returns the earliest live deadline, if any.
    pub fn peek_deadline(&mut self) -> Option<Time> {
        while let Some(entry) = self.heap.peek() {
            if self.wakers.contains_key(&entry.id) {
                return Some(entry.deadline);
            }
            self.heap.pop();
        }
        None
    }

    /// Pops the wakers of all live timers whose deadline is `<= now`.
    pub fn pop_expired(&mut self, now: Time) -> Vec<Waker> {
        let mut expired = Vec::new();
        while let Some(entry) = self.heap.peek() {
            if entry.deadline > now {
                break;
            }
            let id = entry.id;
            self.heap.pop();
            if let Some(waker) = self.wakers.remove(&id) {
                expired.push(waker);
            }
        }
        expired
    }

    /// Clears all timers.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.wakers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::task::Wake;

    #[derive(Default)]
    struct WakeCounter {
        wakes: AtomicUsize,
    }

    impl Wake for WakeCounter {
        fn wake(self: Arc<Self>) {
            self.wakes.fetch_add(1, AtomicOrdering::Relaxed);
        }
    }

    fn counting_waker() -> (Arc<WakeCounter>, Waker) {
        let counter = Arc::new(WakeCounter::default());
        let waker = Waker::from(Arc::clone(&counter));
        (counter, waker)
    }

    #[test]
    fn empty_heap_has_no_deadline() {
        let mut heap = TimerHeap::new();
        assert!(heap.is_empty());
        assert_eq!(heap.peek_deadline(), None);
    }

    #[test]
    fn insert_orders_by_deadline() {
        let mut heap = TimerHeap::new();
        let (_, waker) = counting_waker();
        heap.insert(Time::from_millis(200), waker.clone());
        heap.insert(Time::from_millis(100), waker.clone());
        heap.insert(Time::from_millis(150), waker);

        assert_eq!(heap.peek_deadline(), Some(Time::from_millis(100)));
        assert_eq!(heap.len(), 3);
    }

    #[test]
    fn pop_expired_returns_all_due_timers() {
        let mut heap = TimerHeap::new();
        let (counter, waker) = counting_waker();
        heap.insert(Time::from_millis(100), waker.clone());
        heap.insert(Time::from_millis(200), waker.clone());
        heap.insert(Time::from_millis(50), waker);

        let expired = heap.pop_expired(Time::from_millis(125));
        assert_eq!(expired.len(), 2);
        for waker in expired {
            waker.wake();
        }
        assert_eq!(counter.wakes.load(AtomicOrdering::Relaxed), 2);
        assert_eq!(heap.peek_deadline(), Some(Time::from_millis(200)));
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut heap = TimerHeap::new();
        let (_, waker) = counting_waker();
        let early = heap.insert(Time::from_millis(10), waker.clone());
        heap.insert(Time::from_millis(20), waker);

        heap.cancel(early);
        assert_eq!(heap.len(), 1);
        assert_eq!(heap.peek_deadline(), Some(Time::from_millis(20)));
        assert!(!heap.update_waker(early, &counting_waker().1));
        assert_eq!(heap.pop_expired(Time::from_millis(15)).len(), 0);
    }
}
