//! Asynchronous state probe.

use super::{Deferred, Settled};
use crate::types::SettlementState;
use futures_lite::future::poll_once;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Future returned by [`promise_state`].
///
/// Resolves on its first poll.
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct StateProbe<T, E> {
    observer: Settled<T, E>,
}

impl<T: Clone, E: Clone> Future for StateProbe<T, E> {
    type Output = SettlementState;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<SettlementState> {
        // A single poll of the target races it against an always-ready
        // sentinel: pending means the sentinel won.
        match Pin::new(&mut poll_once(&mut self.observer)).poll(cx) {
            Poll::Ready(Some(outcome)) => Poll::Ready(SettlementState::of(&outcome)),
            Poll::Ready(None) | Poll::Pending => Poll::Ready(SettlementState::Pending),
        }
    }
}

/// Reports whether `target` is pending, fulfilled or rejected.
///
/// The target is never modified and its work is never re-triggered.
///
/// ```
/// use franken_deferred::deferred::{Deferred, promise_state};
/// use franken_deferred::runtime::LocalRuntime;
/// use franken_deferred::types::SettlementState;
///
/// let rt = LocalRuntime::virtual_time();
/// let (value, completer) = Deferred::<u8, ()>::new();
/// rt.block_on(async {
///     assert_eq!(promise_state(&value).await, SettlementState::Pending);
///     completer.fulfill(1);
///     assert_eq!(promise_state(&value).await, SettlementState::Fulfilled);
/// })
/// .unwrap();
/// ```
pub fn promise_state<T: Clone, E: Clone>(target: &Deferred<T, E>) -> StateProbe<T, E> {
    StateProbe {
        observer: target.settled(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deferred::ValueSource;
    use crate::runtime::LocalRuntime;
    use crate::time::{delayed_reject, delayed_resolve, sleep};
    use std::time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn reports_each_state() {
        crate::test_utils::init_test_logging();
        crate::test_phase!("reports_each_state");
        let rt = LocalRuntime::virtual_time();
        let states = rt
            .block_on(async {
                let ok = delayed_resolve::<_, &str>(ms(10), ValueSource::value(1));
                let bad = delayed_reject::<u8, _>(ms(10), ValueSource::value("x"));
                let before = (promise_state(&ok).await, promise_state(&bad).await);
                sleep(ms(10)).await;
                let after = (promise_state(&ok).await, promise_state(&bad).await);
                (before, after)
            })
            .unwrap();
        assert_eq!(
            states,
            (
                (SettlementState::Pending, SettlementState::Pending),
                (SettlementState::Fulfilled, SettlementState::Rejected)
            )
        );
        crate::test_complete!("reports_each_state");
    }

    #[test]
    fn probe_does_not_leave_an_observer_behind() {
        let (value, completer) = Deferred::<u8, ()>::new();
        let rt = LocalRuntime::virtual_time();
        rt.block_on(async {
            assert_eq!(promise_state(&value).await, SettlementState::Pending);
        })
        .unwrap();
        assert_eq!(value.shared.lock().observers.len(), 0);
        assert!(completer.fulfill(2));
        assert_eq!(value.try_outcome(), Some(Ok(2)));
    }
}
