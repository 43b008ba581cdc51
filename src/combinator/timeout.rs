//! Timeout wrappers that race an operation against a timer.
//!
//! The operation is never cancelled: if the timer wins, the operation keeps
//! running and its eventual outcome is ignored. The fallback is produced only
//! when the timer wins, which is checked by probing the operation's state at
//! the moment the timer fires.

use crate::combinator::select::{Either, select};
use crate::deferred::{Deferred, ValueSource, promise_state};
use crate::time::sleep;
use crate::tracing_compat::debug;
use crate::types::SettlementState;
use std::future::Future;
use std::time::Duration;

/// Something that yields the deferred value to guard with a timeout.
///
/// Implemented for [`Deferred`] itself and for zero-argument closures that
/// return one; a closure is called immediately and exactly once.
pub trait IntoDeferred<T, E> {
    /// Produces the deferred value.
    fn into_deferred(self) -> Deferred<T, E>;
}

impl<T, E> IntoDeferred<T, E> for Deferred<T, E> {
    fn into_deferred(self) -> Deferred<T, E> {
        self
    }
}

impl<T, E, F> IntoDeferred<T, E> for F
where
    F: FnOnce() -> Deferred<T, E>,
{
    fn into_deferred(self) -> Deferred<T, E> {
        self()
    }
}

/// Mirrors `operation`, or fulfils with `fallback` if `delay` elapses first.
///
/// A supplier fallback runs at most once and only when the timer wins. A
/// deferred fallback is adopted as-is.
///
/// # Panics
///
/// Panics outside a runtime.
///
/// ```
/// use franken_deferred::combinator::timeout_resolve;
/// use franken_deferred::deferred::ValueSource;
/// use franken_deferred::runtime::LocalRuntime;
/// use franken_deferred::time::delayed_resolve;
/// use std::time::Duration;
///
/// let rt = LocalRuntime::virtual_time();
/// let out = rt
///     .block_on(async {
///         let slow = delayed_resolve::<_, ()>(Duration::from_secs(5), ValueSource::value("late"));
///         timeout_resolve(slow, Duration::from_millis(100), ValueSource::value("fallback")).await
///     })
///     .unwrap();
/// assert_eq!(out, Ok("fallback"));
/// ```
pub fn timeout_resolve<T, E, O>(
    operation: O,
    delay: Duration,
    fallback: ValueSource<T, E>,
) -> Deferred<T, E>
where
    O: IntoDeferred<T, E>,
    T: Clone + 'static,
    E: Clone + 'static,
{
    race_timer(operation.into_deferred(), delay, move || fallback.resolve())
}

/// Mirrors `operation`, or rejects with `reason` if `delay` elapses first.
///
/// A nested deferred reason is unwrapped; its payload becomes the failure
/// whether it fulfilled or rejected.
///
/// # Panics
///
/// Panics outside a runtime.
pub fn timeout_reject<T, E, O>(
    operation: O,
    delay: Duration,
    reason: ValueSource<E, E>,
) -> Deferred<T, E>
where
    O: IntoDeferred<T, E>,
    T: Clone + 'static,
    E: Clone + 'static,
{
    race_timer(operation.into_deferred(), delay, move || async move {
        match reason.resolve().await {
            Ok(error) | Err(error) => Err(error),
        }
    })
}

fn race_timer<T, E, F, Fut>(
    operation: Deferred<T, E>,
    delay: Duration,
    on_timeout: F,
) -> Deferred<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
    F: FnOnce() -> Fut + 'static,
    Fut: Future<Output = Result<T, E>> + 'static,
{
    let probe = operation.clone();
    let timer = sleep(delay);
    let timer_branch = async move {
        timer.await;
        match promise_state(&probe).await {
            SettlementState::Pending => Some(on_timeout().await),
            SettlementState::Fulfilled | SettlementState::Rejected => None,
        }
    };
    Deferred::spawn(async move {
        match select(operation.settled(), timer_branch).await {
            Either::Left(outcome) => outcome,
            Either::Right(Some(fallback)) => {
                debug!(delay_ms = delay.as_millis(), "operation timed out");
                fallback
            }
            // The operation settled while the timer was firing.
            Either::Right(None) => operation.await,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{self, LocalRuntime};
    use crate::time::{delayed_reject, delayed_resolve};
    use std::cell::Cell;
    use std::rc::Rc;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn fast_operation_wins_unchanged() {
        crate::test_utils::init_test_logging();
        crate::test_phase!("fast_operation_wins_unchanged");
        let rt = LocalRuntime::virtual_time();
        let out = rt
            .block_on(async {
                let op = delayed_resolve::<_, &str>(ms(10), ValueSource::value(1));
                let outcome = timeout_resolve(op, ms(100), ValueSource::value(0)).await;
                (outcome, runtime::now().as_millis())
            })
            .unwrap();
        assert_eq!(out, (Ok(1), 10));
        crate::test_complete!("fast_operation_wins_unchanged");
    }

    #[test]
    fn fast_failure_is_mirrored() {
        let rt = LocalRuntime::virtual_time();
        let out = rt
            .block_on(async {
                let op = delayed_reject::<u8, _>(ms(10), ValueSource::value("op failed"));
                timeout_reject(op, ms(100), ValueSource::value("timed out")).await
            })
            .unwrap();
        assert_eq!(out, Err("op failed"));
    }

    #[test]
    fn slow_operation_gets_fallback_at_the_delay() {
        let rt = LocalRuntime::virtual_time();
        let out = rt
            .block_on(async {
                let op = delayed_resolve::<_, ()>(ms(500), ValueSource::value("late"));
                let outcome = timeout_resolve(op, ms(100), ValueSource::value("fallback")).await;
                (outcome, runtime::now().as_millis())
            })
            .unwrap();
        assert_eq!(out, (Ok("fallback"), 100));
    }

    #[test]
    fn timeout_reject_uses_reason() {
        let rt = LocalRuntime::virtual_time();
        let out = rt
            .block_on(async {
                let op = || delayed_resolve::<u8, _>(ms(500), ValueSource::value(1));
                timeout_reject(op, ms(50), ValueSource::value("too slow")).await
            })
            .unwrap();
        assert_eq!(out, Err("too slow"));
    }

    #[test]
    fn fallback_supplier_only_runs_when_timer_wins() {
        let rt = LocalRuntime::virtual_time();
        let calls = Rc::new(Cell::new(0));
        let counted = |calls: &Rc<Cell<u32>>| {
            let calls = Rc::clone(calls);
            ValueSource::<u8, ()>::lazy(move || {
                calls.set(calls.get() + 1);
                99
            })
        };
        let (fast, slow) = rt
            .block_on({
                let fast_fallback = counted(&calls);
                let slow_fallback = counted(&calls);
                async move {
                    let fast = timeout_resolve(
                        delayed_resolve(ms(5), ValueSource::value(1)),
                        ms(20),
                        fast_fallback,
                    );
                    let slow = timeout_resolve(
                        delayed_resolve(ms(40), ValueSource::value(2)),
                        ms(20),
                        slow_fallback,
                    );
                    (fast.await, slow.await)
                }
            })
            .unwrap();
        assert_eq!((fast, slow), (Ok(1), Ok(99)));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn tie_goes_to_the_operation() {
        let rt = LocalRuntime::virtual_time();
        let calls = Rc::new(Cell::new(0));
        let out = rt
            .block_on({
                let calls = Rc::clone(&calls);
                async move {
                    let op = delayed_resolve::<_, ()>(ms(30), ValueSource::value("op"));
                    timeout_resolve(
                        op,
                        ms(30),
                        ValueSource::lazy(move || {
                            calls.set(calls.get() + 1);
                            "fallback"
                        }),
                    )
                    .await
                }
            })
            .unwrap();
        assert_eq!(out, Ok("op"));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn operation_keeps_running_after_timeout() {
        let rt = LocalRuntime::virtual_time();
        let op = rt
            .block_on(async {
                let op = delayed_resolve::<_, ()>(ms(80), ValueSource::value("done"));
                let out = timeout_resolve(op.clone(), ms(10), ValueSource::value("fallback")).await;
                assert_eq!(out, Ok("fallback"));
                op
            })
            .unwrap();
        assert_eq!(op.state(), SettlementState::Pending);
        rt.run_until_idle().unwrap();
        assert_eq!(op.try_outcome(), Some(Ok("done")));
    }
}
