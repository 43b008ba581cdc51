//! Deferred values that settle after a fixed delay.
//!
//! Each call arms exactly one timer, which is never cancelled. The payload
//! source is only resolved once the timer fires.

use crate::deferred::{Deferred, ValueSource};
use crate::time::sleep;
use crate::tracing_compat::trace;
use std::time::Duration;

/// Returns a value that fulfils after `delay` with whatever `source`
/// resolves to.
///
/// A nested deferred source is adopted as-is: if it rejects, so does the
/// result.
///
/// # Panics
///
/// Panics outside a runtime.
///
/// ```
/// use franken_deferred::deferred::ValueSource;
/// use franken_deferred::runtime::{self, LocalRuntime};
/// use franken_deferred::time::delayed_resolve;
/// use std::time::Duration;
///
/// let rt = LocalRuntime::virtual_time();
/// let (out, at) = rt
///     .block_on(async {
///         let v = delayed_resolve::<_, ()>(Duration::from_millis(50), ValueSource::value("x"));
///         (v.await, runtime::now().as_millis())
///     })
///     .unwrap();
/// assert_eq!((out, at), (Ok("x"), 50));
/// ```
pub fn delayed_resolve<T, E>(delay: Duration, source: ValueSource<T, E>) -> Deferred<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    let timer = sleep(delay);
    Deferred::spawn(async move {
        timer.await;
        trace!(delay_ms = delay.as_millis(), "delayed resolve fired");
        source.resolve().await
    })
}

/// Returns a value that rejects after `delay` with whatever `reason`
/// resolves to.
///
/// A nested deferred reason is unwrapped; its payload becomes the failure
/// whether it fulfilled or rejected.
///
/// # Panics
///
/// Panics outside a runtime.
pub fn delayed_reject<T, E>(delay: Duration, reason: ValueSource<E, E>) -> Deferred<T, E>
where
    T: 'static,
    E: Clone + 'static,
{
    let timer = sleep(delay);
    Deferred::spawn(async move {
        timer.await;
        trace!(delay_ms = delay.as_millis(), "delayed reject fired");
        match reason.resolve().await {
            Ok(error) | Err(error) => Err(error),
        }
    })
}

/// Returns a value that fulfils with `()` after `duration`.
///
/// # Panics
///
/// Panics outside a runtime.
pub fn delay<E: 'static>(duration: Duration) -> Deferred<(), E> {
    let timer = sleep(duration);
    Deferred::spawn(async move {
        timer.await;
        Ok(())
    })
}
