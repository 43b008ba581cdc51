//! Retry engine with caller-supplied backoff.
//!
//! [`with_retry`] runs an operation, then decides whether and when to run it
//! again:
//!
//! 1. The outcome is captured, never propagated mid-loop.
//! 2. The [`RetryPredicate`] is asked first. `false` stops the loop.
//! 3. The [`Backoff`] is asked next. No delay stops the loop.
//! 4. Otherwise the engine sleeps for the delay and runs attempt `n + 1`,
//!    handing it the previous outcome.
//!
//! When the loop stops, the last outcome is returned as-is: a failure is the
//! operation's own error, never a wrapper.
//!
//! The loop itself is [`repeat_fold`], with each iteration's parameter being
//! the next attempt number and the previous outcome.
//!
//! # Example
//!
//! ```
//! use franken_deferred::combinator::{Backoff, RetryOnError, with_retry};
//! use franken_deferred::runtime::{self, LocalRuntime};
//! use std::time::Duration;
//!
//! let rt = LocalRuntime::virtual_time();
//! let (outcome, waited) = rt
//!     .block_on(async {
//!         let out = with_retry(
//!             |attempt, _previous| async move {
//!                 if attempt < 3 { Err(attempt) } else { Ok("done") }
//!             },
//!             Backoff::table_ms(&[100, 200, 300]),
//!             RetryOnError,
//!         )
//!         .await;
//!         (out, runtime::now().as_millis())
//!     })
//!     .unwrap();
//! assert_eq!(outcome, Ok("done"));
//! assert_eq!(waited, 300);
//! ```

use crate::combinator::repeat::repeat_fold;
use crate::deferred::Deferred;
use crate::time::sleep;
use crate::tracing_compat::{debug, trace};
use std::fmt;
use std::future::IntoFuture;
use std::time::Duration;

/// First 25 terms of the Fibonacci sequence, in milliseconds.
pub const FIBONACCI_MS: [u64; 25] = [
    1, 1, 2, 3, 5, 8, 13, 21, 34, 55, 89, 144, 233, 377, 610, 987, 1597, 2584, 4181, 6765, 10946,
    17711, 28657, 46368, 75025,
];

/// First 25 powers of two, in milliseconds.
pub const POWERS_OF_TWO_MS: [u64; 25] = [
    1, 2, 4, 8, 16, 32, 64, 128, 256, 512, 1024, 2048, 4096, 8192, 16384, 32768, 65536, 131_072,
    262_144, 524_288, 1_048_576, 2_097_152, 4_194_304, 8_388_608, 16_777_216,
];

type DelayPolicy<T, E> = Box<dyn FnMut(u32, &Result<T, E>) -> Option<Duration>>;

/// How long to wait before each retry.
pub enum Backoff<T, E> {
    /// `delays[attempt - 1]` before attempt `attempt + 1`; retries stop when
    /// the table runs out.
    Table(Vec<Duration>),
    /// Called with the attempt that just finished and its outcome. `None`
    /// stops retrying.
    Policy(DelayPolicy<T, E>),
}

impl<T, E> Backoff<T, E> {
    /// A table of delays.
    pub fn table(delays: impl IntoIterator<Item = Duration>) -> Self {
        Self::Table(delays.into_iter().collect())
    }

    /// A table of delays given in milliseconds.
    #[must_use]
    pub fn table_ms(delays_ms: &[u64]) -> Self {
        Self::table(delays_ms.iter().copied().map(Duration::from_millis))
    }

    /// A delay function.
    pub fn policy<F>(policy: F) -> Self
    where
        F: FnMut(u32, &Result<T, E>) -> Option<Duration> + 'static,
    {
        Self::Policy(Box::new(policy))
    }

    /// Up to 25 retries following [`FIBONACCI_MS`].
    #[must_use]
    pub fn fibonacci() -> Self {
        Self::table_ms(&FIBONACCI_MS)
    }

    /// Up to 25 retries following [`POWERS_OF_TWO_MS`].
    #[must_use]
    pub fn powers_of_two() -> Self {
        Self::table_ms(&POWERS_OF_TWO_MS)
    }

    /// `retries` retries, each after the same `delay`.
    #[must_use]
    pub fn fixed(delay: Duration, retries: usize) -> Self {
        Self::Table(vec![delay; retries])
    }

    /// `retries` retries with `initial * multiplier^(n - 1)` before retry
    /// `n`, capped at `max_delay`. No jitter.
    #[must_use]
    pub fn exponential(
        initial: Duration,
        multiplier: f64,
        max_delay: Duration,
        retries: u32,
    ) -> Self {
        Self::table((1..=retries).map(|n| exponential_delay(initial, multiplier, max_delay, n)))
    }

    /// Returns the delay before the attempt after `attempt`, if any.
    pub fn delay_after(&mut self, attempt: u32, outcome: &Result<T, E>) -> Option<Duration> {
        match self {
            Self::Table(delays) => {
                let index = usize::try_from(attempt.checked_sub(1)?).ok()?;
                delays.get(index).copied()
            }
            Self::Policy(policy) => policy(attempt, outcome),
        }
    }

    /// Returns the maximum number of retries, if bounded by a table.
    #[must_use]
    pub fn max_retries(&self) -> Option<usize> {
        match self {
            Self::Table(delays) => Some(delays.len()),
            Self::Policy(_) => None,
        }
    }
}

/// Computes `initial * multiplier^(retry - 1)`, capped at `max_delay`.
#[must_use]
#[allow(
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation
)]
pub fn exponential_delay(
    initial: Duration,
    multiplier: f64,
    max_delay: Duration,
    retry: u32,
) -> Duration {
    if retry == 0 {
        return Duration::ZERO;
    }
    let exponent = retry.saturating_sub(1);
    let base_nanos = initial.as_nanos() as f64 * multiplier.powi(exponent as i32);
    let capped_nanos = base_nanos.min(max_delay.as_nanos() as f64).max(0.0);
    Duration::from_nanos(capped_nanos as u64)
}

impl<T, E> From<Vec<Duration>> for Backoff<T, E> {
    fn from(delays: Vec<Duration>) -> Self {
        Self::Table(delays)
    }
}

impl<T, E> From<&[u64]> for Backoff<T, E> {
    fn from(delays_ms: &[u64]) -> Self {
        Self::table_ms(delays_ms)
    }
}

impl<T, E, const N: usize> From<[u64; N]> for Backoff<T, E> {
    fn from(delays_ms: [u64; N]) -> Self {
        Self::table_ms(&delays_ms)
    }
}

impl<T, E> fmt::Debug for Backoff<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table(delays) => f.debug_tuple("Table").field(delays).finish(),
            Self::Policy(_) => f.write_str("Policy(..)"),
        }
    }
}

/// Decides whether an outcome should be retried.
pub trait RetryPredicate<T, E> {
    /// Returns true to retry after `attempt` produced `outcome`.
    fn should_retry(&self, outcome: &Result<T, E>, attempt: u32) -> bool;
}

/// Retry iff the attempt failed.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryOnError;

impl<T, E> RetryPredicate<T, E> for RetryOnError {
    fn should_retry(&self, outcome: &Result<T, E>, _attempt: u32) -> bool {
        outcome.is_err()
    }
}

/// Retry every outcome, success included, for as long as the backoff allows.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRetry;

impl<T, E> RetryPredicate<T, E> for AlwaysRetry {
    fn should_retry(&self, _outcome: &Result<T, E>, _attempt: u32) -> bool {
        true
    }
}

/// Never retry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRetry;

impl<T, E> RetryPredicate<T, E> for NeverRetry {
    fn should_retry(&self, _outcome: &Result<T, E>, _attempt: u32) -> bool {
        false
    }
}

/// Retry failures the closure accepts.
#[derive(Debug, Clone, Copy)]
pub struct RetryIf<F>(pub F);

impl<T, E, F: Fn(&E, u32) -> bool> RetryPredicate<T, E> for RetryIf<F> {
    fn should_retry(&self, outcome: &Result<T, E>, attempt: u32) -> bool {
        outcome.as_ref().err().is_some_and(|error| (self.0)(error, attempt))
    }
}

impl<T, E, F> RetryPredicate<T, E> for F
where
    F: Fn(&Result<T, E>, u32) -> bool,
{
    fn should_retry(&self, outcome: &Result<T, E>, attempt: u32) -> bool {
        self(outcome, attempt)
    }
}

struct NextAttempt<T, E> {
    attempt: u32,
    previous: Option<Result<T, E>>,
}

/// Runs `operation` with retries.
///
/// `operation(attempt, previous)` gets the 1-based attempt number and the
/// previous attempt's outcome (`None` on the first attempt). Retries of one
/// call never overlap.
///
/// # Panics
///
/// Panics outside a runtime.
pub fn with_retry<T, E, Op, Fut, B, P>(operation: Op, backoff: B, should_retry: P) -> Deferred<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
    Op: FnMut(u32, Option<Result<T, E>>) -> Fut + 'static,
    Fut: IntoFuture<Output = Result<T, E>>,
    Fut::IntoFuture: 'static,
    B: Into<Backoff<T, E>>,
    P: RetryPredicate<T, E> + 'static,
{
    let mut backoff = backoff.into();
    let mut operation = operation;
    Deferred::spawn(async move {
        let last = repeat_fold(
            NextAttempt {
                attempt: 1,
                previous: None,
            },
            None,
            |next: NextAttempt<T, E>| {
                let attempt = next.attempt;
                let pending = operation(attempt, next.previous).into_future();
                async move { (attempt, pending.await) }
            },
            |(attempt, outcome): &(u32, Result<T, E>), _iteration| {
                let attempt = *attempt;
                if !should_retry.should_retry(outcome, attempt) {
                    trace!(attempt, ok = outcome.is_ok(), "retry predicate declined");
                    return None;
                }
                let Some(delay) = backoff.delay_after(attempt, outcome) else {
                    debug!(attempt, "backoff exhausted");
                    return None;
                };
                debug!(attempt, delay_ms = delay.as_millis(), "scheduling retry");
                let next = NextAttempt {
                    attempt: attempt.saturating_add(1),
                    previous: Some(outcome.clone()),
                };
                Some(async move {
                    sleep(delay).await;
                    next
                })
            },
            |_, (_, outcome)| Some(outcome),
        )
        .await;
        let Some(outcome) = last else {
            unreachable!("repeat_fold always runs the first attempt");
        };
        outcome
    })
}

/// [`with_retry`] with the default predicate, [`RetryOnError`].
///
/// # Panics
///
/// Panics outside a runtime.
pub fn with_retry_on_error<T, E, Op, Fut, B>(operation: Op, backoff: B) -> Deferred<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
    Op: FnMut(u32, Option<Result<T, E>>) -> Fut + 'static,
    Fut: IntoFuture<Output = Result<T, E>>,
    Fut::IntoFuture: 'static,
    B: Into<Backoff<T, E>>,
{
    with_retry(operation, backoff, RetryOnError)
}

/// Sum of every delay a table backoff can wait, or `None` for a policy.
#[must_use]
pub fn total_table_delay<T, E>(backoff: &Backoff<T, E>) -> Option<Duration> {
    match backoff {
        Backoff::Table(delays) => Some(delays.iter().sum()),
        Backoff::Policy(_) => None,
    }
}
