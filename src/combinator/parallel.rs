//! Bounded-parallelism job runner.
//!
//! `n` workers share one cursor over the job sequence. Each worker pulls one
//! `(index, job)` at a time, runs the operation for it as its own task, stores
//! the outcome at `index`, and pulls again until the cursor is exhausted. The
//! sequence is consumed lazily, so it may be unbounded when the caller aborts
//! on error.
//!
//! Two failure modes:
//!
//! - **Collect** (default): failures are stored alongside successes and every
//!   job runs.
//! - **Abort**: the first failure rejects the whole call at once. Jobs that
//!   were already dispatched keep running, but their outcomes are discarded
//!   and no worker pulls another job.

use crate::combinator::join::{join_all, try_join_all};
use crate::deferred::Deferred;
use crate::runtime;
use crate::tracing_compat::{debug, trace};
use std::cell::RefCell;
use std::future::IntoFuture;
use std::iter::Enumerate;
use std::rc::Rc;

/// Number of concurrent workers, always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Parallelism(usize);

impl Parallelism {
    /// Clamps `workers` to at least one.
    #[must_use]
    pub const fn new(workers: usize) -> Self {
        if workers == 0 { Self(1) } else { Self(workers) }
    }

    /// Floors a fractional count; anything below one, and NaN, becomes one.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_f64(workers: f64) -> Self {
        if workers.is_nan() || workers < 1.0 {
            Self(1)
        } else {
            // `as` saturates at usize::MAX for huge values and infinity.
            Self(workers.floor() as usize)
        }
    }

    /// Returns the worker count.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl Default for Parallelism {
    fn default() -> Self {
        Self(1)
    }
}

impl From<usize> for Parallelism {
    fn from(workers: usize) -> Self {
        Self::new(workers)
    }
}

impl From<u32> for Parallelism {
    fn from(workers: u32) -> Self {
        Self::new(usize::try_from(workers).unwrap_or(usize::MAX))
    }
}

impl From<i32> for Parallelism {
    fn from(workers: i32) -> Self {
        Self::new(usize::try_from(workers).unwrap_or(0))
    }
}

impl From<f64> for Parallelism {
    fn from(workers: f64) -> Self {
        Self::from_f64(workers)
    }
}

/// Options for [`in_parallel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParallelOptions {
    /// Reject on the first failure instead of collecting it.
    pub abort_on_error: bool,
}

impl ParallelOptions {
    /// Collect failures as `Err` outcomes.
    #[must_use]
    pub const fn collect() -> Self {
        Self {
            abort_on_error: false,
        }
    }

    /// Reject on the first failure.
    #[must_use]
    pub const fn abort_on_error() -> Self {
        Self {
            abort_on_error: true,
        }
    }
}

struct Shared<I, Op, T, E> {
    cursor: RefCell<Enumerate<I>>,
    operation: RefCell<Op>,
    outcomes: RefCell<Vec<Option<Result<T, E>>>>,
}

/// Runs `operation(job, index)` for every job with at most `parallelism`
/// in flight, resolving to outcomes in input order.
///
/// In abort mode the result rejects with the first failure instead.
///
/// # Panics
///
/// Panics outside a runtime.
///
/// ```
/// use franken_deferred::combinator::{ParallelOptions, in_parallel};
/// use franken_deferred::runtime::LocalRuntime;
///
/// let rt = LocalRuntime::virtual_time();
/// let out = rt
///     .block_on(async {
///         in_parallel(
///             2,
///             [1, 2, 3],
///             |n: i32, _index| async move { if n == 2 { Err("two") } else { Ok(n * 10) } },
///             ParallelOptions::default(),
///         )
///         .await
///     })
///     .unwrap();
/// assert_eq!(out, Ok(vec![Ok(10), Err("two"), Ok(30)]));
/// ```
pub fn in_parallel<I, T, E, Op, Fut>(
    parallelism: impl Into<Parallelism>,
    jobs: I,
    operation: Op,
    options: ParallelOptions,
) -> Deferred<Vec<Result<T, E>>, E>
where
    I: IntoIterator,
    I::IntoIter: 'static,
    I::Item: 'static,
    Op: FnMut(I::Item, usize) -> Fut + 'static,
    Fut: IntoFuture<Output = Result<T, E>> + 'static,
    Fut::IntoFuture: 'static,
    T: Clone + 'static,
    E: Clone + 'static,
{
    let parallelism = parallelism.into();
    Deferred::spawn(run(parallelism, jobs.into_iter(), operation, options.abort_on_error))
}

/// [`in_parallel`] in abort mode, resolving to the bare values.
///
/// # Panics
///
/// Panics outside a runtime.
pub fn with_concurrency<I, T, E, Op, Fut>(
    parallelism: impl Into<Parallelism>,
    jobs: I,
    operation: Op,
) -> Deferred<Vec<T>, E>
where
    I: IntoIterator,
    I::IntoIter: 'static,
    I::Item: 'static,
    Op: FnMut(I::Item, usize) -> Fut + 'static,
    Fut: IntoFuture<Output = Result<T, E>> + 'static,
    Fut::IntoFuture: 'static,
    T: Clone + 'static,
    E: Clone + 'static,
{
    let parallelism = parallelism.into();
    let jobs = jobs.into_iter();
    Deferred::spawn(async move {
        let outcomes = run(parallelism, jobs, operation, true).await?;
        outcomes.into_iter().collect::<Result<Vec<T>, E>>()
    })
}

async fn run<I, T, E, Op, Fut>(
    parallelism: Parallelism,
    jobs: I,
    operation: Op,
    abort_on_error: bool,
) -> Result<Vec<Result<T, E>>, E>
where
    I: Iterator + 'static,
    I::Item: 'static,
    Op: FnMut(I::Item, usize) -> Fut + 'static,
    Fut: IntoFuture<Output = Result<T, E>> + 'static,
    Fut::IntoFuture: 'static,
    T: 'static,
    E: 'static,
{
    let shared = Rc::new(Shared {
        cursor: RefCell::new(jobs.enumerate()),
        operation: RefCell::new(operation),
        outcomes: RefCell::new(Vec::new()),
    });

    // A worker only starts once there is a job for it.
    let mut pool = Vec::new();
    while pool.len() < parallelism.get() {
        let next = shared.cursor.borrow_mut().next();
        let Some(first) = next else {
            break;
        };
        pool.push(drain(pool.len(), first, Rc::clone(&shared), abort_on_error));
    }
    trace!(workers = pool.len(), abort_on_error, "starting parallel run");
    if abort_on_error {
        try_join_all(pool).await?;
    } else {
        join_all(pool).await;
    }

    let outcomes = std::mem::take(&mut *shared.outcomes.borrow_mut());
    Ok(outcomes.into_iter().flatten().collect())
}

#[cfg_attr(not(feature = "tracing-integration"), allow(unused_variables))]
async fn drain<I, T, E, Op, Fut>(
    worker: usize,
    first: (usize, I::Item),
    shared: Rc<Shared<I, Op, T, E>>,
    abort_on_error: bool,
) -> Result<(), E>
where
    I: Iterator,
    Op: FnMut(I::Item, usize) -> Fut,
    Fut: IntoFuture<Output = Result<T, E>>,
    Fut::IntoFuture: 'static,
    T: 'static,
    E: 'static,
{
    let mut next = Some(first);
    while let Some((index, job)) = next {
        let pending = {
            let mut operation = shared.operation.borrow_mut();
            (*operation)(job, index).into_future()
        };
        let outcome = runtime::spawn(pending).await;
        match outcome {
            Err(error) if abort_on_error => {
                debug!(worker, index, "job failed, aborting parallel run");
                return Err(error);
            }
            outcome => {
                let mut outcomes = shared.outcomes.borrow_mut();
                if outcomes.len() <= index {
                    outcomes.resize_with(index + 1, || None);
                }
                outcomes[index] = Some(outcome);
            }
        }
        next = shared.cursor.borrow_mut().next();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deferred::ValueSource;
    use crate::runtime::LocalRuntime;
    use crate::time::{delayed_reject, delayed_resolve, sleep};
    use std::cell::Cell;
    use std::time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn parallelism_coercion() {
        assert_eq!(Parallelism::from(0_usize).get(), 1);
        assert_eq!(Parallelism::from(-3_i32).get(), 1);
        assert_eq!(Parallelism::from(2.9_f64).get(), 2);
        assert_eq!(Parallelism::from(0.5_f64).get(), 1);
        assert_eq!(Parallelism::from(f64::NAN).get(), 1);
        assert_eq!(Parallelism::from(f64::NEG_INFINITY).get(), 1);
        assert_eq!(Parallelism::from(7_u32).get(), 7);
    }

    #[test]
    fn thirty_jobs_at_parallelism_five_take_six_rounds() {
        crate::test_utils::init_test_logging();
        crate::test_phase!("thirty_jobs_at_parallelism_five_take_six_rounds");
        let rt = LocalRuntime::virtual_time();
        let out = rt
            .block_on(async {
                in_parallel(
                    5,
                    vec![1_u8; 30],
                    |job, _| delayed_resolve::<_, ()>(ms(50), ValueSource::value(job)),
                    ParallelOptions::default(),
                )
                .await
            })
            .unwrap();
        assert_eq!(out.map(|v| v.len()), Ok(30));
        assert_eq!(rt.now().as_millis(), 300);
        crate::test_complete!("thirty_jobs_at_parallelism_five_take_six_rounds");
    }

    #[test]
    fn outcomes_keep_input_order() {
        let rt = LocalRuntime::virtual_time();
        let out = rt
            .block_on(async {
                in_parallel(
                    3,
                    [40_u64, 10, 30, 20, 5],
                    |delay, index| async move {
                        sleep(ms(delay)).await;
                        if index == 2 { Err(delay) } else { Ok(index) }
                    },
                    ParallelOptions::collect(),
                )
                .await
            })
            .unwrap();
        assert_eq!(out, Ok(vec![Ok(0), Ok(1), Err(30), Ok(3), Ok(4)]));
    }

    #[test]
    fn never_more_than_parallelism_in_flight() {
        let rt = LocalRuntime::virtual_time();
        let in_flight = Rc::new(Cell::new(0_usize));
        let peak = Rc::new(Cell::new(0_usize));
        rt.block_on({
            let (in_flight, peak) = (Rc::clone(&in_flight), Rc::clone(&peak));
            async move {
                in_parallel(
                    2.5,
                    0..9_u64,
                    move |job, _| {
                        let (in_flight, peak) = (Rc::clone(&in_flight), Rc::clone(&peak));
                        async move {
                            in_flight.set(in_flight.get() + 1);
                            peak.set(peak.get().max(in_flight.get()));
                            sleep(ms(job + 1)).await;
                            in_flight.set(in_flight.get() - 1);
                            Ok::<_, ()>(job)
                        }
                    },
                    ParallelOptions::default(),
                )
                .await
            }
        })
        .unwrap()
        .unwrap();
        assert_eq!(peak.get(), 2);
    }

    #[test]
    fn empty_jobs_resolve_immediately() {
        let rt = LocalRuntime::virtual_time();
        let out = rt
            .block_on(async {
                with_concurrency(4, Vec::<u8>::new(), |job, _| async move { Ok::<_, ()>(job) })
                    .await
            })
            .unwrap();
        assert_eq!(out, Ok(vec![]));
        assert_eq!(rt.now().as_millis(), 0);
    }

    #[test]
    fn abort_rejects_at_first_failure_and_stops_pulling() {
        let rt = LocalRuntime::virtual_time();
        let started = Rc::new(RefCell::new(Vec::new()));
        let (out, at) = rt
            .block_on({
                let started = Rc::clone(&started);
                async move {
                    let out = with_concurrency(2, 0..6_usize, move |job, _| {
                        started.borrow_mut().push(job);
                        if job == 1 {
                            delayed_reject(ms(15), ValueSource::value("job 1 failed"))
                        } else {
                            delayed_resolve(ms(10), ValueSource::value(job))
                        }
                    })
                    .await;
                    (out, runtime::now().as_millis())
                }
            })
            .unwrap();
        assert_eq!(out, Err("job 1 failed"));
        assert_eq!(at, 15);
        // Job 0 finished at 10 and its worker pulled job 2; nothing after.
        assert_eq!(*started.borrow(), vec![0, 1, 2]);
        // Job 2 still completes in the background.
        rt.run_until_idle().unwrap();
        assert_eq!(rt.now().as_millis(), 20);
    }

    #[test]
    fn abort_mode_accepts_an_unbounded_sequence() {
        let rt = LocalRuntime::virtual_time();
        let out = rt
            .block_on(async {
                with_concurrency(3, 0_u64.., |job, _| async move {
                    sleep(ms(1)).await;
                    if job == 7 { Err(job) } else { Ok(job) }
                })
                .await
            })
            .unwrap();
        assert_eq!(out, Err(7));
    }

    #[test]
    fn collect_mode_returns_values_with_concurrency() {
        let rt = LocalRuntime::virtual_time();
        let out = rt
            .block_on(async {
                with_concurrency(usize::MAX, ["a", "b"], |job, index| async move {
                    Ok::<_, ()>(format!("{index}:{job}"))
                })
                .await
            })
            .unwrap();
        assert_eq!(out, Ok(vec!["0:a".to_string(), "1:b".to_string()]));
    }

    #[test]
    fn unbounded_parallelism_starts_one_worker_per_pulled_job() {
        let rt = LocalRuntime::virtual_time();
        let out = rt
            .block_on(async {
                let mut left = 3_u32;
                let jobs = std::iter::from_fn(move || {
                    left = left.checked_sub(1)?;
                    Some(left)
                });
                let infinite = in_parallel(
                    f64::INFINITY,
                    jobs,
                    |job, _| delayed_resolve::<_, ()>(ms(10), ValueSource::value(job)),
                    ParallelOptions::default(),
                )
                .await;
                let huge = with_concurrency(1_000_000_000_usize, 0..4_u32, |job, _| async move {
                    Ok::<_, ()>(job)
                })
                .await;
                (infinite, huge)
            })
            .unwrap();
        assert_eq!(out.0, Ok(vec![Ok(2), Ok(1), Ok(0)]));
        assert_eq!(out.1, Ok(vec![0, 1, 2, 3]));
        assert_eq!(rt.now().as_millis(), 10);
    }
}
