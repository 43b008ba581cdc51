//! Concurrency-control combinators.
//!
//! - [`timeout_resolve`] / [`timeout_reject`]: race an operation against a
//!   timer with a fallback
//! - [`with_retry`]: retry with caller-supplied backoff and predicate
//! - [`repeat`] / [`repeat_fold`]: the sequential loop retries are built on
//! - [`in_parallel`] / [`with_concurrency`]: bounded-parallelism job runner
//! - [`select`], [`join_all`], [`try_join_all`]: the low-level futures the
//!   above are assembled from
//!
//! None of these cancel work that has started. A losing operation keeps
//! running; only its outcome is ignored.

pub mod join;
pub mod parallel;
pub mod repeat;
pub mod retry;
pub mod select;
pub mod timeout;

pub use join::{JoinAll, TryJoinAll, join_all, try_join_all};
pub use parallel::{ParallelOptions, Parallelism, in_parallel, with_concurrency};
pub use repeat::{repeat, repeat_fold};
pub use retry::{
    AlwaysRetry, Backoff, FIBONACCI_MS, NeverRetry, POWERS_OF_TWO_MS, RetryIf, RetryOnError,
    RetryPredicate, exponential_delay, total_table_delay, with_retry, with_retry_on_error,
};
pub use select::{Either, Select, select};
pub use timeout::{IntoDeferred, timeout_reject, timeout_resolve};
