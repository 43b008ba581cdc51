//! franken-deferred: deferred values and the combinators that schedule them.
//!
//! # Overview
//!
//! A [`Deferred<T, E>`] is a shared, one-shot handle on a `Result<T, E>`. It
//! starts pending, settles exactly once, and can be awaited by any number of
//! holders. The combinators in this crate build time- and concurrency-aware
//! behavior on top of it:
//!
//! - [`delayed_resolve`] / [`delayed_reject`]: settle after a delay
//! - [`promise_state`]: observe pending / fulfilled / rejected without waiting
//! - [`timeout_resolve`] / [`timeout_reject`]: race an operation against a timer
//! - [`repeat`]: run an operation sequentially while a continuation says so
//! - [`with_retry`]: retry on failure with table- or policy-driven backoff
//! - [`in_parallel`] / [`with_concurrency`]: bounded-parallel job runner
//! - [`LockRegistry::synchronized`]: per-key serialization of operations
//!
//! Everything runs on a single-threaded [`LocalRuntime`] that drives either a
//! wall clock or a virtual clock. Under virtual time an idle runtime jumps
//! straight to the next timer deadline, so timing-dependent behavior can be
//! tested exactly and instantly.
//!
//! # Module Structure
//!
//! - [`types`]: Task identifiers, timestamps, settlement state
//! - [`deferred`]: The deferred value, its completer, value sources
//! - [`runtime`]: Executor, timers, configuration
//! - [`time`]: Clocks, sleeps, delayed settlement
//! - [`combinator`]: Select, join, timeout, repeat, retry, parallel runner
//! - [`sync`]: Keyed serialization
//! - [`error`](mod@error): Runtime error types
//! - [`tracing_compat`]: Optional tracing integration (requires `tracing-integration` feature)
//!
//! # Example
//!
//! ```
//! use franken_deferred::{LocalRuntime, ValueSource, timeout_resolve, delayed_resolve};
//! use std::time::Duration;
//!
//! let rt = LocalRuntime::virtual_time();
//! let out = rt
//!     .block_on(async {
//!         let slow =
//!             delayed_resolve::<_, String>(Duration::from_secs(5), ValueSource::value("slow"));
//!         timeout_resolve(slow, Duration::from_secs(1), ValueSource::value("fallback")).await
//!     })
//!     .unwrap();
//! assert_eq!(out, Ok("fallback"));
//! assert_eq!(rt.now().as_secs(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_inception)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]

pub mod combinator;
pub mod deferred;
pub mod error;
pub mod runtime;
pub mod sync;
pub mod time;
pub mod tracing_compat;
pub mod types;

// ── Test-only modules ───────────────────────────────────────────────────
#[cfg(any(test, feature = "test-internals"))]
pub mod test_utils;

// Re-exports for convenient access to core types
pub use combinator::{
    Backoff, ParallelOptions, Parallelism, RetryPredicate, in_parallel, repeat, timeout_reject,
    timeout_resolve, with_concurrency, with_retry,
};
pub use deferred::{Completer, Deferred, ValueSource, promise_state};
pub use error::{Error, Result};
pub use runtime::{LocalRuntime, RuntimeBuilder, RuntimeConfig, TimeMode};
pub use sync::{LockRegistry, Predecessor};
pub use time::{delayed_reject, delayed_resolve, sleep};
pub use types::{SettlementState, Time};
