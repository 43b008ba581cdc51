//! Test utilities for franken-deferred.
//!
//! Shared helpers for unit and integration tests:
//! - Consistent tracing-based logging initialization
//! - Phase/section macros for readable test output
//! - Virtual-time runtime constructors
//! - An async test runner
//!
//! # Example
//! ```
//! use franken_deferred::test_utils::{init_test_logging, run_test};
//! use franken_deferred::time::sleep;
//! use std::time::Duration;
//!
//! init_test_logging();
//! run_test(|| async {
//!     sleep(Duration::from_secs(60)).await;
//! });
//! ```

use crate::runtime::{LocalRuntime, RuntimeConfig};
use crate::types::Time;
use std::future::Future;
use std::sync::Once;
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;

static INIT_LOGGING: Once = Once::new();

/// Poll budget for test runtimes; catches accidental busy loops.
pub const DEFAULT_TEST_STEP_LIMIT: u64 = 1_000_000;

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
///
/// The first call wins; later calls are no-ops.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// Create a virtual-time runtime starting at time zero.
#[must_use]
pub fn test_runtime() -> LocalRuntime {
    test_runtime_at(Time::ZERO)
}

/// Create a virtual-time runtime starting at `start`.
#[must_use]
pub fn test_runtime_at(start: Time) -> LocalRuntime {
    let config = RuntimeConfig {
        start_time: start,
        max_steps: Some(DEFAULT_TEST_STEP_LIMIT),
        ..RuntimeConfig::virtual_time()
    };
    LocalRuntime::with_config(config)
}

/// Run async test code on a fresh virtual-time runtime.
///
/// `f` is called inside the runtime, so it may spawn eagerly.
///
/// # Panics
///
/// Panics if the runtime stalls or exceeds its step limit.
pub fn run_test<F, Fut>(f: F) -> Fut::Output
where
    F: FnOnce() -> Fut,
    Fut: Future,
{
    init_test_logging();
    let runtime = test_runtime();
    runtime
        .block_on(async move { f().await })
        .expect("test runtime failed")
}

/// Run async test code and return the virtual time it took.
///
/// # Panics
///
/// Panics if the runtime stalls or exceeds its step limit.
pub fn run_timed<F, Fut>(f: F) -> (Fut::Output, Duration)
where
    F: FnOnce() -> Fut,
    Fut: Future,
{
    init_test_logging();
    let runtime = test_runtime();
    let start = runtime.now();
    let output = runtime
        .block_on(async move { f().await })
        .expect("test runtime failed");
    (output, runtime.now().elapsed_since(start))
}

/// Log a test phase transition with a visual separator.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Log a section within a test phase.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::debug!(section = %$name, "--- {} ---", $name);
    };
}

/// Log test completion with summary.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
    ($name:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(
            test = %$name,
            $($key = %$value,)*
            "test completed successfully: {}",
            $name
        );
    };
}

/// Log before assertions for context.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        tracing::debug!(
            expected = ?$expected,
            actual = ?$actual,
            "Asserting: {}",
            $msg
        );
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}

/// Assert that a deferred value settled with `Ok(expected)`.
#[macro_export]
macro_rules! assert_fulfilled {
    ($outcome:expr, $expected:expr) => {
        match $outcome {
            Ok(value) => assert_eq!(value, $expected),
            Err(err) => panic!("expected fulfilled, got rejected: {:?}", err),
        }
    };
}

/// Assert that a deferred value settled with `Err(expected)`.
#[macro_export]
macro_rules! assert_rejected {
    ($outcome:expr, $expected:expr) => {
        match $outcome {
            Err(err) => assert_eq!(err, $expected),
            Ok(value) => panic!("expected rejected, got fulfilled: {:?}", value),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::sleep;

    #[test]
    fn run_timed_reports_virtual_elapsed() {
        let (value, elapsed) = run_timed(|| async {
            sleep(Duration::from_secs(3600)).await;
            7
        });
        assert_eq!(value, 7);
        assert_eq!(elapsed, Duration::from_secs(3600));
    }

    #[test]
    fn test_runtime_starts_where_asked() {
        let rt = test_runtime_at(Time::from_secs(10));
        assert_eq!(rt.now(), Time::from_secs(10));
        assert!(rt.config().is_virtual());
    }

    #[test]
    fn outcome_macros() {
        init_test_logging();
        test_section!("outcome_macros");
        let ok: Result<u8, &str> = Ok(1);
        let err: Result<u8, &str> = Err("no");
        assert_fulfilled!(ok, 1);
        assert_rejected!(err, "no");
        assert_with_log!(ok.is_ok(), "ok outcome", true, ok.is_ok());
    }
}
