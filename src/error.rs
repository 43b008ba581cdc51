//! Error types for the runtime and its configuration.
//!
//! Failures produced by caller operations are never wrapped: every combinator
//! passes the caller's `E` through untouched. The [`Error`] type here only
//! covers what the crate itself can get wrong: driving a runtime, finding
//! one, or loading its configuration.

use thiserror::Error;

/// Errors raised by the runtime substrate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A task was spawned, or time was read, with no runtime on this thread.
    #[error("no runtime is active on this thread")]
    NoRuntime,
    /// `block_on` was called from inside a running `block_on`.
    #[error("cannot start a runtime from within a runtime")]
    NestedRuntime,
    /// The root future is pending, nothing is runnable, and no timer is armed.
    #[error("runtime stalled at {at}: root future pending with {live_tasks} live tasks and no timers")]
    Stalled {
        /// Virtual time at which the stall was detected.
        at: crate::types::Time,
        /// Tasks still alive (all blocked).
        live_tasks: usize,
    },
    /// The configured poll budget for one `block_on` call was used up.
    #[error("step limit of {limit} polls exceeded")]
    StepLimitExceeded {
        /// The configured limit.
        limit: u64,
    },
    /// A configuration value could not be parsed or loaded.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Creates a configuration error from any message.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Result alias for runtime entry points.
pub type Result<T> = std::result::Result<T, Error>;
