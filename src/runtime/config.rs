//! Runtime configuration types.

use crate::error::Error;
use crate::types::Time;
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// Which clock drives a [`LocalRuntime`](super::LocalRuntime).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeMode {
    /// Deterministic virtual time. The clock only moves when every task is
    /// blocked, and then jumps straight to the earliest timer.
    Virtual,
    /// Monotonic wall-clock time. Idle periods park the thread.
    #[default]
    Wall,
}

impl TimeMode {
    /// Returns the lowercase name used in env vars and config files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Virtual => "virtual",
            Self::Wall => "wall",
        }
    }
}

impl fmt::Display for TimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "virtual" | "lab" => Ok(Self::Virtual),
            "wall" | "real" => Ok(Self::Wall),
            other => Err(Error::config(format!(
                "unknown time mode {other:?} (expected \"virtual\" or \"wall\")"
            ))),
        }
    }
}

/// Resolved configuration of a single runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Clock that drives timers.
    pub time_mode: TimeMode,
    /// Maximum number of polls one `block_on` call may perform.
    pub max_steps: Option<u64>,
    /// Initial reading of the virtual clock. Ignored in wall mode.
    pub start_time: Time,
}

impl RuntimeConfig {
    /// Returns the configuration used by deterministic tests.
    #[must_use]
    pub const fn virtual_time() -> Self {
        Self {
            time_mode: TimeMode::Virtual,
            max_steps: None,
            start_time: Time::ZERO,
        }
    }

    /// Returns the production configuration.
    #[must_use]
    pub const fn wall_clock() -> Self {
        Self {
            time_mode: TimeMode::Wall,
            max_steps: None,
            start_time: Time::ZERO,
        }
    }

    /// Returns true when the runtime uses virtual time.
    #[must_use]
    pub const fn is_virtual(&self) -> bool {
        matches!(self.time_mode, TimeMode::Virtual)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::wall_clock()
    }
}
