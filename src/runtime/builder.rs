//! Builder for [`LocalRuntime`].
//!
//! Layers, lowest priority first: defaults, an optional TOML file, the
//! environment (when [`RuntimeBuilder::with_env_overrides`] is set), then
//! builder methods.

use crate::error::Result;
use crate::runtime::config::{RuntimeConfig, TimeMode};
use crate::runtime::{LocalRuntime, env_config};
use crate::types::Time;

/// Builder for a [`LocalRuntime`].
///
/// ```
/// use franken_deferred::runtime::{RuntimeBuilder, TimeMode};
///
/// let rt = RuntimeBuilder::new()
///     .time_mode(TimeMode::Virtual)
///     .max_steps(10_000)
///     .build()
///     .unwrap();
/// assert_eq!(rt.config().max_steps, Some(10_000));
/// ```
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct RuntimeBuilder {
    time_mode: Option<TimeMode>,
    #[allow(clippy::option_option)]
    max_steps: Option<Option<u64>>,
    start_time: Option<Time>,
    env_overrides: bool,
    #[cfg(feature = "config-file")]
    config_file: Option<std::path::PathBuf>,
}

impl RuntimeBuilder {
    /// Creates a builder with no overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shortcut for a virtual-clock builder.
    pub fn virtual_time() -> Self {
        Self::new().time_mode(TimeMode::Virtual)
    }

    /// Shortcut for a wall-clock builder.
    pub fn wall_clock() -> Self {
        Self::new().time_mode(TimeMode::Wall)
    }

    /// Selects the clock.
    pub const fn time_mode(mut self, mode: TimeMode) -> Self {
        self.time_mode = Some(mode);
        self
    }

    /// Limits the number of polls per `block_on` call.
    pub const fn max_steps(mut self, limit: u64) -> Self {
        self.max_steps = Some(Some(limit));
        self
    }

    /// Removes any step limit, including one from env or file.
    pub const fn no_step_limit(mut self) -> Self {
        self.max_steps = Some(None);
        self
    }

    /// Sets the initial virtual time.
    pub const fn start_time(mut self, time: Time) -> Self {
        self.start_time = Some(time);
        self
    }

    /// Applies `FRANKEN_DEFERRED_*` environment variables on build.
    pub const fn with_env_overrides(mut self) -> Self {
        self.env_overrides = true;
        self
    }

    /// Loads a TOML config file on build.
    #[cfg(feature = "config-file")]
    pub fn config_file(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Resolves every layer into a [`RuntimeConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the environment or
    /// the config file holds an invalid value.
    pub fn resolve(&self) -> Result<RuntimeConfig> {
        let mut config = RuntimeConfig::default();
        #[cfg(feature = "config-file")]
        if let Some(path) = &self.config_file {
            let parsed = env_config::parse_toml_file(path)?;
            env_config::apply_toml_config(&mut config, &parsed);
        }
        if self.env_overrides {
            env_config::apply_env_overrides(&mut config)?;
        }
        if let Some(mode) = self.time_mode {
            config.time_mode = mode;
        }
        if let Some(limit) = self.max_steps {
            config.max_steps = limit;
        }
        if let Some(start) = self.start_time {
            config.start_time = start;
        }
        Ok(config)
    }

    /// Builds the runtime.
    ///
    /// # Errors
    ///
    /// See [`resolve`](Self::resolve).
    pub fn build(&self) -> Result<LocalRuntime> {
        Ok(LocalRuntime::with_config(self.resolve()?))
    }
}
