//! Environment variable and config file support for [`RuntimeBuilder`](super::RuntimeBuilder).
//!
//! # Configuration Precedence
//!
//! Settings are resolved in this order (highest priority first):
//!
//! 1. **Programmatic**: values set via builder methods (`max_steps(10_000)`)
//! 2. **Environment variables**: values from `FRANKEN_DEFERRED_*` env vars
//! 3. **Config file**: values loaded from a TOML file (requires `config-file` feature)
//! 4. **Defaults**: built-in defaults from [`RuntimeConfig::default()`]
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `FRANKEN_DEFERRED_TIME_MODE` | `virtual` / `wall` | `time_mode` |
//! | `FRANKEN_DEFERRED_MAX_STEPS` | `u64` (`0` = unlimited) | `max_steps` |

use crate::error::Error;
use crate::runtime::config::{RuntimeConfig, TimeMode};

/// Environment variable name for the clock kind.
pub const ENV_TIME_MODE: &str = "FRANKEN_DEFERRED_TIME_MODE";
/// Environment variable name for the per-`block_on` poll limit.
pub const ENV_MAX_STEPS: &str = "FRANKEN_DEFERRED_MAX_STEPS";

/// Apply environment variable overrides to a [`RuntimeConfig`].
///
/// Only variables that are set in the environment are applied.
///
/// # Errors
///
/// Returns [`Error::Config`] if a variable is set but unparseable.
pub fn apply_env_overrides(config: &mut RuntimeConfig) -> Result<(), Error> {
    apply_overrides_from(config, |name| std::env::var(name).ok())
}

/// Apply overrides read through `lookup` instead of the process environment.
///
/// # Errors
///
/// Returns [`Error::Config`] if a variable is present but unparseable.
pub fn apply_overrides_from<F>(config: &mut RuntimeConfig, lookup: F) -> Result<(), Error>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup(ENV_TIME_MODE) {
        config.time_mode = val
            .parse::<TimeMode>()
            .map_err(|e| Error::config(format!("invalid value for {ENV_TIME_MODE}: {e}")))?;
    }
    if let Some(val) = lookup(ENV_MAX_STEPS) {
        config.max_steps = limit_from(parse_u64(ENV_MAX_STEPS, &val)?);
    }
    Ok(())
}

fn parse_u64(var_name: &str, val: &str) -> Result<u64, Error> {
    val.trim().parse::<u64>().map_err(|e| {
        Error::config(format!(
            "invalid value for {var_name}: expected unsigned integer, got {val:?} ({e})"
        ))
    })
}

const fn limit_from(raw: u64) -> Option<u64> {
    if raw == 0 { None } else { Some(raw) }
}

// =========================================================================
// TOML config file support (feature-gated)
// =========================================================================

/// TOML-deserializable runtime configuration.
///
/// ```toml
/// [runtime]
/// time_mode = "virtual"
/// max_steps = 100000
/// start_time_ms = 0
/// ```
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct RuntimeTomlConfig {
    /// Runtime settings.
    #[serde(default)]
    pub runtime: RuntimeToml,
}

/// Runtime section of the TOML config.
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct RuntimeToml {
    /// Clock kind.
    pub time_mode: Option<TimeMode>,
    /// Poll limit per `block_on` call (0 = unlimited).
    pub max_steps: Option<u64>,
    /// Initial virtual time in milliseconds.
    pub start_time_ms: Option<u64>,
}

/// Apply a parsed TOML config to a [`RuntimeConfig`].
///
/// Only fields that are `Some` in the TOML struct override the config.
#[cfg(feature = "config-file")]
pub fn apply_toml_config(config: &mut RuntimeConfig, toml: &RuntimeTomlConfig) {
    if let Some(v) = toml.runtime.time_mode {
        config.time_mode = v;
    }
    if let Some(v) = toml.runtime.max_steps {
        config.max_steps = limit_from(v);
    }
    if let Some(v) = toml.runtime.start_time_ms {
        config.start_time = crate::types::Time::from_millis(v);
    }
}

/// Parse a TOML string into a [`RuntimeTomlConfig`].
///
/// # Errors
///
/// Returns [`Error::Config`] on syntax or type errors.
#[cfg(feature = "config-file")]
pub fn parse_toml_str(toml_str: &str) -> Result<RuntimeTomlConfig, Error> {
    toml::from_str(toml_str).map_err(|e| Error::config(format!("failed to parse TOML config: {e}")))
}

/// Read and parse a TOML file into a [`RuntimeTomlConfig`].
///
/// # Errors
///
/// Returns [`Error::Config`] if the file cannot be read or parsed.
#[cfg(feature = "config-file")]
pub fn parse_toml_file(path: &std::path::Path) -> Result<RuntimeTomlConfig, Error> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "failed to read config file {}: {e}",
            path.display()
        ))
    })?;
    parse_toml_str(&content)
}
