//! idler.toml configuration parser.
//!
//! ```toml
//! interval = "3s"
//! default_cooldown = "30m"
//! state_ttl = "20s"
//! ```
//!
//! Every key is optional. Durations use the same syntax as the cooldown
//! annotation.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::duration::parse_duration;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid duration for `{field}`: {value:?}")]
    InvalidDuration { field: &'static str, value: String },

    #[error("`interval` must be greater than zero")]
    ZeroInterval,

    #[error("`state_ttl` ({ttl:?}) must be longer than `interval` ({interval:?})")]
    TtlTooShort { ttl: Duration, interval: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IdlerConfig {
    /// Delay between reconciliation cycles.
    pub interval: String,
    /// Cooldown used when a target has no valid override annotation.
    pub default_cooldown: String,
    /// Sliding expiration of per-target reconciliation state.
    pub state_ttl: String,
}

impl Default for IdlerConfig {
    fn default() -> Self {
        Self {
            interval: "3s".to_string(),
            default_cooldown: "30m".to_string(),
            state_ttl: "20s".to_string(),
        }
    }
}

/// Validated, parsed form of [`IdlerConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub interval: Duration,
    pub default_cooldown: Duration,
    pub state_ttl: Duration,
}

impl IdlerConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Parse and validate all durations.
    ///
    /// State entries must outlive the polling interval, otherwise every
    /// target would lose its idle timer between cycles.
    pub fn settings(&self) -> ConfigResult<Settings> {
        let interval = field_duration("interval", &self.interval)?;
        let default_cooldown = field_duration("default_cooldown", &self.default_cooldown)?;
        let state_ttl = field_duration("state_ttl", &self.state_ttl)?;

        if interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if state_ttl <= interval {
            return Err(ConfigError::TtlTooShort {
                ttl: state_ttl,
                interval,
            });
        }

        Ok(Settings {
            interval,
            default_cooldown,
            state_ttl,
        })
    }
}

fn field_duration(field: &'static str, value: &str) -> ConfigResult<Duration> {
    parse_duration(Some(value)).ok_or_else(|| ConfigError::InvalidDuration {
        field,
        value: value.to_string(),
    })
}
