//! Configuration and statistics for the trampoline driver.
//!
//! A plain [`Trampoline::run`](crate::Trampoline::run) needs no configuration.
//! [`Driver`](crate::Driver) accepts a [`DriverConfig`] which can be built in
//! code, read from the environment, or parsed from TOML:
//!
//! ```toml
//! step_limit = 1000000
//! progress_interval = 50000
//! ```

use std::num::NonZeroU64;

use serde::Deserialize;

use crate::error::ConfigError;

/// Environment variable holding the default step budget
pub const STEP_LIMIT_ENV: &str = "STACKSAFE_STEP_LIMIT";

/// Environment variable holding the progress logging interval
pub const PROGRESS_INTERVAL_ENV: &str = "STACKSAFE_PROGRESS_INTERVAL";

/// Driver configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriverConfig {
    /// Maximum number of driver steps before giving up (`None` = unbounded)
    pub step_limit: Option<NonZeroU64>,
    /// Emit a `debug!` progress event every this many steps (`None` = never)
    pub progress_interval: Option<NonZeroU64>,
}

impl DriverConfig {
    /// Unbounded configuration without progress logging
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Create a configuration with the given step budget
    pub fn with_step_limit(mut self, limit: NonZeroU64) -> Self {
        self.step_limit = Some(limit);
        self
    }

    /// Create a configuration that logs progress every `interval` steps
    pub fn with_progress_interval(mut self, interval: NonZeroU64) -> Self {
        self.progress_interval = Some(interval);
        self
    }

    /// Read the configuration from `STACKSAFE_STEP_LIMIT` and
    /// `STACKSAFE_PROGRESS_INTERVAL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read the configuration through an arbitrary variable lookup.
    ///
    /// Unset and blank variables leave the setting unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            step_limit: parse_var(STEP_LIMIT_ENV, &lookup)?,
            progress_interval: parse_var(PROGRESS_INTERVAL_ENV, &lookup)?,
        })
    }

    /// Parse a configuration from a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

fn parse_var<F>(var: &'static str, lookup: &F) -> Result<Option<NonZeroU64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<NonZeroU64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value: raw }),
    }
}

/// Counters for a single driver run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Driver loop iterations
    pub steps: u64,
    /// Client continuations and thunks applied
    pub continuations: u64,
    /// Re-association rewrites performed
    pub reassociations: u64,
}

impl RunStats {
    /// Fraction of steps spent re-associating, as a percentage
    pub fn reassociation_rate(&self) -> f64 {
        if self.steps == 0 {
            0.0
        } else {
            (self.reassociations as f64 / self.steps as f64) * 100.0
        }
    }
}
