//! Error types
//!
//! Evaluation itself never fails: panics raised by client continuations
//! propagate out of the driver untouched. The errors here cover the three
//! places where the crate does reject something:
//!
//! - building a node from an absent continuation (`try_defer`, `try_bind`, `try_map`)
//! - a [`Driver`](crate::Driver) running out of its step budget
//! - reading a [`DriverConfig`](crate::DriverConfig) from the environment or TOML

use std::fmt;

/// Errors produced while building or driving a trampoline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrampolineError {
    /// A continuation or thunk was absent when building a node
    MissingContinuation {
        /// The building operation that was handed `None`
        operation: &'static str,
    },
    /// The driver reached its step budget before the computation finished
    StepLimitExceeded {
        /// The configured budget
        limit: u64,
    },
}

impl fmt::Display for TrampolineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingContinuation { operation } => {
                write!(f, "Missing continuation passed to {}", operation)
            }
            Self::StepLimitExceeded { limit } => {
                write!(f, "Step limit exceeded: computation unfinished after {} steps", limit)
            }
        }
    }
}

impl std::error::Error for TrampolineError {}

/// Errors produced while loading a driver configuration
#[derive(Debug)]
pub enum ConfigError {
    /// An environment variable held something other than a positive integer
    InvalidEnv {
        var: &'static str,
        value: String,
    },
    /// The TOML document could not be parsed into a configuration
    Toml(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnv { var, value } => {
                write!(f, "Invalid value for {}: expected a positive integer, got {:?}", var, value)
            }
            Self::Toml(e) => write!(f, "Invalid driver configuration: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidEnv { .. } => None,
            Self::Toml(e) => Some(e),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Toml(e)
    }
}
