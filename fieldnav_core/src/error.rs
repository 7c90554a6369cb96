//! Error types for the fieldnav stack.

use std::sync::PoisonError;
use thiserror::Error;

/// Errors raised by the navigation runtime and its collaborators.
#[derive(Debug, Error)]
pub enum NavError {
    /// Configuration value rejected before the first tick
    #[error("Configuration error: {0}")]
    Config(String),

    /// A waypoint that cannot be navigated to (non-finite coordinate)
    #[error("Invalid waypoint {index} of {len}: {reason}")]
    InvalidWaypoint {
        index: usize,
        len: usize,
        reason: String,
    },

    /// Mission with nothing to do
    #[error("Degenerate mission: {0}")]
    DegenerateMission(String),

    /// Transport or driver failure
    #[error("Hardware fault: {0}")]
    Hardware(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result alias used across fieldnav crates
pub type NavResult<T> = Result<T, NavError>;

impl NavError {
    /// True for conditions that must end the mission
    pub fn is_fatal(&self) -> bool {
        matches!(self, NavError::Hardware(_) | NavError::Internal(_))
    }

    pub fn config(msg: impl Into<String>) -> Self {
        NavError::Config(msg.into())
    }

    pub fn hardware(msg: impl Into<String>) -> Self {
        NavError::Hardware(msg.into())
    }
}

impl From<serde_json::Error> for NavError {
    fn from(err: serde_json::Error) -> Self {
        NavError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for NavError {
    fn from(err: serde_yaml::Error) -> Self {
        NavError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for NavError {
    fn from(err: toml::de::Error) -> Self {
        NavError::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for NavError {
    fn from(err: toml::ser::Error) -> Self {
        NavError::Serialization(err.to_string())
    }
}

impl<T> From<PoisonError<T>> for NavError {
    fn from(err: PoisonError<T>) -> Self {
        NavError::Internal(format!("Lock poisoned: {}", err))
    }
}
