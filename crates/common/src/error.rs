//! Common error types for the mesh health components.

use std::fmt;

/// A specialized Result type for registry and monitor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type.
///
/// Probe failures never appear here; the executor turns them into probe
/// outcomes.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    Invalid(String),
}

impl Error {
    /// Create a not-found error for a service instance.
    pub fn instance_not_found(service_id: impl Into<String>) -> Self {
        Error::NotFound {
            kind: "service instance",
            id: service_id.into(),
        }
    }

    /// Create a not-found error for a health report.
    pub fn report_not_found(service_id: impl Into<String>) -> Self {
        Error::NotFound {
            kind: "health report",
            id: service_id.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config(msg: impl fmt::Display) -> Self {
        Error::Config(msg.to_string())
    }

    /// Create a new invalid-request error.
    pub fn invalid(msg: impl fmt::Display) -> Self {
        Error::Invalid(msg.to_string())
    }

    /// Whether this is a not-found lookup failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
