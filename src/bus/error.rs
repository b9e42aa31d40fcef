use thiserror::Error;

use crate::bus::types::Role;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("{operation} called on a bus bound to the {role} role")]
    RoleViolation { operation: &'static str, role: Role },

    #[error("Unknown bus kind: {0}")]
    UnknownKind(String),

    #[error("Invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Failed to bind {endpoint}: {source}")]
    Bind {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Bus closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BusError {
    /// Errors that mean the run was misconfigured rather than hit a transient fault.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            BusError::UnknownKind(_)
                | BusError::InvalidEndpoint { .. }
                | BusError::Bind { .. }
                | BusError::Connect { .. }
        )
    }
}

pub type BusResult<T> = Result<T, BusError>;
