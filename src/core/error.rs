use super::ActivityToken;
use crate::record::ActivityState;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Illegal transition for {token}: {from} -> {to}")]
    InvalidTransition {
        token: ActivityToken,
        from: ActivityState,
        to: ActivityState,
    },

    #[error("Host process '{0}' unavailable")]
    HostUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Worker join error: {0}")]
    WorkerJoin(String),
}

pub type Result<T> = std::result::Result<T, LifecycleError>;

impl From<std::io::Error> for LifecycleError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LifecycleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
