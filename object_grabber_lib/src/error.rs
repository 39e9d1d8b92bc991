//! Error types for the object grabber client.

use thiserror::Error;

use crate::GoalOutcome;

pub type Result<T> = std::result::Result<T, GrabberError>;

#[derive(Debug, Error)]
pub enum GrabberError {
    /// Goal is missing (or carries unexpected) object id / pose, or has
    /// values the service cannot act on. Never dispatched.
    #[error("invalid goal: {0}")]
    InvalidGoal(String),

    /// Shutdown was requested while waiting on the service.
    #[error("shutdown requested while {0}")]
    Shutdown(String),

    /// The transport could not deliver a request.
    #[error("transport error: {0}")]
    Transport(String),

    /// A step ended in a non-success state and the failure policy aborts.
    #[error("step '{step}' failed: {outcome}")]
    StepFailed { step: String, outcome: GoalOutcome },

    /// A second outcome arrived for a goal that already completed.
    #[error("outcome already recorded for this goal")]
    DuplicateOutcome,

    /// An outcome arrived for a goal that is no longer the one in flight.
    #[error("outcome belongs to a superseded goal")]
    StaleOutcome,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
