use thiserror::Error;

use crate::types::CorrelationId;

/// Failure raised by a step while beginning or resuming.
///
/// The variant decides the terminal status the runner assigns: everything is
/// `FAILED` except `Internal`, which becomes `ERROR`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    /// Missing or invalid configuration. Shown verbatim to the operator.
    #[error("{0}")]
    UserInput(String),
    /// The external executor reported failure.
    #[error("{0}")]
    RemoteExecution(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error("timed out: {0}")]
    Timeout(String),
}

impl StepError {
    pub fn user_input(msg: impl Into<String>) -> Self {
        Self::UserInput(msg.into())
    }

    pub fn remote(msg: impl Into<String>) -> Self {
        Self::RemoteExecution(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn failure_class(&self) -> FailureClass {
        match self {
            StepError::UserInput(_) => FailureClass::UserInput,
            StepError::RemoteExecution(_) => FailureClass::Remote,
            StepError::Internal(_) => FailureClass::Internal,
            StepError::Timeout(_) => FailureClass::Timeout,
        }
    }
}

impl From<serde_json::Error> for StepError {
    fn from(e: serde_json::Error) -> Self {
        StepError::Internal(format!("malformed step payload: {e}"))
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    UserInput,
    Remote,
    Internal,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("correlation id {0} is already awaiting a result")]
    AlreadyRegistered(CorrelationId),
    #[error("correlation id {0} was already consumed and cannot be reused")]
    Retired(CorrelationId),
}
