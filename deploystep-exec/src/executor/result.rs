use deploystep_core::{Outcome, RegistryError};
use deploystep_store::StoreError;

/// What became of a delivered result envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryReport {
    /// Unknown, already consumed, or the execution is no longer waiting.
    Ignored,
    /// A RUNNING/QUEUED notification for a pending id.
    Progress,
    /// Accepted; the execution still waits on `remaining` other ids.
    Buffered { remaining: usize },
    /// The last outstanding result arrived and the step was resumed.
    Resumed(Outcome),
}

impl DeliveryReport {
    pub fn outcome(&self) -> Option<&Outcome> {
        match self {
            DeliveryReport::Resumed(outcome) => Some(outcome),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("no active execution with id {0}")]
    UnknownExecution(String),
    #[error("execution {0} is already active")]
    AlreadyActive(String),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
