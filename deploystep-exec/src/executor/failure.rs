use deploystep_core::types::FailureType;
use deploystep_core::{Outcome, StepError};

pub const MSG_INTERNAL: &str = "Internal error while executing step";
pub const MSG_REMOTE_FAILED: &str = "Remote execution failed";

/// Map a step failure onto its terminal outcome.
///
/// Internal errors are logged in full here; callers only see the generic message.
pub fn classify(err: &StepError, execution_id: &str, step_kind: &str) -> Outcome {
    match err {
        StepError::UserInput(msg) => Outcome::failed(msg.clone()),
        StepError::RemoteExecution(msg) if msg.trim().is_empty() => {
            Outcome::failed(MSG_REMOTE_FAILED)
        }
        StepError::RemoteExecution(msg) => Outcome::failed(msg.clone()),
        StepError::Timeout(msg) => {
            Outcome::failed(msg.clone()).with_failure_type(FailureType::Timeout)
        }
        StepError::Internal(_) => {
            tracing::error!(
                execution_id = %execution_id,
                step_kind = %step_kind,
                error = ?err,
                "step failed with an internal error"
            );
            Outcome::error(MSG_INTERNAL)
        }
    }
}
