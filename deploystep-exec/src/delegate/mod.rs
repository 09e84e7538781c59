//! Outbound side of the suspend/resume protocol.

mod channel;

pub use channel::{ChannelExecutor, ExecutorMessage};

use async_trait::async_trait;
use deploystep_core::{CorrelationId, RemoteTaskHandle};

#[derive(Debug, Clone, thiserror::Error)]
pub enum SubmitError {
    #[error("remote executor is unavailable: {0}")]
    Unavailable(String),
    #[error("remote executor rejected task {id}: {reason}")]
    Rejected { id: CorrelationId, reason: String },
}

/// Something that runs tasks away from the runner and later reports back
/// through `StepRunner::deliver`.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    async fn submit(&self, task: RemoteTaskHandle) -> Result<(), SubmitError>;

    /// Best-effort: results that still arrive for these ids are discarded anyway.
    async fn cancel(&self, ids: &[CorrelationId]) -> Result<(), SubmitError>;
}
