use async_trait::async_trait;
use deploystep_core::{CorrelationId, RemoteTaskHandle};
use tokio::sync::mpsc;

use crate::delegate::{RemoteExecutor, SubmitError};

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutorMessage {
    Submit(RemoteTaskHandle),
    Cancel(Vec<CorrelationId>),
}

/// Hands tasks to an in-process worker over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelExecutor {
    tx: mpsc::UnboundedSender<ExecutorMessage>,
}

impl ChannelExecutor {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ExecutorMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl RemoteExecutor for ChannelExecutor {
    async fn submit(&self, task: RemoteTaskHandle) -> Result<(), SubmitError> {
        self.tx
            .send(ExecutorMessage::Submit(task))
            .map_err(|_| SubmitError::Unavailable("worker channel closed".to_string()))
    }

    async fn cancel(&self, ids: &[CorrelationId]) -> Result<(), SubmitError> {
        self.tx
            .send(ExecutorMessage::Cancel(ids.to_vec()))
            .map_err(|_| SubmitError::Unavailable("worker channel closed".to_string()))
    }
}
