use async_trait::async_trait;
use deploystep_core::types::{BaselineScope, ExecutionRecord};

use crate::store::types::StatusUpdate;

#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Append a finished execution to history.
    async fn record_execution(&self, record: ExecutionRecord) -> Result<(), StoreError>;

    /// All recorded executions sharing `scope`, in insertion order.
    async fn list_executions(&self, scope: &BaselineScope)
        -> Result<Vec<ExecutionRecord>, StoreError>;

    /// Overwrite the externally visible status of an execution.
    async fn write_status(&self, update: StatusUpdate) -> Result<(), StoreError>;

    async fn get_status(&self, execution_id: &str) -> Result<Option<StatusUpdate>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store error: {0}")]
    Other(String),
    #[error("malformed history: {0}")]
    Malformed(#[from] serde_json::Error),
}
