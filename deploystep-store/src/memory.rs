use async_trait::async_trait;
use dashmap::DashMap;
use deploystep_core::types::{BaselineScope, ExecutionRecord};

use crate::store::{ExecutionStore, StatusUpdate, StoreError};

/// Process-local store. History is sharded by baseline scope.
#[derive(Default)]
pub struct InMemoryExecutionStore {
    history: DashMap<BaselineScope, Vec<ExecutionRecord>>,
    statuses: DashMap<String, StatusUpdate>,
}

impl InMemoryExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = ExecutionRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store
                .history
                .entry(record.scope.clone())
                .or_default()
                .push(record);
        }
        store
    }

    /// Load history from a JSON array of execution records.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let records: Vec<ExecutionRecord> = serde_json::from_str(json)?;
        Ok(Self::from_records(records))
    }

    pub fn status_count(&self) -> usize {
        self.statuses.len()
    }
}

#[async_trait]
impl ExecutionStore for InMemoryExecutionStore {
    async fn record_execution(&self, record: ExecutionRecord) -> Result<(), StoreError> {
        self.history
            .entry(record.scope.clone())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn list_executions(
        &self,
        scope: &BaselineScope,
    ) -> Result<Vec<ExecutionRecord>, StoreError> {
        Ok(self
            .history
            .get(scope)
            .map(|records| records.clone())
            .unwrap_or_default())
    }

    async fn write_status(&self, update: StatusUpdate) -> Result<(), StoreError> {
        self.statuses.insert(update.execution_id.clone(), update);
        Ok(())
    }

    async fn get_status(&self, execution_id: &str) -> Result<Option<StatusUpdate>, StoreError> {
        Ok(self.statuses.get(execution_id).map(|s| s.clone()))
    }
}
