use chrono::{DateTime, Utc};
use deploystep_core::types::Status;

/// Last status written back for an execution.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StatusUpdate {
    #[serde(rename = "executionId")]
    pub execution_id: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl StatusUpdate {
    pub fn now(execution_id: impl Into<String>, status: Status, message: Option<String>) -> Self {
        Self {
            execution_id: execution_id.into(),
            status,
            message,
            updated_at: Utc::now(),
        }
    }
}
