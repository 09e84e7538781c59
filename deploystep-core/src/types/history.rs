use chrono::{DateTime, Utc};

use crate::types::Status;

/// Scope a baseline must share with the current execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BaselineScope {
    #[serde(rename = "workflowId")]
    pub workflow_id: String,
    #[serde(rename = "serviceId")]
    pub service_id: String,
    #[serde(rename = "infraMappingId")]
    pub infra_mapping_id: String,
    #[serde(rename = "environmentId")]
    pub environment_id: String,
}

/// A finished execution as recorded in history.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExecutionRecord {
    #[serde(rename = "executionId")]
    pub execution_id: String,
    #[serde(flatten)]
    pub scope: BaselineScope,
    pub status: Status,
    /// Whether the execution's verification produced analyzable metrics.
    #[serde(default, rename = "hasAnalysisData")]
    pub has_analysis_data: bool,
    #[serde(rename = "finishedAt")]
    pub finished_at: DateTime<Utc>,
}
