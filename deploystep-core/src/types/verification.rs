use crate::types::Status;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Na,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tolerance {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComparisonStrategy {
    /// Compare against a prior successful execution.
    #[default]
    CompareWithPrevious,
    /// Compare canary hosts against control hosts of the same run.
    CompareWithCurrent,
}

/// Lenient mode tolerates "no data"; strict mode fails on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMode {
    #[default]
    Lenient,
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct MetricAnalysis {
    #[serde(default, rename = "perMetricRisk")]
    pub per_metric_risk: Vec<RiskLevel>,
}

impl MetricAnalysis {
    pub fn new(per_metric_risk: Vec<RiskLevel>) -> Self {
        Self { per_metric_risk }
    }

    pub fn has_analyzable_data(&self) -> bool {
        self.per_metric_risk.iter().any(|r| *r != RiskLevel::Na)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VerificationContext {
    #[serde(default, rename = "comparisonStrategy")]
    pub comparison_strategy: ComparisonStrategy,
    #[serde(default)]
    pub tolerance: Tolerance,
    #[serde(default)]
    pub mode: VerificationMode,
    #[serde(default, rename = "baselineExecutionId", skip_serializing_if = "Option::is_none")]
    pub baseline_execution_id: Option<String>,
    #[serde(default, rename = "currentAnalysis")]
    pub current_analysis: MetricAnalysis,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Verdict {
    pub status: Status,
    pub reason: String,
}
