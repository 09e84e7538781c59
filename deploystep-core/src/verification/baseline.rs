use crate::types::{BaselineScope, ExecutionRecord, Status};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "source", content = "executionId", rename_all = "snake_case")]
pub enum Baseline {
    /// Pinned by the operator.
    Fixed(String),
    /// Most recent prior successful execution with analyzable data.
    Previous(String),
    /// Nothing to compare against; the current run becomes the baseline.
    None,
}

impl Baseline {
    pub fn execution_id(&self) -> Option<&str> {
        match self {
            Baseline::Fixed(id) | Baseline::Previous(id) => Some(id),
            Baseline::None => None,
        }
    }
}

/// Resolve the baseline execution. First match wins:
/// a fixed id, then the latest successful in-scope execution that produced
/// analyzable data, then no baseline.
///
/// Ties on `finished_at` are broken by the larger execution id so repeated
/// calls over the same history agree.
pub fn resolve_baseline(
    fixed: Option<&str>,
    history: &[ExecutionRecord],
    scope: &BaselineScope,
    current_execution_id: Option<&str>,
) -> Baseline {
    if let Some(id) = fixed.map(str::trim).filter(|id| !id.is_empty()) {
        return Baseline::Fixed(id.to_string());
    }

    history
        .iter()
        .filter(|r| &r.scope == scope)
        .filter(|r| r.status == Status::Success && r.has_analysis_data)
        .filter(|r| Some(r.execution_id.as_str()) != current_execution_id)
        .max_by(|a, b| {
            a.finished_at
                .cmp(&b.finished_at)
                .then_with(|| a.execution_id.cmp(&b.execution_id))
        })
        .map(|r| Baseline::Previous(r.execution_id.clone()))
        .unwrap_or(Baseline::None)
}
