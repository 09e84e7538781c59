use std::time::Duration;

use deploystep_core::types::{BaselineScope, Variables};
use deploystep_core::{ExpressionRenderer, FeatureFlags, Instance, SelectionRules};
use deploystep_store::ExecutionStore;

/// Per-execution input supplied by the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExecutionContext {
    #[serde(rename = "executionId")]
    pub execution_id: String,
    #[serde(default, rename = "accountId")]
    pub account_id: String,
    #[serde(flatten)]
    pub scope: BaselineScope,
    #[serde(default)]
    pub variables: Variables,
    /// Known instance pool of the target infrastructure.
    #[serde(default)]
    pub instances: Vec<Instance>,
    #[serde(default, rename = "routingTags")]
    pub routing_tags: Vec<String>,
    #[serde(default, rename = "timeoutMs", skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ExecutionContext {
    pub fn new(execution_id: impl Into<String>) -> Self {
        Self {
            execution_id: execution_id.into(),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.filter(|ms| *ms > 0).map(Duration::from_millis)
    }
}

/// Borrowed view handed to every step call.
pub struct StepContext<'a> {
    pub execution: &'a ExecutionContext,
    pub renderer: &'a dyn ExpressionRenderer,
    pub flags: &'a dyn FeatureFlags,
    pub store: &'a dyn ExecutionStore,
    pub rules: &'a SelectionRules,
    /// 1-based attempt number.
    pub attempt: usize,
}

impl StepContext<'_> {
    pub fn flag(&self, name: &str) -> bool {
        self.flags.is_enabled(name, &self.execution.account_id)
    }

    pub fn render(&self, expr: &str) -> String {
        self.renderer.render(expr)
    }

    pub fn execution_id(&self) -> &str {
        &self.execution.execution_id
    }
}
