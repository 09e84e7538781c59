use std::collections::BTreeMap;

use async_trait::async_trait;
use deploystep_core::flags::{INLINE_HOSTS, RELAXED_TRAFFIC_SHIFT};
use deploystep_core::types::{CountUnit, FailureType, PhaseStyle, PoolProvisioning};
use deploystep_core::{
    CorrelationId, NodeSelector, Outcome, ResultEnvelope, SelectionRequest, SelectionResult,
    StepError,
};

use crate::step::kinds::traffic::parse_percent;
use crate::step::{Step, StepContext, StepOutcome};

const MSG_NOTHING_SELECTED: &str = "No instances were selected";

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SelectNodesConfig {
    /// Expression rendering to a non-negative integer. Ignored when hosts are given.
    #[serde(default, rename = "instanceCount")]
    pub instance_count: String,
    #[serde(default = "default_unit")]
    pub unit: CountUnit,
    #[serde(default, rename = "specificHosts", skip_serializing_if = "Option::is_none")]
    pub specific_hosts: Option<Vec<String>>,
    #[serde(default)]
    pub phase: PhaseStyle,
    #[serde(default, rename = "excludeInstanceIds")]
    pub exclude_instance_ids: Vec<String>,
    #[serde(default)]
    pub provisioning: PoolProvisioning,
    #[serde(default, rename = "priorTargets")]
    pub prior_targets: Vec<String>,
    /// When set, the traffic-shift guard runs before selection.
    #[serde(default, rename = "trafficPercent", skip_serializing_if = "Option::is_none")]
    pub traffic_percent: Option<String>,
}

fn default_unit() -> CountUnit {
    CountUnit::Count
}

/// Synchronous step: picks the instances the next phase acts on.
#[derive(Debug)]
pub struct SelectNodesStep {
    config: SelectNodesConfig,
    result: Option<SelectionResult>,
}

impl SelectNodesStep {
    pub fn new(config: SelectNodesConfig) -> Self {
        Self {
            config,
            result: None,
        }
    }

    pub fn result(&self) -> Option<&SelectionResult> {
        self.result.as_ref()
    }

    fn request(&self, ctx: &StepContext<'_>) -> Result<SelectionRequest, StepError> {
        let desired_count = match &self.config.specific_hosts {
            Some(_) => 0,
            None => parse_instance_count(&ctx.render(&self.config.instance_count))?,
        };
        Ok(SelectionRequest {
            desired_count,
            unit: self.config.unit,
            specific_hosts: self.config.specific_hosts.clone(),
            exclude_instance_ids: self.config.exclude_instance_ids.clone(),
            provisioning: self.config.provisioning,
            prior_targets: self.config.prior_targets.clone(),
        })
    }
}

/// Parse a rendered instance-count expression.
pub fn parse_instance_count(rendered: &str) -> Result<u32, StepError> {
    let value = rendered.trim();
    if value.is_empty() {
        return Err(StepError::user_input("Instance count must not be blank"));
    }
    value.parse::<u32>().map_err(|_| {
        StepError::user_input(format!(
            "Instance count must be a non-negative integer, got '{value}'"
        ))
    })
}

fn selection_outcome(result: &SelectionResult, explicit_hosts: bool) -> Result<Outcome, StepError> {
    let message = result.error_message.as_deref();
    if result.rejected {
        return Ok(Outcome::failed(message.unwrap_or(MSG_NOTHING_SELECTED))
            .with_failure_type(FailureType::Rejected));
    }
    // An explicitly named host that cannot be found is always fatal.
    let missing_hosts = explicit_hosts && message.is_some();
    if missing_hosts || (result.is_empty() && (result.target_count > 0 || message.is_some())) {
        return Ok(Outcome::failed(message.unwrap_or(MSG_NOTHING_SELECTED)));
    }
    Ok(Outcome::success().with_payload(serde_json::to_value(result)?))
}

#[async_trait]
impl Step for SelectNodesStep {
    fn kind(&self) -> &'static str {
        "select_nodes"
    }

    async fn begin(&mut self, ctx: &StepContext<'_>) -> Result<StepOutcome, StepError> {
        let request = self.request(ctx)?;
        let selector = NodeSelector::new(ctx.renderer, ctx.rules)
            .allow_inline_hosts(ctx.flag(INLINE_HOSTS))
            .relaxed_traffic_shift(ctx.flag(RELAXED_TRAFFIC_SHIFT));
        let pool = &ctx.execution.instances;

        let result = match &self.config.traffic_percent {
            Some(expr) => {
                let percent = parse_percent(&ctx.render(expr))?;
                selector.select_for_traffic_shift(pool, &request, self.config.phase, percent)
            }
            None => selector.select(pool, &request, self.config.phase),
        };

        tracing::debug!(
            execution_id = %ctx.execution_id(),
            selected = result.selected.len(),
            target = result.target_count,
            rejected = result.rejected,
            "node selection finished"
        );

        let outcome = selection_outcome(&result, request.specific_hosts.is_some())?;
        self.result = Some(result);
        Ok(StepOutcome::Done(outcome))
    }

    async fn resume(
        &mut self,
        _ctx: &StepContext<'_>,
        _results: BTreeMap<CorrelationId, ResultEnvelope>,
    ) -> Result<StepOutcome, StepError> {
        Err(StepError::internal(
            "node selection does not wait on remote results",
        ))
    }

    fn cleanup(&mut self, _ctx: &StepContext<'_>) {
        self.result = None;
    }
}
