use std::collections::BTreeMap;

use async_trait::async_trait;
use deploystep_core::{CorrelationId, Instance, Outcome, ResultEnvelope, StepError};
use serde_json::json;

use crate::step::kinds::{remote_task, require, single_payload, unexpected_phase};
use crate::step::{Step, StepContext, StepOutcome};

pub const TASK_INFRA_PROVISION: &str = "infra.provision";

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProvisionInfraConfig {
    pub provider: String,
    pub template: String,
    /// Values are expressions rendered before submission.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default, rename = "timeoutMs", skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProvisionPhase {
    #[default]
    Pending,
    Provisioning,
    Done,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProvisionData {
    pub phase: ProvisionPhase,
    pub activity_id: Option<String>,
    pub instances: Vec<Instance>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct ProvisionResult {
    #[serde(default)]
    instances: Vec<Instance>,
}

#[derive(Debug)]
pub struct ProvisionInfraStep {
    config: ProvisionInfraConfig,
    data: ProvisionData,
}

impl ProvisionInfraStep {
    pub fn new(config: ProvisionInfraConfig) -> Self {
        Self {
            config,
            data: ProvisionData::default(),
        }
    }

    pub fn data(&self) -> &ProvisionData {
        &self.data
    }
}

#[async_trait]
impl Step for ProvisionInfraStep {
    fn kind(&self) -> &'static str {
        "provision_infra"
    }

    async fn begin(&mut self, ctx: &StepContext<'_>) -> Result<StepOutcome, StepError> {
        let provider = require(
            ctx.render(&self.config.provider),
            "Infrastructure provider must not be blank",
        )?;
        let template = require(
            ctx.render(&self.config.template),
            "Provisioning template must not be blank",
        )?;
        let parameters: BTreeMap<&str, String> = self
            .config
            .parameters
            .iter()
            .map(|(k, v)| (k.as_str(), ctx.render(v)))
            .collect();

        let activity_id = uuid::Uuid::new_v4().to_string();
        let task = remote_task(
            ctx,
            TASK_INFRA_PROVISION,
            json!({
                "activityId": activity_id,
                "provider": provider,
                "template": template,
                "parameters": parameters,
            }),
            self.config.timeout_ms,
        );

        self.data.activity_id = Some(activity_id);
        self.data.phase = ProvisionPhase::Provisioning;
        Ok(StepOutcome::Await(vec![task]))
    }

    async fn resume(
        &mut self,
        _ctx: &StepContext<'_>,
        results: BTreeMap<CorrelationId, ResultEnvelope>,
    ) -> Result<StepOutcome, StepError> {
        if self.data.phase != ProvisionPhase::Provisioning {
            return Err(unexpected_phase(self.kind(), self.data.phase));
        }
        let payload = single_payload(results)?;
        let result: ProvisionResult = if payload.is_null() {
            ProvisionResult::default()
        } else {
            serde_json::from_value(payload)?
        };
        self.data.instances = result.instances;
        self.data.phase = ProvisionPhase::Done;

        Ok(StepOutcome::Done(Outcome::success().with_payload(json!({
            "activityId": self.data.activity_id,
            "instances": self.data.instances,
        }))))
    }

    async fn on_abort(&mut self, ctx: &StepContext<'_>) {
        tracing::info!(
            execution_id = %ctx.execution_id(),
            activity_id = self.data.activity_id.as_deref().unwrap_or(""),
            "provisioning aborted; the remote activity may still complete"
        );
    }

    fn cleanup(&mut self, _ctx: &StepContext<'_>) {
        self.data = ProvisionData::default();
    }
}
