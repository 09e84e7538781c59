//! Deployment step kinds. Each owns its StepData with an explicit `phase`.

mod artifact;
mod infra;
mod script;
mod select;
mod traffic;
mod verify;

pub use artifact::{ArtifactData, ArtifactPhase, CollectArtifactConfig, CollectArtifactStep};
pub use infra::{ProvisionData, ProvisionInfraConfig, ProvisionInfraStep, ProvisionPhase};
pub use script::{GitSource, RunScriptConfig, RunScriptStep, ScriptData, ScriptPhase, ScriptShell};
pub use select::{parse_instance_count, SelectNodesConfig, SelectNodesStep};
pub use traffic::{ShiftPhase, ShiftTrafficConfig, ShiftTrafficStep};
pub use verify::{VerifyConfig, VerifyData, VerifyPhase, VerifyStep};

use std::collections::BTreeMap;

use async_trait::async_trait;
use deploystep_core::types::{Payload, RemoteStatus};
use deploystep_core::{CorrelationId, RemoteTaskHandle, ResultEnvelope, StepError};

use crate::step::{Step, StepContext, StepOutcome};

pub const DEFAULT_TASK_TIMEOUT_MS: u64 = 10 * 60 * 1000;

/// Serialized form of a step as it appears in a plan.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepSpec {
    CollectArtifact(CollectArtifactConfig),
    ProvisionInfra(ProvisionInfraConfig),
    RunScript(RunScriptConfig),
    SelectNodes(SelectNodesConfig),
    ShiftTraffic(ShiftTrafficConfig),
    Verify(VerifyConfig),
}

/// Closed set of runnable step kinds.
#[derive(Debug)]
pub enum DeploymentStep {
    CollectArtifact(CollectArtifactStep),
    ProvisionInfra(ProvisionInfraStep),
    RunScript(RunScriptStep),
    SelectNodes(SelectNodesStep),
    ShiftTraffic(ShiftTrafficStep),
    Verify(VerifyStep),
}

impl From<StepSpec> for DeploymentStep {
    fn from(spec: StepSpec) -> Self {
        match spec {
            StepSpec::CollectArtifact(c) => Self::CollectArtifact(CollectArtifactStep::new(c)),
            StepSpec::ProvisionInfra(c) => Self::ProvisionInfra(ProvisionInfraStep::new(c)),
            StepSpec::RunScript(c) => Self::RunScript(RunScriptStep::new(c)),
            StepSpec::SelectNodes(c) => Self::SelectNodes(SelectNodesStep::new(c)),
            StepSpec::ShiftTraffic(c) => Self::ShiftTraffic(ShiftTrafficStep::new(c)),
            StepSpec::Verify(c) => Self::Verify(VerifyStep::new(c)),
        }
    }
}

macro_rules! dispatch {
    ($self:expr, $step:ident => $body:expr) => {
        match $self {
            DeploymentStep::CollectArtifact($step) => $body,
            DeploymentStep::ProvisionInfra($step) => $body,
            DeploymentStep::RunScript($step) => $body,
            DeploymentStep::SelectNodes($step) => $body,
            DeploymentStep::ShiftTraffic($step) => $body,
            DeploymentStep::Verify($step) => $body,
        }
    };
}

#[async_trait]
impl Step for DeploymentStep {
    fn kind(&self) -> &'static str {
        dispatch!(self, s => s.kind())
    }

    async fn begin(&mut self, ctx: &StepContext<'_>) -> Result<StepOutcome, StepError> {
        dispatch!(self, s => s.begin(ctx).await)
    }

    async fn resume(
        &mut self,
        ctx: &StepContext<'_>,
        results: BTreeMap<CorrelationId, ResultEnvelope>,
    ) -> Result<StepOutcome, StepError> {
        dispatch!(self, s => s.resume(ctx, results).await)
    }

    async fn on_abort(&mut self, ctx: &StepContext<'_>) {
        dispatch!(self, s => s.on_abort(ctx).await)
    }

    fn cleanup(&mut self, ctx: &StepContext<'_>) {
        dispatch!(self, s => s.cleanup(ctx))
    }
}

pub(crate) fn remote_task(
    ctx: &StepContext<'_>,
    task_type: &str,
    parameters: Payload,
    timeout_ms: Option<u64>,
) -> RemoteTaskHandle {
    RemoteTaskHandle::new(
        task_type,
        parameters,
        timeout_ms.unwrap_or(DEFAULT_TASK_TIMEOUT_MS),
    )
    .with_routing_tags(ctx.execution.routing_tags.clone())
}

/// Unwrap the payload of the single result a one-task leg waits on.
pub(crate) fn single_payload(
    results: BTreeMap<CorrelationId, ResultEnvelope>,
) -> Result<Payload, StepError> {
    if results.len() != 1 {
        return Err(StepError::internal(format!(
            "expected exactly one remote result, got {}",
            results.len()
        )));
    }
    let Some((_, envelope)) = results.into_iter().next() else {
        return Err(StepError::internal("expected exactly one remote result, got 0"));
    };
    match envelope.status {
        RemoteStatus::Success => Ok(envelope.payload),
        _ if envelope.timed_out => Err(StepError::timeout(
            envelope
                .error_message
                .unwrap_or_else(|| "Remote task timed out".to_string()),
        )),
        _ => Err(StepError::remote(envelope.error_message.unwrap_or_default())),
    }
}

pub(crate) fn require(value: String, message: &str) -> Result<String, StepError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StepError::user_input(message));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn unexpected_phase(kind: &str, phase: impl std::fmt::Debug) -> StepError {
    StepError::internal(format!("{kind} step resumed in unexpected phase {phase:?}"))
}
