use std::collections::BTreeMap;

use async_trait::async_trait;
use deploystep_core::types::Payload;
use deploystep_core::{CorrelationId, Outcome, ResultEnvelope, StepError};
use serde_json::json;

use crate::step::kinds::{remote_task, require, single_payload, unexpected_phase};
use crate::step::{Step, StepContext, StepOutcome};

pub const TASK_ARTIFACT_COLLECT: &str = "artifact.collect";

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CollectArtifactConfig {
    /// Artifact server or stream name.
    #[serde(rename = "sourceName")]
    pub source_name: String,
    #[serde(rename = "jobName")]
    pub job_name: String,
    #[serde(default, rename = "buildNumber", skip_serializing_if = "Option::is_none")]
    pub build_number: Option<String>,
    #[serde(default, rename = "timeoutMs", skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArtifactPhase {
    #[default]
    Pending,
    Collecting,
    Done,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactData {
    pub phase: ArtifactPhase,
    pub artifact: Option<Payload>,
}

#[derive(Debug)]
pub struct CollectArtifactStep {
    config: CollectArtifactConfig,
    data: ArtifactData,
}

impl CollectArtifactStep {
    pub fn new(config: CollectArtifactConfig) -> Self {
        Self {
            config,
            data: ArtifactData::default(),
        }
    }

    pub fn data(&self) -> &ArtifactData {
        &self.data
    }
}

#[async_trait]
impl Step for CollectArtifactStep {
    fn kind(&self) -> &'static str {
        "collect_artifact"
    }

    async fn begin(&mut self, ctx: &StepContext<'_>) -> Result<StepOutcome, StepError> {
        let source = require(
            ctx.render(&self.config.source_name),
            "Artifact source must not be blank",
        )?;
        let job = require(ctx.render(&self.config.job_name), "Artifact job name must not be blank")?;
        let build = self
            .config
            .build_number
            .as_deref()
            .map(|b| ctx.render(b))
            .filter(|b| !b.trim().is_empty());

        let task = remote_task(
            ctx,
            TASK_ARTIFACT_COLLECT,
            json!({ "source": source, "job": job, "buildNumber": build }),
            self.config.timeout_ms,
        );
        self.data.phase = ArtifactPhase::Collecting;
        Ok(StepOutcome::Await(vec![task]))
    }

    async fn resume(
        &mut self,
        _ctx: &StepContext<'_>,
        results: BTreeMap<CorrelationId, ResultEnvelope>,
    ) -> Result<StepOutcome, StepError> {
        if self.data.phase != ArtifactPhase::Collecting {
            return Err(unexpected_phase(self.kind(), self.data.phase));
        }
        let artifact = single_payload(results)?;
        self.data.artifact = Some(artifact.clone());
        self.data.phase = ArtifactPhase::Done;
        Ok(StepOutcome::Done(
            Outcome::success().with_payload(json!({ "artifact": artifact })),
        ))
    }

    fn cleanup(&mut self, _ctx: &StepContext<'_>) {
        self.data = ArtifactData::default();
    }
}
