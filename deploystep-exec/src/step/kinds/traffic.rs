use std::collections::BTreeMap;

use async_trait::async_trait;
use deploystep_core::flags::RELAXED_TRAFFIC_SHIFT;
use deploystep_core::selection::check_traffic_shift;
use deploystep_core::types::FailureType;
use deploystep_core::{CorrelationId, Outcome, ResultEnvelope, StepError};
use serde_json::json;

use crate::step::kinds::{remote_task, require, single_payload, unexpected_phase};
use crate::step::{Step, StepContext, StepOutcome};

pub const TASK_TRAFFIC_SHIFT: &str = "traffic.shift";

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ShiftTrafficConfig {
    /// Load balancer or service receiving the new weights.
    pub service: String,
    /// Expression rendering to the percentage of traffic routed to the new version.
    pub percent: String,
    #[serde(default, rename = "timeoutMs", skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShiftPhase {
    #[default]
    Pending,
    Shifting,
    Done,
}

#[derive(Debug)]
pub struct ShiftTrafficStep {
    config: ShiftTrafficConfig,
    phase: ShiftPhase,
    percent: Option<u32>,
}

impl ShiftTrafficStep {
    pub fn new(config: ShiftTrafficConfig) -> Self {
        Self {
            config,
            phase: ShiftPhase::Pending,
            percent: None,
        }
    }

    pub fn phase(&self) -> ShiftPhase {
        self.phase
    }
}

pub(crate) fn parse_percent(rendered: &str) -> Result<u32, StepError> {
    let value = rendered.trim();
    value.parse::<u32>().map_err(|_| {
        StepError::user_input(format!(
            "Traffic percentage must be a non-negative integer, got '{value}'"
        ))
    })
}

#[async_trait]
impl Step for ShiftTrafficStep {
    fn kind(&self) -> &'static str {
        "shift_traffic"
    }

    async fn begin(&mut self, ctx: &StepContext<'_>) -> Result<StepOutcome, StepError> {
        let percent = parse_percent(&ctx.render(&self.config.percent))?;
        if let Err(e) = check_traffic_shift(percent, ctx.rules, ctx.flag(RELAXED_TRAFFIC_SHIFT)) {
            return Ok(StepOutcome::Done(
                Outcome::failed(e.to_string()).with_failure_type(FailureType::Rejected),
            ));
        }
        let service = require(
            ctx.render(&self.config.service),
            "Traffic shift target service must not be blank",
        )?;

        let task = remote_task(
            ctx,
            TASK_TRAFFIC_SHIFT,
            json!({ "service": service, "percent": percent }),
            self.config.timeout_ms,
        );
        self.percent = Some(percent);
        self.phase = ShiftPhase::Shifting;
        Ok(StepOutcome::Await(vec![task]))
    }

    async fn resume(
        &mut self,
        _ctx: &StepContext<'_>,
        results: BTreeMap<CorrelationId, ResultEnvelope>,
    ) -> Result<StepOutcome, StepError> {
        if self.phase != ShiftPhase::Shifting {
            return Err(unexpected_phase(self.kind(), self.phase));
        }
        let result = single_payload(results)?;
        self.phase = ShiftPhase::Done;
        Ok(StepOutcome::Done(Outcome::success().with_payload(json!({
            "percent": self.percent,
            "result": result,
        }))))
    }

    fn cleanup(&mut self, _ctx: &StepContext<'_>) {
        self.phase = ShiftPhase::Pending;
        self.percent = None;
    }
}
