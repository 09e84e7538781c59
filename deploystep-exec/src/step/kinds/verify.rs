use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use deploystep_core::types::{
    ComparisonStrategy, ExecutionRecord, MetricAnalysis, RiskLevel, Status, Tolerance, Verdict,
    VerificationContext, VerificationMode,
};
use deploystep_core::verification::{decide_verdict, MSG_NO_BASELINE};
use deploystep_core::{
    evaluate, resolve_baseline, Baseline, CorrelationId, Outcome, RemoteTaskHandle,
    ResultEnvelope, StepError,
};
use serde_json::json;

use crate::step::kinds::{remote_task, require, single_payload, unexpected_phase};
use crate::step::{Step, StepContext, StepOutcome};

pub const TASK_VERIFICATION_COLLECT: &str = "verification.collect";

fn default_windows() -> u32 {
    1
}

fn default_window_minutes() -> u32 {
    5
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VerifyConfig {
    /// Metrics or log provider queried by the remote collector.
    pub provider: String,
    #[serde(default)]
    pub strategy: ComparisonStrategy,
    #[serde(default)]
    pub tolerance: Tolerance,
    #[serde(default)]
    pub mode: VerificationMode,
    /// Pins the baseline instead of looking one up in history.
    #[serde(default, rename = "baselineExecutionId", skip_serializing_if = "Option::is_none")]
    pub baseline_execution_id: Option<String>,
    #[serde(default = "default_windows")]
    pub windows: u32,
    #[serde(default = "default_window_minutes", rename = "windowMinutes")]
    pub window_minutes: u32,
    #[serde(default, rename = "timeoutMs", skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifyPhase {
    #[default]
    Pending,
    Collecting { window: u32 },
    Done,
}

/// Accumulated across collection windows; discarded by `cleanup`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerifyData {
    pub phase: VerifyPhase,
    pub baseline: Option<Baseline>,
    pub risks: Vec<RiskLevel>,
    pub verdict: Option<Verdict>,
}

/// Collects metric analyses window by window, then decides a verdict.
#[derive(Debug)]
pub struct VerifyStep {
    config: VerifyConfig,
    data: VerifyData,
}

impl VerifyStep {
    pub fn new(config: VerifyConfig) -> Self {
        Self {
            config,
            data: VerifyData::default(),
        }
    }

    pub fn data(&self) -> &VerifyData {
        &self.data
    }

    fn window_task(
        &self,
        ctx: &StepContext<'_>,
        window: u32,
    ) -> Result<RemoteTaskHandle, StepError> {
        let provider = require(
            ctx.render(&self.config.provider),
            "Verification provider must not be blank",
        )?;
        let hosts: Vec<&str> = ctx
            .execution
            .instances
            .iter()
            .map(|i| i.host_name.as_str())
            .collect();
        let baseline = self.data.baseline.as_ref().and_then(Baseline::execution_id);
        Ok(remote_task(
            ctx,
            TASK_VERIFICATION_COLLECT,
            json!({
                "provider": provider,
                "strategy": self.config.strategy,
                "window": window,
                "windowMinutes": self.config.window_minutes,
                "baselineExecutionId": baseline,
                "hosts": hosts,
            }),
            self.config.timeout_ms,
        ))
    }

    async fn resolve(&self, ctx: &StepContext<'_>) -> Result<Baseline, StepError> {
        if self.config.strategy == ComparisonStrategy::CompareWithCurrent {
            return Ok(Baseline::None);
        }
        let fixed = self
            .config
            .baseline_execution_id
            .as_deref()
            .map(|b| ctx.render(b));
        let scope = &ctx.execution.scope;
        let history = ctx.store.list_executions(scope).await.map_err(|e| {
            StepError::internal(format!("failed to load execution history: {e}"))
        })?;
        Ok(resolve_baseline(
            fixed.as_deref(),
            &history,
            scope,
            Some(ctx.execution_id()),
        ))
    }

    async fn decide(&mut self, ctx: &StepContext<'_>) -> Outcome {
        let baseline = self.data.baseline.clone().unwrap_or(Baseline::None);
        let analysis = MetricAnalysis::new(self.data.risks.clone());
        let verdict = evaluate(&VerificationContext {
            comparison_strategy: self.config.strategy,
            tolerance: self.config.tolerance,
            mode: self.config.mode,
            baseline_execution_id: baseline.execution_id().map(str::to_string),
            current_analysis: analysis.clone(),
        });

        // Without a baseline the verdict says nothing about the data itself;
        // judge it on its own so an acceptable run becomes the next baseline.
        let recorded_status = if verdict.reason == MSG_NO_BASELINE {
            decide_verdict(&analysis, self.config.tolerance, self.config.mode).status
        } else {
            verdict.status
        };
        let record = ExecutionRecord {
            execution_id: ctx.execution_id().to_string(),
            scope: ctx.execution.scope.clone(),
            status: recorded_status,
            has_analysis_data: analysis.has_analyzable_data(),
            finished_at: Utc::now(),
        };
        if let Err(e) = ctx.store.record_execution(record).await {
            tracing::warn!(
                execution_id = %ctx.execution_id(),
                error = %e,
                "failed to record verification in history"
            );
        }

        let payload = json!({
            "baseline": baseline,
            "perMetricRisk": analysis.per_metric_risk,
            "verdict": verdict,
        });
        let outcome = match verdict.status {
            Status::Failed => Outcome::failed(verdict.reason.clone()),
            Status::Skipped => Outcome::skipped(verdict.reason.clone()),
            _ => Outcome::success(),
        };
        self.data.verdict = Some(verdict);
        self.data.phase = VerifyPhase::Done;
        outcome.with_payload(payload)
    }
}

#[async_trait]
impl Step for VerifyStep {
    fn kind(&self) -> &'static str {
        "verify"
    }

    async fn begin(&mut self, ctx: &StepContext<'_>) -> Result<StepOutcome, StepError> {
        if self.config.windows == 0 {
            return Err(StepError::user_input(
                "Verification must collect at least one window",
            ));
        }
        let baseline = self.resolve(ctx).await?;
        tracing::debug!(
            execution_id = %ctx.execution_id(),
            baseline = baseline.execution_id().unwrap_or("none"),
            "verification baseline resolved"
        );
        self.data.baseline = Some(baseline);

        let task = self.window_task(ctx, 1)?;
        self.data.phase = VerifyPhase::Collecting { window: 1 };
        Ok(StepOutcome::Await(vec![task]))
    }

    async fn resume(
        &mut self,
        ctx: &StepContext<'_>,
        results: BTreeMap<CorrelationId, ResultEnvelope>,
    ) -> Result<StepOutcome, StepError> {
        let VerifyPhase::Collecting { window } = self.data.phase else {
            return Err(unexpected_phase(self.kind(), self.data.phase));
        };

        let payload = single_payload(results)?;
        let analysis: MetricAnalysis = if payload.is_null() {
            MetricAnalysis::default()
        } else {
            serde_json::from_value(payload)?
        };
        self.data.risks.extend(analysis.per_metric_risk);

        if window < self.config.windows {
            let next = window + 1;
            let task = self.window_task(ctx, next)?;
            self.data.phase = VerifyPhase::Collecting { window: next };
            return Ok(StepOutcome::Await(vec![task]));
        }

        Ok(StepOutcome::Done(self.decide(ctx).await))
    }

    fn cleanup(&mut self, _ctx: &StepContext<'_>) {
        self.data = VerifyData::default();
    }
}
