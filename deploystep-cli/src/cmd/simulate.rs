use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use deploystep_core::types::{FailureType, Payload, RemoteStatus};
use deploystep_core::{Instance, Outcome, RemoteTaskHandle, ResultEnvelope, Status};
use deploystep_exec::executor::{
    MetricsCollector, MetricsEventSink, ReqwestHttpClient, TracingEventSink, WebhookEventSink,
};
use deploystep_exec::{
    AbortReason, ChannelExecutor, DeliveryReport, DeploymentStep, EngineConfig, EventSink,
    ExecutionContext, ExecutorMessage, Step, StepRunner, StepSpec,
};
use deploystep_store::InMemoryExecutionStore;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::error::CliError;
use crate::exit_codes;
use crate::output::print_result;
use crate::utils::load_document;
use crate::OutputArgs;

const DEFAULT_EXECUTION_ID: &str = "simulation";

/// A list of steps run in order against one execution context.
#[derive(Debug, Deserialize)]
struct Plan {
    #[serde(default)]
    context: ExecutionContext,
    steps: Vec<PlannedStep>,
}

#[derive(Debug, Deserialize)]
struct PlannedStep {
    #[serde(default)]
    name: Option<String>,
    step: StepSpec,
    /// Answers for submitted tasks, consumed in submission order.
    #[serde(default)]
    results: Vec<ScriptedResult>,
}

#[derive(Debug, Deserialize)]
struct ScriptedResult {
    #[serde(default = "default_status")]
    status: RemoteStatus,
    #[serde(default)]
    payload: Payload,
    #[serde(default, rename = "errorMessage")]
    error_message: Option<String>,
    #[serde(default, rename = "timedOut")]
    timed_out: bool,
}

fn default_status() -> RemoteStatus {
    RemoteStatus::Success
}

impl ScriptedResult {
    fn envelope(self, task: &RemoteTaskHandle) -> ResultEnvelope {
        ResultEnvelope {
            correlation_id: task.correlation_id,
            status: self.status,
            payload: self.payload,
            error_message: self.error_message,
            timed_out: self.timed_out,
        }
    }
}

#[derive(Debug, Serialize)]
struct StepReport {
    name: String,
    kind: &'static str,
    status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(rename = "failureType", skip_serializing_if = "Option::is_none")]
    failure_type: Option<FailureType>,
    #[serde(skip_serializing_if = "Payload::is_null")]
    payload: Payload,
}

pub async fn simulate_cmd(
    config: EngineConfig,
    output: &OutputArgs,
    plan_path: &Path,
) -> Result<i32, CliError> {
    let plan: Plan = load_document(plan_path)?;
    let collector = Arc::new(MetricsCollector::new());
    let events = event_sink(&config, collector.clone())?;

    let (executor, mut rx) = ChannelExecutor::new();
    let store = Arc::new(InMemoryExecutionStore::new());
    let runner = StepRunner::builder(config, Arc::new(executor), store)
        .event_sink(events)
        .build();

    let mut context = plan.context;
    if context.execution_id.trim().is_empty() {
        context.execution_id = DEFAULT_EXECUTION_ID.to_string();
    }

    let mut reports = Vec::with_capacity(plan.steps.len());
    let mut halted = false;
    for (index, planned) in plan.steps.into_iter().enumerate() {
        let name = planned
            .name
            .unwrap_or_else(|| format!("step-{}", index + 1));
        let step = DeploymentStep::from(planned.step);
        let kind = step.kind();
        if halted {
            reports.push(StepReport {
                name,
                kind,
                status: None,
                message: None,
                failure_type: None,
                payload: Payload::Null,
            });
            continue;
        }

        let mut script: VecDeque<ScriptedResult> = planned.results.into();
        let mut outcome = runner
            .begin(context.clone(), step)
            .await
            .map_err(|e| CliError::Runtime(e.to_string()))?;
        while outcome.is_async() {
            let task = next_task(&mut rx).await?;
            if let Some(resumed) = answer(&runner, &context.execution_id, &task, &mut script).await? {
                outcome = resumed;
            }
        }

        tracing::info!(step = %name, kind, status = outcome.status().as_str(), "simulated step finished");
        adopt_instances(&mut context, &outcome);
        halted = !outcome.status().is_success();
        reports.push(StepReport {
            name,
            kind,
            status: Some(outcome.status()),
            message: outcome.error_message().map(str::to_string),
            failure_type: outcome.failure_type(),
            payload: outcome.payload().clone(),
        });
    }

    let metrics = collector.get_metrics().await;
    print_result(
        output.format,
        output.quiet,
        &json!({
            "executionId": context.execution_id,
            "steps": reports,
            "metrics": metrics.to_json(),
        }),
    );
    Ok(if halted {
        exit_codes::STEP_FAILED
    } else {
        exit_codes::SUCCESS
    })
}

fn event_sink(
    config: &EngineConfig,
    collector: Arc<MetricsCollector>,
) -> Result<Arc<dyn EventSink>, CliError> {
    let mut base: Arc<dyn EventSink> = Arc::new(TracingEventSink);
    if let Some(url) = &config.webhook_url {
        let http = ReqwestHttpClient::new().map_err(|e| CliError::Runtime(e.to_string()))?;
        let webhook = WebhookEventSink::new(url, Arc::new(http), base)
            .map_err(|e| CliError::Input(format!("invalid webhook url '{url}': {e}")))?;
        base = Arc::new(webhook);
    }
    Ok(Arc::new(MetricsEventSink::new(collector, base)))
}

async fn next_task(
    rx: &mut UnboundedReceiver<ExecutorMessage>,
) -> Result<RemoteTaskHandle, CliError> {
    loop {
        match rx.recv().await {
            Some(ExecutorMessage::Submit(task)) => return Ok(task),
            Some(ExecutorMessage::Cancel(_)) => continue,
            None => return Err(CliError::Runtime("remote executor channel closed".to_string())),
        }
    }
}

/// Deliver scripted results for one task until it is consumed.
///
/// Returns the resumed outcome, or `None` while the step still waits on
/// sibling tasks. An exhausted script aborts the execution.
async fn answer(
    runner: &StepRunner,
    execution_id: &str,
    task: &RemoteTaskHandle,
    script: &mut VecDeque<ScriptedResult>,
) -> Result<Option<Outcome>, CliError> {
    loop {
        let Some(scripted) = script.pop_front() else {
            tracing::warn!(
                task_type = %task.task_type,
                correlation_id = %task.correlation_id,
                "no scripted result left; aborting"
            );
            return runner
                .abort(execution_id, AbortReason::UserCancelled)
                .await
                .map(Some)
                .map_err(|e| CliError::Runtime(e.to_string()));
        };
        match runner.deliver(scripted.envelope(task)).await {
            DeliveryReport::Resumed(outcome) => return Ok(Some(outcome)),
            DeliveryReport::Buffered { .. } => return Ok(None),
            DeliveryReport::Progress => continue,
            DeliveryReport::Ignored => {
                return Err(CliError::Runtime(format!(
                    "result for task {} was ignored",
                    task.correlation_id
                )))
            }
        }
    }
}

/// Instances reported by a finished step join the pool for later steps.
fn adopt_instances(context: &mut ExecutionContext, outcome: &Outcome) {
    let Some(value) = outcome.payload().get("instances") else {
        return;
    };
    if let Ok(instances) = serde_json::from_value::<Vec<Instance>>(value.clone()) {
        for instance in instances {
            if !context.instances.iter().any(|i| i.id == instance.id) {
                context.instances.push(instance);
            }
        }
    }
}
