use async_trait::async_trait;
use deploystep_core::types::FailureType;
use deploystep_core::{CorrelationId, Status};
use serde_json::json;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    StepStarted {
        execution_id: String,
        step_kind: &'static str,
        attempt: usize,
    },
    TaskSubmitted {
        execution_id: String,
        correlation_id: CorrelationId,
        task_type: String,
    },
    StepSuspended {
        execution_id: String,
        pending: usize,
    },
    ResultDelivered {
        execution_id: String,
        correlation_id: CorrelationId,
        remaining: usize,
    },
    RemoteProgress {
        execution_id: String,
        correlation_id: CorrelationId,
    },
    DeliveryIgnored {
        correlation_id: CorrelationId,
    },
    RetryScheduled {
        execution_id: String,
        attempt: usize,
        delay_ms: u64,
    },
    StepFinished {
        execution_id: String,
        status: Status,
        message: Option<String>,
    },
    StepAborted {
        execution_id: String,
        failure_type: FailureType,
    },
}

impl Event {
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::StepStarted { .. } => "step.started",
            Event::TaskSubmitted { .. } => "task.submitted",
            Event::StepSuspended { .. } => "step.suspended",
            Event::ResultDelivered { .. } => "result.delivered",
            Event::RemoteProgress { .. } => "remote.progress",
            Event::DeliveryIgnored { .. } => "delivery.ignored",
            Event::RetryScheduled { .. } => "step.retry_scheduled",
            Event::StepFinished { .. } => "step.finished",
            Event::StepAborted { .. } => "step.aborted",
        }
    }

    pub fn execution_id(&self) -> Option<&str> {
        match self {
            Event::StepStarted { execution_id, .. }
            | Event::TaskSubmitted { execution_id, .. }
            | Event::StepSuspended { execution_id, .. }
            | Event::ResultDelivered { execution_id, .. }
            | Event::RemoteProgress { execution_id, .. }
            | Event::RetryScheduled { execution_id, .. }
            | Event::StepFinished { execution_id, .. }
            | Event::StepAborted { execution_id, .. } => Some(execution_id),
            Event::DeliveryIgnored { .. } => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut body = match self {
            Event::StepStarted {
                execution_id,
                step_kind,
                attempt,
            } => json!({ "execution_id": execution_id, "step_kind": step_kind, "attempt": attempt }),
            Event::TaskSubmitted {
                execution_id,
                correlation_id,
                task_type,
            } => json!({
                "execution_id": execution_id,
                "correlation_id": correlation_id.to_string(),
                "task_type": task_type,
            }),
            Event::StepSuspended {
                execution_id,
                pending,
            } => json!({ "execution_id": execution_id, "pending": pending }),
            Event::ResultDelivered {
                execution_id,
                correlation_id,
                remaining,
            } => json!({
                "execution_id": execution_id,
                "correlation_id": correlation_id.to_string(),
                "remaining": remaining,
            }),
            Event::RemoteProgress {
                execution_id,
                correlation_id,
            } => json!({ "execution_id": execution_id, "correlation_id": correlation_id.to_string() }),
            Event::DeliveryIgnored { correlation_id } => {
                json!({ "correlation_id": correlation_id.to_string() })
            }
            Event::RetryScheduled {
                execution_id,
                attempt,
                delay_ms,
            } => json!({ "execution_id": execution_id, "attempt": attempt, "delay_ms": delay_ms }),
            Event::StepFinished {
                execution_id,
                status,
                message,
            } => json!({ "execution_id": execution_id, "status": status.as_str(), "message": message }),
            Event::StepAborted {
                execution_id,
                failure_type,
            } => json!({ "execution_id": execution_id, "failure_type": failure_type }),
        };
        if let Some(obj) = body.as_object_mut() {
            obj.insert("type".to_string(), json!(self.type_name()));
        }
        body
    }
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: Event);
}

pub struct CompositeEventSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl Default for CompositeEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeEventSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl EventSink for CompositeEventSink {
    async fn emit(&self, event: Event) {
        for sink in &self.sinks {
            sink.emit(event.clone()).await;
        }
    }
}

/// One JSON object per line on stdout.
pub struct StdoutEventSink;

#[async_trait]
impl EventSink for StdoutEventSink {
    async fn emit(&self, event: Event) {
        println!("{}", serde_json::to_string(&event.to_json()).unwrap_or_default());
    }
}

/// Forwards events to `tracing` at debug level; finishes go out at info.
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn emit(&self, event: Event) {
        match &event {
            Event::StepFinished {
                execution_id,
                status,
                message,
            } => tracing::info!(
                execution_id = %execution_id,
                status = status.as_str(),
                message = message.as_deref().unwrap_or(""),
                "step finished"
            ),
            Event::StepAborted {
                execution_id,
                failure_type,
            } => tracing::info!(
                execution_id = %execution_id,
                failure_type = ?failure_type,
                "step aborted"
            ),
            Event::DeliveryIgnored { correlation_id } => tracing::debug!(
                correlation_id = %correlation_id,
                "ignored result for unknown or consumed correlation id"
            ),
            other => tracing::debug!(
                event = other.type_name(),
                execution_id = other.execution_id().unwrap_or(""),
                "runner event"
            ),
        }
    }
}

pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: Event) {}
}
