use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::executor::{Event, EventSink};

/// Counters across every execution a runner has driven.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnerMetrics {
    pub steps_started: usize,
    pub steps_finished: usize,
    pub steps_aborted: usize,
    pub retries_scheduled: usize,
    pub tasks_submitted: usize,
    pub results_delivered: usize,
    pub deliveries_ignored: usize,
    pub by_status: BTreeMap<String, usize>,
}

impl RunnerMetrics {
    pub fn record(&mut self, event: &Event) {
        match event {
            Event::StepStarted { .. } => self.steps_started += 1,
            Event::TaskSubmitted { .. } => self.tasks_submitted += 1,
            Event::ResultDelivered { .. } => self.results_delivered += 1,
            Event::DeliveryIgnored { .. } => self.deliveries_ignored += 1,
            Event::RetryScheduled { .. } => self.retries_scheduled += 1,
            Event::StepFinished { status, .. } => {
                self.steps_finished += 1;
                *self.by_status.entry(status.as_str().to_string()).or_default() += 1;
            }
            Event::StepAborted { .. } => self.steps_aborted += 1,
            Event::StepSuspended { .. } | Event::RemoteProgress { .. } => {}
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "steps": {
                "started": self.steps_started,
                "finished": self.steps_finished,
                "aborted": self.steps_aborted,
                "retried": self.retries_scheduled,
                "by_status": self.by_status,
            },
            "remote": {
                "submitted": self.tasks_submitted,
                "delivered": self.results_delivered,
                "ignored": self.deliveries_ignored,
            },
        })
    }
}

#[derive(Default)]
pub struct MetricsCollector {
    metrics: Mutex<RunnerMetrics>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, event: &Event) {
        self.metrics.lock().await.record(event);
    }

    pub async fn get_metrics(&self) -> RunnerMetrics {
        self.metrics.lock().await.clone()
    }
}

pub struct MetricsEventSink {
    collector: Arc<MetricsCollector>,
    base: Arc<dyn EventSink>,
}

impl MetricsEventSink {
    pub fn new(collector: Arc<MetricsCollector>, base: Arc<dyn EventSink>) -> Self {
        Self { collector, base }
    }
}

#[async_trait]
impl EventSink for MetricsEventSink {
    async fn emit(&self, event: Event) {
        self.collector.record(&event).await;
        self.base.emit(event).await;
    }
}
