#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use deploystep_core::types::{BaselineScope, RemoteStatus};
use deploystep_core::{
    CorrelationId, Instance, Outcome, RemoteTaskHandle, ResultEnvelope, StepError,
};
use deploystep_exec::{
    ChannelExecutor, EngineConfig, Event, EventSink, ExecutionContext, ExecutorMessage, Step,
    StepContext, StepOutcome, StepRunner,
};
use deploystep_store::InMemoryExecutionStore;
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Mutex;

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub async fn events(&self) -> Vec<Event> {
        self.events.lock().await.clone()
    }

    pub async fn types(&self) -> Vec<&'static str> {
        self.events.lock().await.iter().map(Event::type_name).collect()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn emit(&self, event: Event) {
        self.events.lock().await.push(event);
    }
}

pub struct Harness {
    pub runner: StepRunner,
    pub rx: UnboundedReceiver<ExecutorMessage>,
    pub store: Arc<InMemoryExecutionStore>,
    pub events: Arc<RecordingSink>,
}

impl Harness {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_store(config, InMemoryExecutionStore::new())
    }

    pub fn with_store(config: EngineConfig, store: InMemoryExecutionStore) -> Self {
        let (executor, rx) = ChannelExecutor::new();
        let store = Arc::new(store);
        let events = Arc::new(RecordingSink::default());
        let runner = StepRunner::builder(config, Arc::new(executor), store.clone())
            .event_sink(events.clone())
            .build();
        Self {
            runner,
            rx,
            store,
            events,
        }
    }

    /// Next submitted task; cancellations are skipped.
    pub fn next_task(&mut self) -> RemoteTaskHandle {
        loop {
            match self.rx.try_recv().expect("a task was submitted") {
                ExecutorMessage::Submit(task) => return task,
                ExecutorMessage::Cancel(_) => continue,
            }
        }
    }

    pub fn drain(&mut self) -> Vec<ExecutorMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            out.push(msg);
        }
        out
    }
}

pub fn scope() -> BaselineScope {
    BaselineScope {
        workflow_id: "wf".to_string(),
        service_id: "svc".to_string(),
        infra_mapping_id: "infra".to_string(),
        environment_id: "prod".to_string(),
    }
}

pub fn context(execution_id: &str) -> ExecutionContext {
    ExecutionContext {
        account_id: "acct".to_string(),
        scope: scope(),
        ..ExecutionContext::new(execution_id)
    }
}

pub fn pool(n: usize) -> Vec<Instance> {
    (0..n)
        .map(|i| Instance::new(format!("i-{i}"), format!("host-{i}")))
        .collect()
}

pub fn success(id: CorrelationId, payload: serde_json::Value) -> ResultEnvelope {
    ResultEnvelope::success(id, payload)
}

pub fn progress(id: CorrelationId) -> ResultEnvelope {
    ResultEnvelope {
        correlation_id: id,
        status: RemoteStatus::Running,
        payload: serde_json::Value::Null,
        error_message: None,
        timed_out: false,
    }
}

#[derive(Default)]
pub struct Calls {
    pub begin: AtomicUsize,
    pub resume: AtomicUsize,
    pub abort: AtomicUsize,
    pub cleanup: AtomicUsize,
}

impl Calls {
    pub fn begin(&self) -> usize {
        self.begin.load(Ordering::SeqCst)
    }
    pub fn resume(&self) -> usize {
        self.resume.load(Ordering::SeqCst)
    }
    pub fn abort(&self) -> usize {
        self.abort.load(Ordering::SeqCst)
    }
    pub fn cleanup(&self) -> usize {
        self.cleanup.load(Ordering::SeqCst)
    }
}

/// Step with a configurable number of remote legs that counts every call.
pub struct LegStep {
    pub calls: Arc<Calls>,
    pub legs: usize,
    pub tasks_per_leg: usize,
    pub begin_failures: VecDeque<StepError>,
    pub panic_on_begin: bool,
    leg: usize,
}

impl LegStep {
    pub fn new(legs: usize) -> (Self, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        (
            Self {
                calls: calls.clone(),
                legs,
                tasks_per_leg: 1,
                begin_failures: VecDeque::new(),
                panic_on_begin: false,
                leg: 0,
            },
            calls,
        )
    }

    fn tasks(&self) -> Vec<RemoteTaskHandle> {
        (0..self.tasks_per_leg)
            .map(|n| RemoteTaskHandle::new("legs.task", json!({ "leg": self.leg, "n": n }), 1000))
            .collect()
    }
}

#[async_trait]
impl Step for LegStep {
    fn kind(&self) -> &'static str {
        "legs"
    }

    async fn begin(&mut self, _ctx: &StepContext<'_>) -> Result<StepOutcome, StepError> {
        self.calls.begin.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_begin {
            panic!("step exploded");
        }
        if let Some(err) = self.begin_failures.pop_front() {
            return Err(err);
        }
        if self.legs == 0 {
            return Ok(StepOutcome::Done(Outcome::success()));
        }
        self.leg = 1;
        Ok(StepOutcome::Await(self.tasks()))
    }

    async fn resume(
        &mut self,
        _ctx: &StepContext<'_>,
        results: BTreeMap<CorrelationId, ResultEnvelope>,
    ) -> Result<StepOutcome, StepError> {
        self.calls.resume.fetch_add(1, Ordering::SeqCst);
        assert_eq!(results.len(), self.tasks_per_leg);
        if let Some(failed) = results
            .values()
            .find(|r| r.status == RemoteStatus::Failure)
        {
            return Err(StepError::remote(
                failed.error_message.clone().unwrap_or_default(),
            ));
        }
        if self.leg < self.legs {
            self.leg += 1;
            return Ok(StepOutcome::Await(self.tasks()));
        }
        Ok(StepOutcome::Done(
            Outcome::success().with_payload(json!({ "legs": self.leg })),
        ))
    }

    async fn on_abort(&mut self, _ctx: &StepContext<'_>) {
        self.calls.abort.fetch_add(1, Ordering::SeqCst);
    }

    fn cleanup(&mut self, _ctx: &StepContext<'_>) {
        self.calls.cleanup.fetch_add(1, Ordering::SeqCst);
        self.leg = 0;
    }
}
