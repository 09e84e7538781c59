use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use deploystep_core::types::FailureType;
use deploystep_core::{
    CorrelationId, FeatureFlags, Outcome, RemoteTaskHandle, ResultEnvelope, Status, StepError,
    VariableRenderer,
};
use deploystep_store::{ExecutionStore, StatusUpdate};
use futures_util::FutureExt;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;

use crate::correlation::CorrelationRegistry;
use crate::delegate::RemoteExecutor;
use crate::executor::events::{Event, EventSink, NoOpEventSink};
use crate::executor::failure::classify;
use crate::executor::result::{DeliveryReport, RunnerError};
use crate::executor::types::{AbortReason, EngineConfig};
use crate::retry::{decide_retry, RetryDecision};
use crate::step::{ExecutionContext, Step, StepContext, StepOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExecState {
    Running,
    AwaitingRemote,
    RetryWaiting,
    Finished,
}

struct Slot {
    step: Box<dyn Step>,
    context: ExecutionContext,
    renderer: VariableRenderer,
    state: ExecState,
    attempt: usize,
    pending: BTreeSet<CorrelationId>,
    delivered: BTreeMap<CorrelationId, ResultEnvelope>,
    /// Bumped on every suspension; a timer only fires for its own leg.
    generation: u64,
    timer: Option<JoinHandle<()>>,
    outcome: Option<Outcome>,
}

type SlotHandle = Arc<Mutex<Slot>>;

enum Leg {
    Begin,
    Resume(BTreeMap<CorrelationId, ResultEnvelope>),
}

struct Inner {
    config: EngineConfig,
    registry: Arc<CorrelationRegistry>,
    executor: Arc<dyn RemoteExecutor>,
    store: Arc<dyn ExecutionStore>,
    flags: Arc<dyn FeatureFlags>,
    events: Arc<dyn EventSink>,
    executions: DashMap<String, SlotHandle>,
    started: Instant,
    /// Milliseconds after `started` of the last tombstone sweep.
    last_prune_ms: AtomicU64,
}

/// Drives steps through begin, suspension on remote tasks, and resume.
///
/// Cheap to clone; clones share executions and the correlation registry.
/// Each execution is serialized behind its own lock, so `begin`, `deliver`
/// and `abort` may be called concurrently from any task.
#[derive(Clone)]
pub struct StepRunner {
    inner: Arc<Inner>,
}

pub struct StepRunnerBuilder {
    config: EngineConfig,
    executor: Arc<dyn RemoteExecutor>,
    store: Arc<dyn ExecutionStore>,
    registry: Option<Arc<CorrelationRegistry>>,
    flags: Option<Arc<dyn FeatureFlags>>,
    events: Option<Arc<dyn EventSink>>,
}

impl StepRunnerBuilder {
    pub fn registry(mut self, registry: Arc<CorrelationRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Overrides the flags from `EngineConfig::flags`.
    pub fn flags(mut self, flags: Arc<dyn FeatureFlags>) -> Self {
        self.flags = Some(flags);
        self
    }

    pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn build(self) -> StepRunner {
        let flags: Arc<dyn FeatureFlags> = match self.flags {
            Some(flags) => flags,
            None => Arc::new(self.config.flags.clone()),
        };
        let events: Arc<dyn EventSink> = match self.events {
            Some(events) => events,
            None => Arc::new(NoOpEventSink),
        };
        StepRunner {
            inner: Arc::new(Inner {
                registry: self.registry.unwrap_or_default(),
                executor: self.executor,
                store: self.store,
                flags,
                events,
                executions: DashMap::new(),
                started: Instant::now(),
                last_prune_ms: AtomicU64::new(0),
                config: self.config,
            }),
        }
    }
}

impl StepRunner {
    pub fn builder(
        config: EngineConfig,
        executor: Arc<dyn RemoteExecutor>,
        store: Arc<dyn ExecutionStore>,
    ) -> StepRunnerBuilder {
        StepRunnerBuilder {
            config,
            executor,
            store,
            registry: None,
            flags: None,
            events: None,
        }
    }

    pub fn registry(&self) -> &Arc<CorrelationRegistry> {
        &self.inner.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn is_active(&self, execution_id: &str) -> bool {
        self.inner.executions.contains_key(execution_id)
    }

    pub fn active_count(&self) -> usize {
        self.inner.executions.len()
    }

    /// Start a step. Returns either its terminal outcome or a suspended one
    /// listing the correlation ids it now waits on.
    pub async fn begin<S>(&self, context: ExecutionContext, step: S) -> Result<Outcome, RunnerError>
    where
        S: Step + 'static,
    {
        let execution_id = context.execution_id.clone();
        let handle: SlotHandle = Arc::new(Mutex::new(Slot {
            step: Box::new(step),
            renderer: VariableRenderer::new(context.variables.clone()),
            context,
            state: ExecState::Running,
            attempt: 1,
            pending: BTreeSet::new(),
            delivered: BTreeMap::new(),
            generation: 0,
            timer: None,
            outcome: None,
        }));
        // Locked before it becomes visible so nothing can act on it half-built.
        let guard = handle.clone().lock_owned().await;

        match self.inner.executions.entry(execution_id.clone()) {
            Entry::Occupied(_) => return Err(RunnerError::AlreadyActive(execution_id)),
            Entry::Vacant(v) => {
                v.insert(handle.clone());
            }
        }

        Ok(self.drive(&handle, guard, Leg::Begin).await)
    }

    /// Hand a remote result to the execution waiting on its correlation id.
    ///
    /// Unknown, duplicate and late results are ignored. RUNNING/QUEUED
    /// envelopes are progress only and leave the id pending.
    pub async fn deliver(&self, envelope: ResultEnvelope) -> DeliveryReport {
        let id = envelope.correlation_id;

        if !envelope.status.is_final() {
            return match self.inner.registry.execution_for(&id) {
                Some(execution_id) => {
                    self.emit(Event::RemoteProgress {
                        execution_id,
                        correlation_id: id,
                    })
                    .await;
                    DeliveryReport::Progress
                }
                None => self.ignore(id).await,
            };
        }

        let Some(execution_id) = self.inner.registry.consume(&id) else {
            return self.ignore(id).await;
        };
        let Some(handle) = self.slot(&execution_id) else {
            return self.ignore(id).await;
        };

        let mut guard = handle.clone().lock_owned().await;
        if guard.state != ExecState::AwaitingRemote || !guard.pending.remove(&id) {
            drop(guard);
            return self.ignore(id).await;
        }

        guard.delivered.insert(id, envelope);
        let remaining = guard.pending.len();
        self.emit(Event::ResultDelivered {
            execution_id,
            correlation_id: id,
            remaining,
        })
        .await;
        if remaining > 0 {
            return DeliveryReport::Buffered { remaining };
        }

        if let Some(timer) = guard.timer.take() {
            timer.abort();
        }
        guard.state = ExecState::Running;
        let results = std::mem::take(&mut guard.delivered);
        DeliveryReport::Resumed(self.drive(&handle, guard, Leg::Resume(results)).await)
    }

    /// Abort an execution out-of-band. Pending ids are retired so their
    /// results, if they still arrive, are discarded.
    pub async fn abort(&self, execution_id: &str, reason: AbortReason) -> Result<Outcome, RunnerError> {
        let handle = self
            .slot(execution_id)
            .ok_or_else(|| RunnerError::UnknownExecution(execution_id.to_string()))?;
        let mut guard = handle.lock_owned().await;
        if let Some(outcome) = &guard.outcome {
            return Ok(outcome.clone());
        }
        Ok(self.abort_locked(&mut guard, reason).await)
    }

    fn slot(&self, execution_id: &str) -> Option<SlotHandle> {
        self.inner
            .executions
            .get(execution_id)
            .map(|e| e.value().clone())
    }

    async fn ignore(&self, correlation_id: CorrelationId) -> DeliveryReport {
        self.emit(Event::DeliveryIgnored { correlation_id }).await;
        DeliveryReport::Ignored
    }

    async fn emit(&self, event: Event) {
        self.inner.events.emit(event).await;
    }

    async fn drive(
        &self,
        handle: &SlotHandle,
        mut guard: OwnedMutexGuard<Slot>,
        mut leg: Leg,
    ) -> Outcome {
        let execution_id = guard.context.execution_id.clone();
        loop {
            if matches!(leg, Leg::Begin) {
                self.emit(Event::StepStarted {
                    execution_id: execution_id.clone(),
                    step_kind: guard.step.kind(),
                    attempt: guard.attempt,
                })
                .await;
            }

            let err = match self.invoke(&mut guard, leg).await {
                Ok(StepOutcome::Done(outcome)) if outcome.is_async() => StepError::internal(
                    "step returned a suspended outcome instead of remote tasks",
                ),
                Ok(StepOutcome::Done(outcome)) => return self.finish(&mut guard, outcome).await,
                Ok(StepOutcome::Await(tasks)) => match self.suspend(&mut guard, tasks).await {
                    Ok(outcome) => return outcome,
                    Err(err) => err,
                },
                Err(err) => err,
            };

            let decision = decide_retry(
                &self.inner.config.retry,
                guard.attempt,
                err.failure_class(),
                || fastrand::u64(..),
            );
            let RetryDecision::RetryAfter { delay, .. } = decision else {
                let outcome = classify(&err, &execution_id, guard.step.kind());
                return self.finish(&mut guard, outcome).await;
            };

            tracing::info!(
                execution_id = %execution_id,
                attempt = guard.attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying step"
            );
            self.emit(Event::RetryScheduled {
                execution_id: execution_id.clone(),
                attempt: guard.attempt + 1,
                delay_ms: delay.as_millis() as u64,
            })
            .await;

            self.cleanup(&mut guard);
            guard.attempt += 1;
            guard.state = ExecState::RetryWaiting;

            // Released during backoff so an abort is not held up.
            drop(guard);
            tokio::time::sleep(delay).await;
            guard = handle.clone().lock_owned().await;
            if let Some(outcome) = &guard.outcome {
                return outcome.clone();
            }
            guard.state = ExecState::Running;
            leg = Leg::Begin;
        }
    }

    fn split<'a>(&'a self, slot: &'a mut Slot) -> (&'a mut Box<dyn Step>, StepContext<'a>) {
        let Slot {
            step,
            context,
            renderer,
            attempt,
            ..
        } = slot;
        let ctx = StepContext {
            execution: &*context,
            renderer: &*renderer,
            flags: self.inner.flags.as_ref(),
            store: self.inner.store.as_ref(),
            rules: &self.inner.config.selection,
            attempt: *attempt,
        };
        (step, ctx)
    }

    async fn invoke(&self, slot: &mut Slot, leg: Leg) -> Result<StepOutcome, StepError> {
        let (step, ctx) = self.split(slot);
        let call = async move {
            match leg {
                Leg::Begin => step.begin(&ctx).await,
                Leg::Resume(results) => step.resume(&ctx, results).await,
            }
        };
        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(StepError::internal(format!(
                "step panicked: {}",
                panic_message(panic.as_ref())
            ))),
        }
    }

    fn cleanup(&self, slot: &mut Slot) {
        let (step, ctx) = self.split(slot);
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| step.cleanup(&ctx)));
        if let Err(panic) = result {
            tracing::warn!(
                execution_id = %ctx.execution_id(),
                panic = panic_message(panic.as_ref()),
                "step cleanup panicked"
            );
        }
    }

    async fn suspend(
        &self,
        slot: &mut Slot,
        tasks: Vec<RemoteTaskHandle>,
    ) -> Result<Outcome, StepError> {
        let execution_id = slot.context.execution_id.clone();
        let ids: Vec<CorrelationId> = tasks.iter().map(|t| t.correlation_id).collect();
        if ids.is_empty() {
            return Err(StepError::internal(
                "step asked to wait without submitting any remote task",
            ));
        }

        // Registered before submission so an immediate result finds its execution.
        for (n, id) in ids.iter().enumerate() {
            if let Err(e) = self.inner.registry.register(*id, execution_id.as_str()) {
                self.inner.registry.retire_all(&ids[..n]);
                return Err(StepError::internal(e.to_string()));
            }
        }
        slot.pending = ids.iter().copied().collect();
        slot.delivered.clear();
        slot.state = ExecState::AwaitingRemote;
        slot.generation += 1;

        for task in tasks {
            let correlation_id = task.correlation_id;
            let task_type = task.task_type.clone();
            if let Err(e) = self.inner.executor.submit(task).await {
                self.inner.registry.retire_all(&ids);
                slot.pending.clear();
                slot.state = ExecState::Running;
                if let Err(cancel_err) = self.inner.executor.cancel(&ids).await {
                    tracing::warn!(
                        execution_id = %execution_id,
                        error = %cancel_err,
                        "failed to cancel tasks after a submission failure"
                    );
                }
                return Err(StepError::remote(format!("failed to submit remote task: {e}")));
            }
            self.emit(Event::TaskSubmitted {
                execution_id: execution_id.clone(),
                correlation_id,
                task_type,
            })
            .await;
        }

        self.arm_timer(slot);
        self.emit(Event::StepSuspended {
            execution_id,
            pending: ids.len(),
        })
        .await;

        Outcome::suspended(ids)
            .ok_or_else(|| StepError::internal("suspended without correlation ids"))
    }

    fn arm_timer(&self, slot: &mut Slot) {
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }
        let Some(timeout) = slot
            .context
            .timeout()
            .or_else(|| self.inner.config.default_timeout())
        else {
            return;
        };

        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let execution_id = slot.context.execution_id.clone();
        let generation = slot.generation;
        slot.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(inner) = inner.upgrade() {
                StepRunner { inner }.expire(&execution_id, generation).await;
            }
        }));
    }

    async fn expire(&self, execution_id: &str, generation: u64) {
        let Some(handle) = self.slot(execution_id) else {
            return;
        };
        let mut guard = handle.lock_owned().await;
        if guard.state != ExecState::AwaitingRemote || guard.generation != generation {
            return;
        }
        // This task is the timer; it must not be aborted from inside itself.
        guard.timer = None;
        tracing::warn!(execution_id = %execution_id, "remote wait timed out");
        self.abort_locked(&mut guard, AbortReason::Timeout).await;
    }

    async fn abort_locked(&self, slot: &mut Slot, reason: AbortReason) -> Outcome {
        let was_awaiting = slot.state == ExecState::AwaitingRemote;
        let ids: Vec<CorrelationId> = std::mem::take(&mut slot.pending).into_iter().collect();
        slot.delivered.clear();
        self.inner.registry.retire_all(&ids);
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }

        if was_awaiting {
            let (step, ctx) = self.split(slot);
            if let Err(panic) = AssertUnwindSafe(step.on_abort(&ctx)).catch_unwind().await {
                tracing::warn!(
                    execution_id = %ctx.execution_id(),
                    panic = panic_message(panic.as_ref()),
                    "step abort hook panicked"
                );
            }
            if let Err(e) = self.inner.executor.cancel(&ids).await {
                tracing::warn!(
                    execution_id = %slot.context.execution_id,
                    error = %e,
                    "failed to notify remote executor of abort"
                );
            }
        }

        let failure_type = match reason {
            AbortReason::Timeout => FailureType::Timeout,
            AbortReason::UserCancelled => FailureType::UserCancelled,
        };
        self.finish(slot, Outcome::aborted(failure_type)).await
    }

    async fn finish(&self, slot: &mut Slot, outcome: Outcome) -> Outcome {
        let execution_id = slot.context.execution_id.clone();
        slot.state = ExecState::Finished;
        slot.pending.clear();
        slot.delivered.clear();
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }
        slot.outcome = Some(outcome.clone());
        self.inner.executions.remove(&execution_id);

        let status = outcome.status();
        match (status, outcome.failure_type()) {
            (Status::Aborted, Some(failure_type)) => {
                self.emit(Event::StepAborted {
                    execution_id: execution_id.clone(),
                    failure_type,
                })
                .await
            }
            _ => {
                self.emit(Event::StepFinished {
                    execution_id: execution_id.clone(),
                    status,
                    message: outcome.error_message().map(str::to_string),
                })
                .await
            }
        }

        if matches!(status, Status::Error | Status::Aborted) {
            self.write_back(&execution_id, &outcome).await;
        }
        self.prune_tombstones();
        outcome
    }

    /// Sweep expired correlation tombstones, at most once per TTL.
    fn prune_tombstones(&self) {
        let ttl = self.inner.config.retired_ttl();
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        let now_ms = u64::try_from(self.inner.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let last = self.inner.last_prune_ms.load(Ordering::Acquire);
        if now_ms.saturating_sub(last) < ttl_ms {
            return;
        }
        if self
            .inner
            .last_prune_ms
            .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        let removed = self.inner.registry.prune_retired(ttl);
        if removed > 0 {
            tracing::debug!(removed, "pruned retired correlation ids");
        }
    }

    /// Best-effort: downstream readers must not see a stale RUNNING status.
    async fn write_back(&self, execution_id: &str, outcome: &Outcome) {
        let update = StatusUpdate::now(
            execution_id,
            outcome.status(),
            outcome.error_message().map(str::to_string),
        );
        if let Err(e) = self.inner.store.write_status(update).await {
            tracing::warn!(
                execution_id = %execution_id,
                error = %e,
                "status write-back failed"
            );
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    if let Some(s) = panic.downcast_ref::<String>() {
        return s.clone();
    }
    "unknown panic".to_string()
}
