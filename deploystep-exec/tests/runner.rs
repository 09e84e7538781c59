mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{context, progress, success, Harness, LegStep};
use deploystep_core::types::FailureType;
use deploystep_core::{ResultEnvelope, Status, StepError};
use deploystep_exec::executor::failure::MSG_INTERNAL;
use deploystep_exec::retry::RetryConfig;
use deploystep_exec::{
    AbortReason, ChannelExecutor, DeliveryReport, EngineConfig, ExecutorMessage, RunnerError,
    StepRunner,
};
use deploystep_store::{ExecutionStore, InMemoryExecutionStore};
use serde_json::json;

fn retrying(max_attempts: usize) -> EngineConfig {
    EngineConfig {
        retry: RetryConfig {
            max_attempts,
            base_delay_ms: 0,
            ..RetryConfig::default()
        },
        ..EngineConfig::default()
    }
}

#[tokio::test]
async fn synchronous_step_finishes_in_begin() {
    let h = Harness::new(EngineConfig::default());
    let (step, calls) = LegStep::new(0);

    let outcome = h.runner.begin(context("e1"), step).await.unwrap();

    assert_eq!(outcome.status(), Status::Success);
    assert!(!outcome.is_async());
    assert!(outcome.correlation_ids().is_empty());
    assert_eq!(calls.begin(), 1);
    assert_eq!(h.runner.active_count(), 0);
}

#[tokio::test]
async fn begin_registers_ids_and_submits_tasks() {
    let mut h = Harness::new(EngineConfig::default());
    let (step, _calls) = LegStep::new(1);

    let outcome = h.runner.begin(context("e1"), step).await.unwrap();

    assert!(outcome.is_async());
    assert_eq!(outcome.status(), Status::Running);
    assert_eq!(outcome.correlation_ids().len(), 1);
    let id = outcome.correlation_ids()[0];
    assert!(h.runner.registry().is_pending(&id));
    assert_eq!(h.runner.registry().execution_for(&id).as_deref(), Some("e1"));

    let task = h.next_task();
    assert_eq!(task.correlation_id, id);
    assert_eq!(task.task_type, "legs.task");
    assert!(h.runner.is_active("e1"));
}

#[tokio::test]
async fn result_resumes_exactly_once() {
    let mut h = Harness::new(EngineConfig::default());
    let (step, calls) = LegStep::new(1);
    h.runner.begin(context("e1"), step).await.unwrap();
    let id = h.next_task().correlation_id;

    let first = h.runner.deliver(success(id, json!({}))).await;
    let outcome = first.outcome().expect("resumed");
    assert_eq!(outcome.status(), Status::Success);
    assert_eq!(outcome.payload(), &json!({ "legs": 1 }));

    let second = h.runner.deliver(success(id, json!({}))).await;
    assert_eq!(second, DeliveryReport::Ignored);
    assert_eq!(calls.resume(), 1);
    assert!(h.runner.registry().is_retired(&id));
    assert!(!h.runner.is_active("e1"));
}

#[tokio::test]
async fn unknown_correlation_id_is_ignored() {
    let h = Harness::new(EngineConfig::default());
    let stray = deploystep_core::CorrelationId::generate();

    let report = h.runner.deliver(success(stray, json!({}))).await;

    assert_eq!(report, DeliveryReport::Ignored);
    assert!(h.events.types().await.contains(&"delivery.ignored"));
}

#[tokio::test]
async fn progress_envelope_keeps_id_pending() {
    let mut h = Harness::new(EngineConfig::default());
    let (step, calls) = LegStep::new(1);
    h.runner.begin(context("e1"), step).await.unwrap();
    let id = h.next_task().correlation_id;

    assert_eq!(h.runner.deliver(progress(id)).await, DeliveryReport::Progress);
    assert!(h.runner.registry().is_pending(&id));
    assert_eq!(calls.resume(), 0);

    let report = h.runner.deliver(success(id, json!({}))).await;
    assert_eq!(report.outcome().map(|o| o.status()), Some(Status::Success));
}

#[tokio::test]
async fn multi_task_leg_waits_for_every_result() {
    let mut h = Harness::new(EngineConfig::default());
    let (mut step, calls) = LegStep::new(1);
    step.tasks_per_leg = 2;
    let outcome = h.runner.begin(context("e1"), step).await.unwrap();
    assert_eq!(outcome.correlation_ids().len(), 2);
    let a = h.next_task().correlation_id;
    let b = h.next_task().correlation_id;

    let report = h.runner.deliver(success(b, json!({}))).await;
    assert_eq!(report, DeliveryReport::Buffered { remaining: 1 });
    assert_eq!(calls.resume(), 0);

    let report = h.runner.deliver(success(a, json!({}))).await;
    assert_eq!(report.outcome().map(|o| o.status()), Some(Status::Success));
    assert_eq!(calls.resume(), 1);
}

#[tokio::test]
async fn each_leg_gets_a_fresh_correlation_id() {
    let mut h = Harness::new(EngineConfig::default());
    let (step, calls) = LegStep::new(2);
    h.runner.begin(context("e1"), step).await.unwrap();
    let first = h.next_task().correlation_id;

    let report = h.runner.deliver(success(first, json!({}))).await;
    let resumed = report.outcome().expect("resumed");
    assert!(resumed.is_async());
    let second = h.next_task().correlation_id;
    assert_ne!(first, second);
    assert_eq!(resumed.correlation_ids(), &[second]);

    let report = h.runner.deliver(success(second, json!({}))).await;
    assert_eq!(report.outcome().map(|o| o.status()), Some(Status::Success));
    assert_eq!(calls.resume(), 2);
}

#[tokio::test]
async fn remote_failure_surfaces_envelope_message() {
    let mut h = Harness::new(EngineConfig::default());
    let (step, _calls) = LegStep::new(1);
    h.runner.begin(context("e1"), step).await.unwrap();
    let id = h.next_task().correlation_id;

    let report = h
        .runner
        .deliver(ResultEnvelope::failure(id, "disk full on host-3"))
        .await;

    let outcome = report.outcome().expect("resumed");
    assert_eq!(outcome.status(), Status::Failed);
    assert_eq!(outcome.error_message(), Some("disk full on host-3"));
}

#[tokio::test]
async fn remote_failure_without_message_gets_default() {
    let mut h = Harness::new(EngineConfig::default());
    let (step, _calls) = LegStep::new(1);
    h.runner.begin(context("e1"), step).await.unwrap();
    let id = h.next_task().correlation_id;

    let mut envelope = ResultEnvelope::failure(id, "");
    envelope.error_message = None;
    let report = h.runner.deliver(envelope).await;

    assert_eq!(
        report.outcome().and_then(|o| o.error_message()),
        Some("Remote execution failed")
    );
}

#[tokio::test]
async fn abort_while_awaiting_discards_late_results() {
    let mut h = Harness::new(EngineConfig::default());
    let (step, calls) = LegStep::new(1);
    h.runner.begin(context("e1"), step).await.unwrap();
    let id = h.next_task().correlation_id;

    let outcome = h
        .runner
        .abort("e1", AbortReason::UserCancelled)
        .await
        .unwrap();

    assert_eq!(outcome.status(), Status::Aborted);
    assert_eq!(outcome.failure_type(), Some(FailureType::UserCancelled));
    assert_eq!(calls.abort(), 1);
    assert!(h
        .drain()
        .iter()
        .any(|m| matches!(m, ExecutorMessage::Cancel(ids) if ids == &vec![id])));

    let status = h.store.get_status("e1").await.unwrap().expect("written back");
    assert_eq!(status.status, Status::Aborted);

    let late = h.runner.deliver(success(id, json!({}))).await;
    assert_eq!(late, DeliveryReport::Ignored);
    assert_eq!(calls.resume(), 0);
    assert!(h.events.types().await.contains(&"step.aborted"));
}

#[tokio::test]
async fn abort_of_unknown_execution_is_an_error() {
    let h = Harness::new(EngineConfig::default());
    let err = h
        .runner
        .abort("nope", AbortReason::UserCancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, RunnerError::UnknownExecution(id) if id == "nope"));
}

#[tokio::test]
async fn same_execution_cannot_begin_twice() {
    let h = Harness::new(EngineConfig::default());
    let (first, _) = LegStep::new(1);
    let (second, second_calls) = LegStep::new(1);
    h.runner.begin(context("e1"), first).await.unwrap();

    let err = h.runner.begin(context("e1"), second).await.unwrap_err();

    assert!(matches!(err, RunnerError::AlreadyActive(_)));
    assert_eq!(second_calls.begin(), 0);
}

#[tokio::test]
async fn internal_error_hides_detail_and_writes_status_back() {
    let h = Harness::new(EngineConfig::default());
    let (mut step, _calls) = LegStep::new(1);
    step.begin_failures
        .push_back(StepError::internal("connection pool exhausted"));

    let outcome = h.runner.begin(context("e1"), step).await.unwrap();

    assert_eq!(outcome.status(), Status::Error);
    assert_eq!(outcome.error_message(), Some(MSG_INTERNAL));
    let status = h.store.get_status("e1").await.unwrap().expect("written back");
    assert_eq!(status.status, Status::Error);
}

#[tokio::test]
async fn panic_in_begin_becomes_error() {
    let h = Harness::new(EngineConfig::default());
    let (mut step, _calls) = LegStep::new(1);
    step.panic_on_begin = true;

    let outcome = h.runner.begin(context("e1"), step).await.unwrap();

    assert_eq!(outcome.status(), Status::Error);
    assert!(!h.runner.is_active("e1"));
}

#[tokio::test]
async fn user_input_errors_are_never_retried() {
    let h = Harness::new(retrying(3));
    let (mut step, calls) = LegStep::new(1);
    step.begin_failures
        .push_back(StepError::user_input("Instance count must not be blank"));

    let outcome = h.runner.begin(context("e1"), step).await.unwrap();

    assert_eq!(outcome.status(), Status::Failed);
    assert_eq!(
        outcome.error_message(),
        Some("Instance count must not be blank")
    );
    assert_eq!(calls.begin(), 1);
    assert_eq!(calls.cleanup(), 0);
    assert!(h.store.get_status("e1").await.unwrap().is_none());
}

#[tokio::test]
async fn remote_errors_retry_after_cleanup() {
    let mut h = Harness::new(retrying(3));
    let (mut step, calls) = LegStep::new(1);
    step.begin_failures.push_back(StepError::remote("agent busy"));

    let outcome = h.runner.begin(context("e1"), step).await.unwrap();

    assert!(outcome.is_async());
    assert_eq!(calls.begin(), 2);
    assert_eq!(calls.cleanup(), 1);
    assert!(h.events.types().await.contains(&"step.retry_scheduled"));

    let id = h.next_task().correlation_id;
    let report = h.runner.deliver(success(id, json!({}))).await;
    assert_eq!(report.outcome().map(|o| o.status()), Some(Status::Success));
}

#[tokio::test]
async fn failed_result_retries_from_begin() {
    let mut h = Harness::new(retrying(2));
    let (step, calls) = LegStep::new(1);
    h.runner.begin(context("e1"), step).await.unwrap();
    let first = h.next_task().correlation_id;

    let report = h
        .runner
        .deliver(ResultEnvelope::failure(first, "flaky"))
        .await;
    let resumed = report.outcome().expect("resumed");
    assert!(resumed.is_async());
    assert_eq!(calls.cleanup(), 1);

    let second = h.next_task().correlation_id;
    let report = h
        .runner
        .deliver(ResultEnvelope::failure(second, "still flaky"))
        .await;
    let outcome = report.outcome().expect("resumed");
    assert_eq!(outcome.status(), Status::Failed);
    assert_eq!(outcome.error_message(), Some("still flaky"));
    assert_eq!(calls.begin(), 2);
}

#[tokio::test(start_paused = true)]
async fn timeout_aborts_a_suspended_execution() {
    let mut h = Harness::new(EngineConfig::default());
    let (step, calls) = LegStep::new(1);
    let mut ctx = context("e1");
    ctx.timeout_ms = Some(1_000);
    h.runner.begin(ctx, step).await.unwrap();
    let id = h.next_task().correlation_id;

    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(!h.runner.is_active("e1"));
    assert_eq!(calls.abort(), 1);
    assert!(h.events.events().await.iter().any(|e| matches!(
        e,
        deploystep_exec::Event::StepAborted {
            failure_type: FailureType::Timeout,
            ..
        }
    )));
    let status = h.store.get_status("e1").await.unwrap().expect("written back");
    assert_eq!(status.status, Status::Aborted);

    let late = h.runner.deliver(success(id, json!({}))).await;
    assert_eq!(late, DeliveryReport::Ignored);
}

#[tokio::test(start_paused = true)]
async fn config_default_timeout_applies_without_context_timeout() {
    let h = Harness::new(EngineConfig {
        default_timeout_ms: Some(500),
        ..EngineConfig::default()
    });
    let (step, _calls) = LegStep::new(1);
    h.runner.begin(context("e1"), step).await.unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(!h.runner.is_active("e1"));
}

#[tokio::test(start_paused = true)]
async fn result_before_timeout_disarms_the_timer() {
    let mut h = Harness::new(EngineConfig::default());
    let (step, calls) = LegStep::new(2);
    let mut ctx = context("e1");
    ctx.timeout_ms = Some(1_000);
    h.runner.begin(ctx, step).await.unwrap();
    let first = h.next_task().correlation_id;

    tokio::time::sleep(Duration::from_millis(900)).await;
    h.runner.deliver(success(first, json!({}))).await;

    // The first leg's deadline passes while the second leg is still fresh.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(h.runner.is_active("e1"));
    assert_eq!(calls.abort(), 0);

    let second = h.next_task().correlation_id;
    let report = h.runner.deliver(success(second, json!({}))).await;
    assert_eq!(report.outcome().map(|o| o.status()), Some(Status::Success));
}

#[tokio::test]
async fn submission_failure_retires_registered_ids() {
    let (executor, rx) = ChannelExecutor::new();
    drop(rx);
    let runner = StepRunner::builder(
        EngineConfig::default(),
        Arc::new(executor),
        Arc::new(InMemoryExecutionStore::new()),
    )
    .build();
    let (step, _calls) = LegStep::new(1);

    let outcome = runner.begin(context("e1"), step).await.unwrap();

    assert_eq!(outcome.status(), Status::Failed);
    assert!(outcome
        .error_message()
        .is_some_and(|m| m.starts_with("failed to submit remote task")));
    assert_eq!(runner.registry().pending_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn independent_executions_run_concurrently() {
    let (executor, mut rx) = ChannelExecutor::new();
    let runner = StepRunner::builder(
        EngineConfig::default(),
        Arc::new(executor),
        Arc::new(InMemoryExecutionStore::new()),
    )
    .build();

    let mut begins = Vec::new();
    for n in 0..16 {
        let runner = runner.clone();
        begins.push(tokio::spawn(async move {
            let (step, _) = LegStep::new(1);
            runner.begin(context(&format!("e{n}")), step).await
        }));
    }
    for b in begins {
        assert!(b.await.unwrap().unwrap().is_async());
    }

    let mut deliveries = Vec::new();
    while let Ok(ExecutorMessage::Submit(task)) = rx.try_recv() {
        let runner = runner.clone();
        deliveries.push(tokio::spawn(async move {
            runner.deliver(success(task.correlation_id, json!({}))).await
        }));
    }
    assert_eq!(deliveries.len(), 16);
    for d in deliveries {
        let report = d.await.unwrap();
        assert_eq!(report.outcome().map(|o| o.status()), Some(Status::Success));
    }
    assert_eq!(runner.active_count(), 0);
}

#[tokio::test]
async fn finished_executions_prune_expired_tombstones() {
    let mut h = Harness::new(EngineConfig {
        retired_ttl_ms: 0,
        ..EngineConfig::default()
    });
    let (step, _calls) = LegStep::new(1);
    h.runner.begin(context("e1"), step).await.unwrap();
    let id = h.next_task().correlation_id;

    let report = h.runner.deliver(success(id, json!({}))).await;
    assert_eq!(report.outcome().expect("resumed").status(), Status::Success);
    assert!(!h.runner.registry().is_retired(&id));
    assert!(!h.runner.registry().is_pending(&id));

    let again = h.runner.deliver(success(id, json!({}))).await;
    assert_eq!(again, DeliveryReport::Ignored);
}

#[test]
fn tombstones_are_kept_for_ten_minutes_by_default() {
    let config: EngineConfig = serde_json::from_value(json!({})).unwrap();
    assert_eq!(config.retired_ttl(), Duration::from_secs(600));
    assert_eq!(config, EngineConfig::default());
}
