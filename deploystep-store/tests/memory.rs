use chrono::Utc;
use deploystep_core::types::{BaselineScope, ExecutionRecord, Status};
use deploystep_store::{ExecutionStore, InMemoryExecutionStore, StatusUpdate};

fn scope(env: &str) -> BaselineScope {
    BaselineScope {
        workflow_id: "wf".to_string(),
        service_id: "svc".to_string(),
        infra_mapping_id: "infra".to_string(),
        environment_id: env.to_string(),
    }
}

fn record(id: &str, env: &str) -> ExecutionRecord {
    ExecutionRecord {
        execution_id: id.to_string(),
        scope: scope(env),
        status: Status::Success,
        has_analysis_data: true,
        finished_at: Utc::now(),
    }
}

#[tokio::test]
async fn history_is_partitioned_by_scope() {
    let store = InMemoryExecutionStore::new();
    store.record_execution(record("a", "prod")).await.unwrap();
    store.record_execution(record("b", "staging")).await.unwrap();
    store.record_execution(record("c", "prod")).await.unwrap();

    let prod = store.list_executions(&scope("prod")).await.unwrap();
    let ids: Vec<_> = prod.iter().map(|r| r.execution_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c"]);
    assert!(store.list_executions(&scope("qa")).await.unwrap().is_empty());
}

#[tokio::test]
async fn status_write_back_overwrites_previous_value() {
    let store = InMemoryExecutionStore::new();
    store
        .write_status(StatusUpdate::now("exec-1", Status::Running, None))
        .await
        .unwrap();
    store
        .write_status(StatusUpdate::now(
            "exec-1",
            Status::Error,
            Some("Internal error while executing step".to_string()),
        ))
        .await
        .unwrap();

    let status = store.get_status("exec-1").await.unwrap().unwrap();
    assert_eq!(status.status, Status::Error);
    assert_eq!(store.status_count(), 1);
    assert!(store.get_status("exec-2").await.unwrap().is_none());
}

#[test]
fn history_loads_from_json() {
    let json = r#"[
        {"executionId":"x1","workflowId":"wf","serviceId":"svc","infraMappingId":"infra",
         "environmentId":"prod","status":"SUCCESS","hasAnalysisData":true,
         "finishedAt":"2026-01-02T03:04:05Z"}
    ]"#;
    let store = InMemoryExecutionStore::from_json(json).unwrap();
    let rt = tokio::runtime::Runtime::new().unwrap();
    let records = rt.block_on(store.list_executions(&scope("prod"))).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].execution_id, "x1");

    assert!(InMemoryExecutionStore::from_json("{not json").is_err());
}
