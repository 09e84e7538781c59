use chrono::{TimeZone, Utc};
use deploystep_core::types::{
    BaselineScope, ComparisonStrategy, ExecutionRecord, MetricAnalysis, RiskLevel, Status,
    Tolerance, VerificationContext, VerificationMode,
};
use deploystep_core::verification::{
    decide_verdict, evaluate, resolve_baseline, Baseline, MSG_NO_BASELINE,
};

fn scope() -> BaselineScope {
    BaselineScope {
        workflow_id: "wf-1".to_string(),
        service_id: "svc-1".to_string(),
        infra_mapping_id: "infra-1".to_string(),
        environment_id: "prod".to_string(),
    }
}

fn record(id: &str, status: Status, has_data: bool, minute: u32) -> ExecutionRecord {
    ExecutionRecord {
        execution_id: id.to_string(),
        scope: scope(),
        status,
        has_analysis_data: has_data,
        finished_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, minute, 0).unwrap(),
    }
}

fn ctx(risks: Vec<RiskLevel>, tolerance: Tolerance, mode: VerificationMode) -> VerificationContext {
    VerificationContext {
        comparison_strategy: ComparisonStrategy::CompareWithPrevious,
        tolerance,
        mode,
        baseline_execution_id: Some("exec-0".to_string()),
        current_analysis: MetricAnalysis::new(risks),
    }
}

#[test]
fn fixed_baseline_wins_over_history() {
    let history = vec![record("exec-1", Status::Success, true, 1)];
    let baseline = resolve_baseline(Some("pinned"), &history, &scope(), None);
    assert_eq!(baseline, Baseline::Fixed("pinned".to_string()));
}

#[test]
fn blank_fixed_baseline_is_ignored() {
    let history = vec![record("exec-1", Status::Success, true, 1)];
    let baseline = resolve_baseline(Some("  "), &history, &scope(), None);
    assert_eq!(baseline, Baseline::Previous("exec-1".to_string()));
}

#[test]
fn latest_successful_execution_with_data_is_chosen() {
    let mut other_scope = record("exec-other", Status::Success, true, 59);
    other_scope.scope.environment_id = "staging".to_string();
    let history = vec![
        record("exec-1", Status::Success, true, 1),
        record("exec-2", Status::Success, true, 5),
        record("exec-3", Status::Failed, true, 9),
        record("exec-4", Status::Success, false, 12),
        other_scope,
    ];
    let baseline = resolve_baseline(None, &history, &scope(), None);
    assert_eq!(baseline, Baseline::Previous("exec-2".to_string()));
}

#[test]
fn current_execution_is_never_its_own_baseline() {
    let history = vec![
        record("exec-1", Status::Success, true, 1),
        record("exec-2", Status::Success, true, 5),
    ];
    let baseline = resolve_baseline(None, &history, &scope(), Some("exec-2"));
    assert_eq!(baseline, Baseline::Previous("exec-1".to_string()));
}

#[test]
fn baseline_resolution_is_deterministic_on_ties() {
    let history = vec![
        record("exec-b", Status::Success, true, 7),
        record("exec-a", Status::Success, true, 7),
    ];
    let mut reversed = history.clone();
    reversed.reverse();
    for _ in 0..5 {
        assert_eq!(
            resolve_baseline(None, &history, &scope(), None),
            Baseline::Previous("exec-b".to_string())
        );
        assert_eq!(
            resolve_baseline(None, &reversed, &scope(), None),
            Baseline::Previous("exec-b".to_string())
        );
    }
}

#[test]
fn no_history_means_no_baseline() {
    let history = vec![record("exec-1", Status::Success, false, 1)];
    let baseline = resolve_baseline(None, &history, &scope(), None);
    assert_eq!(baseline, Baseline::None);
    assert_eq!(baseline.execution_id(), None);
}

#[test]
fn missing_baseline_becomes_baseline_not_failure() {
    let mut lenient = ctx(vec![RiskLevel::High], Tolerance::Low, VerificationMode::Lenient);
    lenient.baseline_execution_id = None;
    let verdict = evaluate(&lenient);
    assert_eq!(verdict.status, Status::Success);
    assert_eq!(verdict.reason, MSG_NO_BASELINE);

    let mut strict = lenient.clone();
    strict.mode = VerificationMode::Strict;
    assert_eq!(evaluate(&strict).status, Status::Skipped);
}

#[test]
fn compare_with_current_does_not_need_a_baseline() {
    let mut current = ctx(vec![RiskLevel::Low], Tolerance::Medium, VerificationMode::Lenient);
    current.comparison_strategy = ComparisonStrategy::CompareWithCurrent;
    current.baseline_execution_id = None;
    let verdict = evaluate(&current);
    assert_eq!(verdict.status, Status::Success);
    assert_ne!(verdict.reason, MSG_NO_BASELINE);
}

#[test]
fn medium_risk_fails_only_under_low_tolerance() {
    let risks = vec![RiskLevel::Low, RiskLevel::Medium, RiskLevel::Na];
    let low = evaluate(&ctx(risks.clone(), Tolerance::Low, VerificationMode::Lenient));
    assert_eq!(low.status, Status::Failed);

    for tolerance in [Tolerance::Medium, Tolerance::High] {
        let verdict = evaluate(&ctx(risks.clone(), tolerance, VerificationMode::Lenient));
        assert_eq!(verdict.status, Status::Success);
    }
}

#[test]
fn any_high_risk_fails_regardless_of_tolerance() {
    let bases = vec![
        vec![],
        vec![RiskLevel::Low],
        vec![RiskLevel::Na, RiskLevel::Low, RiskLevel::Medium],
    ];
    for mut risks in bases {
        risks.push(RiskLevel::High);
        for tolerance in [Tolerance::Low, Tolerance::Medium, Tolerance::High] {
            for mode in [VerificationMode::Lenient, VerificationMode::Strict] {
                let verdict = decide_verdict(&MetricAnalysis::new(risks.clone()), tolerance, mode);
                assert_eq!(verdict.status, Status::Failed, "{risks:?} {tolerance:?}");
            }
        }
    }
}

#[test]
fn no_data_is_tolerated_only_in_lenient_mode() {
    let empty = MetricAnalysis::default();
    let all_na = MetricAnalysis::new(vec![RiskLevel::Na, RiskLevel::Na]);
    for analysis in [empty, all_na] {
        assert_eq!(
            decide_verdict(&analysis, Tolerance::Low, VerificationMode::Lenient).status,
            Status::Success
        );
        assert_eq!(
            decide_verdict(&analysis, Tolerance::Low, VerificationMode::Strict).status,
            Status::Failed
        );
    }
}

#[test]
fn verification_context_reads_from_json() {
    let ctx: VerificationContext = serde_json::from_str(
        r#"{"tolerance":"LOW","mode":"strict","currentAnalysis":{"perMetricRisk":["LOW","NA"]}}"#,
    )
    .unwrap();
    assert_eq!(ctx.comparison_strategy, ComparisonStrategy::CompareWithPrevious);
    assert_eq!(ctx.tolerance, Tolerance::Low);
    assert_eq!(ctx.mode, VerificationMode::Strict);
    assert_eq!(ctx.current_analysis.per_metric_risk.len(), 2);
}
