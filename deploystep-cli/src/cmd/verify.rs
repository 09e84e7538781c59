use std::path::Path;

use deploystep_core::types::{
    BaselineScope, ComparisonStrategy, ExecutionRecord, MetricAnalysis, Tolerance,
    VerificationContext, VerificationMode,
};
use deploystep_core::{evaluate, resolve_baseline, Baseline};
use serde_json::json;

use crate::error::CliError;
use crate::exit_codes;
use crate::output::print_result;
use crate::utils::load_document;
use crate::{OutputArgs, ScopeArgs};

pub struct VerifyArgs<'a> {
    pub analysis: &'a Path,
    pub history: Option<&'a Path>,
    pub baseline: Option<&'a str>,
    pub execution: Option<&'a str>,
    pub scope: ScopeArgs,
    pub tolerance: Tolerance,
    pub mode: VerificationMode,
    pub strategy: ComparisonStrategy,
}

pub fn verify_cmd(output: &OutputArgs, args: VerifyArgs<'_>) -> Result<i32, CliError> {
    let analysis: MetricAnalysis = load_document(args.analysis)?;
    let history: Vec<ExecutionRecord> = match args.history {
        Some(path) => load_document(path)?,
        None => Vec::new(),
    };
    let scope = BaselineScope {
        workflow_id: args.scope.workflow,
        service_id: args.scope.service,
        infra_mapping_id: args.scope.infra,
        environment_id: args.scope.environment,
    };

    let baseline = match args.strategy {
        ComparisonStrategy::CompareWithCurrent => Baseline::None,
        ComparisonStrategy::CompareWithPrevious => {
            resolve_baseline(args.baseline, &history, &scope, args.execution)
        }
    };
    let verdict = evaluate(&VerificationContext {
        comparison_strategy: args.strategy,
        tolerance: args.tolerance,
        mode: args.mode,
        baseline_execution_id: baseline.execution_id().map(str::to_string),
        current_analysis: analysis,
    });

    tracing::info!(status = %verdict.status.as_str(), reason = %verdict.reason, "verification decided");
    let code = if verdict.status.is_success() {
        exit_codes::SUCCESS
    } else {
        exit_codes::STEP_FAILED
    };
    print_result(
        output.format,
        output.quiet,
        &json!({ "baseline": baseline, "verdict": verdict }),
    );
    Ok(code)
}
