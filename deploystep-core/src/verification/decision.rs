use crate::types::{
    ComparisonStrategy, MetricAnalysis, RiskLevel, Status, Tolerance, Verdict,
    VerificationContext, VerificationMode,
};

pub const MSG_NO_BASELINE: &str = "No baseline found; this execution becomes the baseline";

/// Verdict for a verification phase whose baseline has already been resolved
/// into `ctx.baseline_execution_id`.
///
/// Comparing with a previous execution that does not exist is not a failure:
/// lenient mode reports `SUCCESS`, strict mode `SKIPPED`.
pub fn evaluate(ctx: &VerificationContext) -> Verdict {
    if ctx.comparison_strategy == ComparisonStrategy::CompareWithPrevious
        && ctx.baseline_execution_id.is_none()
    {
        let status = match ctx.mode {
            VerificationMode::Lenient => Status::Success,
            VerificationMode::Strict => Status::Skipped,
        };
        return Verdict {
            status,
            reason: MSG_NO_BASELINE.to_string(),
        };
    }
    decide_verdict(&ctx.current_analysis, ctx.tolerance, ctx.mode)
}

/// Aggregate per-metric risk into pass/fail.
pub fn decide_verdict(
    analysis: &MetricAnalysis,
    tolerance: Tolerance,
    mode: VerificationMode,
) -> Verdict {
    if !analysis.has_analyzable_data() {
        return match mode {
            VerificationMode::Lenient => Verdict {
                status: Status::Success,
                reason: "No analyzable metrics were collected; accepted in lenient mode".to_string(),
            },
            VerificationMode::Strict => Verdict {
                status: Status::Failed,
                reason: "No analyzable metrics were collected".to_string(),
            },
        };
    }

    let risks = &analysis.per_metric_risk;
    let high = risks.iter().filter(|r| **r == RiskLevel::High).count();
    if high > 0 {
        return Verdict {
            status: Status::Failed,
            reason: format!("{high} metric(s) at HIGH risk"),
        };
    }

    if tolerance == Tolerance::Low {
        let above_low = risks
            .iter()
            .filter(|r| !matches!(**r, RiskLevel::Low | RiskLevel::Na))
            .count();
        if above_low > 0 {
            return Verdict {
                status: Status::Failed,
                reason: format!("{above_low} metric(s) above LOW risk with LOW tolerance"),
            };
        }
    }

    let analyzed = risks.iter().filter(|r| **r != RiskLevel::Na).count();
    Verdict {
        status: Status::Success,
        reason: format!("All {analyzed} analyzed metric(s) within tolerance"),
    }
}
