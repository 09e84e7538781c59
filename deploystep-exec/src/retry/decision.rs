use std::time::Duration;

use deploystep_core::FailureClass;

use crate::retry::config::RetryConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter { delay: Duration, reason: RetryReason },
    Stop { reason: RetryReason },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    NotRetryable(FailureClass),
    AttemptsExhausted,
    Backoff,
}

/// Decide if a failed attempt should be re-run and how long to wait.
///
/// - `attempt_no`: 1-based number of the attempt that just failed.
/// - `class`: classification of the failure.
/// - `rand_u64`: RNG for full jitter.
pub fn decide_retry(
    cfg: &RetryConfig,
    attempt_no: usize,
    class: FailureClass,
    rand_u64: impl Fn() -> u64,
) -> RetryDecision {
    if !cfg.retry_on.contains(&class) {
        return RetryDecision::Stop {
            reason: RetryReason::NotRetryable(class),
        };
    }

    if attempt_no >= cfg.max_attempts.max(1) {
        return RetryDecision::Stop {
            reason: RetryReason::AttemptsExhausted,
        };
    }

    // Exponential backoff: base * factor^(attempt_no-1), with full jitter.
    let exp = (attempt_no.saturating_sub(1)) as i32;
    let raw = (cfg.base_delay().as_millis() as f64) * cfg.factor.powi(exp);
    let raw_ms = raw.min(cfg.max_delay().as_millis() as f64).max(0.0) as u64;

    let jitter_ms = if raw_ms == 0 { 0 } else { rand_u64() % (raw_ms + 1) };
    RetryDecision::RetryAfter {
        delay: Duration::from_millis(jitter_ms),
        reason: RetryReason::Backoff,
    }
}
