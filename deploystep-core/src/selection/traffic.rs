use crate::selection::SelectionRules;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrafficShiftError {
    #[error("Traffic shift percentage must be greater than 0")]
    Zero,
    #[error("Traffic shift percentage {percent}% exceeds the allowed maximum of {max}%")]
    AboveLimit { percent: u32, max: u32 },
}

/// Reject traffic shifts of 0% or above the configured bound.
///
/// `relaxed` selects the relaxed upper bound (feature-flagged).
pub fn check_traffic_shift(
    percent: u32,
    rules: &SelectionRules,
    relaxed: bool,
) -> Result<(), TrafficShiftError> {
    if percent == 0 {
        return Err(TrafficShiftError::Zero);
    }
    let max = if relaxed {
        rules.relaxed_max_traffic_shift_percent
    } else {
        rules.max_traffic_shift_percent
    };
    if percent > max {
        return Err(TrafficShiftError::AboveLimit { percent, max });
    }
    Ok(())
}
