use crate::types::{CountUnit, PhaseStyle};

/// Instances a percentage of `pool_size` amounts to.
///
/// Rounds half up and never yields zero for a positive percentage of a
/// non-empty pool. Percentages above 100 are treated as 100.
pub fn percentage_count(percent: u32, pool_size: usize) -> usize {
    let percent = u64::from(percent.min(100));
    if percent == 0 || pool_size == 0 {
        return 0;
    }
    let n = pool_size as u64;
    let rounded = (percent * n + 50) / 100;
    rounded.clamp(1, n) as usize
}

/// Number of instances a phase should act on.
///
/// A count larger than the pool is clamped to the pool size. Rolling phases
/// use that count as-is; other phases subtract what earlier phases already
/// used.
pub fn target_count(
    unit: CountUnit,
    desired: u32,
    pool_size: usize,
    excluded: usize,
    phase: PhaseStyle,
) -> usize {
    let count = match unit {
        CountUnit::Count => (desired as usize).min(pool_size),
        CountUnit::Percentage => percentage_count(desired, pool_size),
    };
    match phase {
        PhaseStyle::Rolling => count,
        PhaseStyle::Canary | PhaseStyle::Basic => count.saturating_sub(excluded),
    }
}

