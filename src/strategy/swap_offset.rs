//! Adaptive swap-cost offset
//!
//! The offset period is how many days of predicted yield advantage a
//! rebalance must cover its swap cost with. Violations (pulling out of a
//! destination before the period has elapsed since it was last added to)
//! tighten it one step at a time; quiet periods relax it. Relaxation is
//! computed on read from the time since the last rebalance, so there is no
//! background job.

use super::config::SwapCostOffsetConfig;
use crate::math::SECONDS_PER_DAY;

/// Stored period relaxed by the time since `last_rebalance`, capped at max
pub fn relaxed_period(
    config: &SwapCostOffsetConfig,
    stored: u16,
    last_rebalance: u64,
    now: u64,
) -> u16 {
    let idle_days = now.saturating_sub(last_rebalance) / SECONDS_PER_DAY;
    let steps = idle_days / u64::from(config.relax_threshold_in_days.max(1));
    let relaxed = u64::from(stored).saturating_add(steps.saturating_mul(u64::from(config.relax_step_in_days)));
    relaxed.min(u64::from(config.max_in_days)) as u16
}

/// One tighten step down from `current`, floored at min
pub fn tightened_period(config: &SwapCostOffsetConfig, current: u16) -> u16 {
    current
        .saturating_sub(config.tighten_step_in_days)
        .max(config.min_in_days)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: u64 = SECONDS_PER_DAY;

    #[test]
    fn test_no_relax_before_threshold() {
        let config = SwapCostOffsetConfig::default();
        assert_eq!(relaxed_period(&config, 28, 0, 19 * DAY), 28);
        assert_eq!(relaxed_period(&config, 28, 0, 20 * DAY - 1), 28);
    }

    #[test]
    fn test_relax_steps() {
        let config = SwapCostOffsetConfig::default();
        assert_eq!(relaxed_period(&config, 28, 0, 20 * DAY), 31);
        assert_eq!(relaxed_period(&config, 28, 0, 45 * DAY), 34);
        // Capped at max
        assert_eq!(relaxed_period(&config, 28, 0, 1_000 * DAY), 60);
    }

    #[test]
    fn test_relax_is_monotone_and_bounded() {
        let config = SwapCostOffsetConfig::default();
        let mut previous = relaxed_period(&config, 10, 0, 0);
        for day in 0..400 {
            let period = relaxed_period(&config, 10, 0, day * DAY);
            assert!(period >= previous);
            assert!(period >= config.min_in_days && period <= config.max_in_days);
            previous = period;
        }
    }

    #[test]
    fn test_tighten_floors_at_min() {
        let config = SwapCostOffsetConfig::default();
        assert_eq!(tightened_period(&config, 28), 25);
        assert_eq!(tightened_period(&config, 12), 10);
        assert_eq!(tightened_period(&config, 10), 10);
        assert_eq!(tightened_period(&config, 1), 10);
    }
}
