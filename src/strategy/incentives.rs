//! Incentive APR
//!
//! Annualized value of the reward programs running on a destination pool,
//! relative to the pool's total supply. Which programs count depends on the
//! direction: when exiting, anything still running (or just expired while the
//! destination holds incentive credits) counts; when entering, only programs
//! that will keep running long enough to matter do.

use ethnum::U256;

use super::types::RebalanceDirection;
use crate::error::Result;
use crate::market::MarketContext;
use crate::math::{checked_add, mul_div, ten_pow, SECONDS_PER_DAY, WAD};
use crate::types::{Address, StakingIncentiveStats};

/// Grace period for expired programs when exiting with incentive credits
pub const EXPIRED_REWARD_TOLERANCE_SECS: u64 = 2 * SECONDS_PER_DAY;

/// Remaining program duration required to count it when entering
pub const MIN_REMAINING_ON_ENTER_SECS: u64 = 7 * SECONDS_PER_DAY;

/// Remaining program duration required when entering with incentive credits
pub const MIN_REMAINING_ON_ENTER_WITH_CREDITS_SECS: u64 = 3 * SECONDS_PER_DAY;

/// Does a program finishing at `period_finish` count for this direction
pub fn reward_qualifies(
    direction: RebalanceDirection,
    period_finish: u64,
    has_credits: bool,
    now: u64,
) -> bool {
    match direction {
        RebalanceDirection::Out => {
            let tolerance = if has_credits {
                EXPIRED_REWARD_TOLERANCE_SECS
            } else {
                0
            };
            period_finish.saturating_add(tolerance) >= now
        }
        RebalanceDirection::In => {
            period_finish >= now.saturating_add(MIN_REMAINING_ON_ENTER_SECS)
                || (has_credits
                    && period_finish >= now.saturating_add(MIN_REMAINING_ON_ENTER_WITH_CREDITS_SECS))
        }
    }
}

/// Inputs describing the destination's LP token
#[derive(Debug, Clone, Copy)]
pub struct LpToken {
    pub token: Address,
    pub price: U256,
}

/// Annualized incentive APR of a destination, 1e18 = 100%
pub fn incentive_apr(
    market: &MarketContext,
    stats: &StakingIncentiveStats,
    direction: RebalanceDirection,
    lp: LpToken,
    amount: U256,
    stale_tolerance: u64,
) -> Result<U256> {
    stats.validate()?;

    let now = market.now();
    let has_credits = stats.incentive_credits > 0;
    let mut total = U256::ZERO;
    let mut any_qualified = false;

    let rewards = stats
        .reward_tokens
        .iter()
        .zip(&stats.annualized_reward_amounts)
        .zip(&stats.period_finish_for_rewards);

    for ((token, rate), period_finish) in rewards {
        if token.is_zero() {
            continue;
        }
        let (fast, slow) = market.incentives.price(*token, stale_tolerance)?;
        let price = fast.min(slow);
        if price == U256::ZERO {
            continue;
        }
        if !reward_qualifies(direction, *period_finish, has_credits, now) {
            continue;
        }

        let decimals = market.tokens.decimals(*token)?;
        let value = mul_div(*rate, price, ten_pow(decimals)?, "incentive reward value")?;
        total = checked_add(total, value, "incentive total")?;
        any_qualified = true;
    }

    if !any_qualified {
        return Ok(U256::ZERO);
    }

    let mut supply = stats.safe_total_supply;
    if direction == RebalanceDirection::In {
        supply = checked_add(supply, amount, "incentive supply")?;
    }
    let lp_decimals = market.tokens.decimals(lp.token)?;
    let supply_in_eth = mul_div(supply, lp.price, ten_pow(lp_decimals)?, "incentive supply value")?;

    if supply_in_eth == U256::ZERO {
        return Ok(total);
    }
    mul_div(total, WAD, supply_in_eth, "incentive apr")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::testing::{addr, MarketBuilder};

    const DAY: u64 = SECONDS_PER_DAY;
    const NOW: u64 = 100 * DAY;
    const E18: u128 = 1_000_000_000_000_000_000;

    #[test]
    fn test_out_direction_qualification() {
        assert!(reward_qualifies(RebalanceDirection::Out, NOW, false, NOW));
        assert!(!reward_qualifies(RebalanceDirection::Out, NOW - 1, false, NOW));
        assert!(reward_qualifies(RebalanceDirection::Out, NOW - 2 * DAY, true, NOW));
        assert!(!reward_qualifies(RebalanceDirection::Out, NOW - 2 * DAY - 1, true, NOW));
    }

    #[test]
    fn test_in_direction_qualification() {
        assert!(reward_qualifies(RebalanceDirection::In, NOW + 7 * DAY, false, NOW));
        assert!(!reward_qualifies(RebalanceDirection::In, NOW + 6 * DAY, false, NOW));
        assert!(reward_qualifies(RebalanceDirection::In, NOW + 3 * DAY, true, NOW));
        assert!(!reward_qualifies(RebalanceDirection::In, NOW + 3 * DAY - 1, true, NOW));
    }

    fn stats(finish: u64) -> StakingIncentiveStats {
        StakingIncentiveStats {
            safe_total_supply: U256::new(100 * E18),
            reward_tokens: vec![addr(0x71), Address::ZERO],
            annualized_reward_amounts: vec![U256::new(10 * E18), U256::new(999 * E18)],
            period_finish_for_rewards: vec![finish, finish],
            incentive_credits: 0,
        }
    }

    #[test]
    fn test_apr_relative_to_supply() {
        let lp = addr(0xa1);
        // Reward token worth 0.5 ETH (min of fast / slow)
        let market = MarketBuilder::new(NOW)
            .incentive_price(addr(0x71), U256::new(E18 / 2), U256::new(E18))
            .build();
        let lp = LpToken {
            token: lp,
            price: U256::new(E18),
        };

        // 10 tokens * 0.5 ETH = 5 ETH per year over 100 ETH of supply = 5%
        let apr = incentive_apr(&market, &stats(NOW), RebalanceDirection::Out, lp, U256::ZERO, DAY)
            .unwrap();
        assert_eq!(apr, U256::new(E18 / 20));

        // Entering adds the deposit to the supply, but the program ends too soon
        let apr = incentive_apr(
            &market,
            &stats(NOW),
            RebalanceDirection::In,
            lp,
            U256::new(100 * E18),
            DAY,
        )
        .unwrap();
        assert_eq!(apr, U256::ZERO);

        let apr = incentive_apr(
            &market,
            &stats(NOW + 30 * DAY),
            RebalanceDirection::In,
            lp,
            U256::new(100 * E18),
            DAY,
        )
        .unwrap();
        assert_eq!(apr, U256::new(E18 / 40));
    }

    #[test]
    fn test_unpriced_reward_is_skipped() {
        let market = MarketBuilder::new(NOW).build();
        let lp = LpToken {
            token: addr(0xa1),
            price: U256::new(E18),
        };
        let apr = incentive_apr(&market, &stats(NOW), RebalanceDirection::Out, lp, U256::ZERO, DAY)
            .unwrap();
        assert_eq!(apr, U256::ZERO);
    }

    #[test]
    fn test_zero_supply_returns_raw_total() {
        let market = MarketBuilder::new(NOW)
            .incentive_price(addr(0x71), U256::new(E18), U256::new(E18))
            .build();
        let mut s = stats(NOW);
        s.safe_total_supply = U256::ZERO;
        let lp = LpToken {
            token: addr(0xa1),
            price: U256::new(E18),
        };
        let apr = incentive_apr(&market, &s, RebalanceDirection::Out, lp, U256::ZERO, DAY).unwrap();
        assert_eq!(apr, U256::new(10 * E18));
    }
}
