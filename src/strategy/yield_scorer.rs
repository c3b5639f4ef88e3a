//! Yield Scorer
//!
//! Builds the expected-return summary of a destination from its pool and LST
//! statistics:
//!
//! - base yield: staking APR of the underlying LSTs, weighted by reserve
//! - fee yield: trading fees earned by the pool
//! - incentive yield: reward programs (see [`super::incentives`])
//! - price return: decayed LST discounts / premiums, weighted by reserve and
//!   by the direction-dependent model weight
//!
//! The composite return is the weighted sum of all four. Summaries are never
//! cached; every call reads fresh statistics.

use ethnum::{I256, U256};

use super::config::StrategyConfig;
use super::incentives::{incentive_apr, LpToken};
use super::price_return::decayed_discount;
use super::types::{DestinationSummary, RebalanceDirection};
use crate::error::{Error, Result};
use crate::market::MarketContext;
use crate::math::{
    checked_add, checked_add_signed, mul_div_signed, to_signed, WEIGHT_PRECISION,
};
use crate::types::Destination;

pub struct YieldScorer<'a> {
    market: &'a MarketContext,
    config: &'a StrategyConfig,
}

impl<'a> YieldScorer<'a> {
    pub fn new(market: &'a MarketContext, config: &'a StrategyConfig) -> Self {
        Self { market, config }
    }

    /// Summarize `destination` for a move of `amount` in `direction`, with the
    /// destination's LP token priced at `price`
    pub fn score(
        &self,
        destination: Destination,
        price: U256,
        direction: RebalanceDirection,
        amount: U256,
    ) -> Result<DestinationSummary> {
        let Some(address) = destination.address() else {
            return Ok(DestinationSummary::idle());
        };

        let vault = self.market.destination(address)?;
        let stats = vault.stats()?;
        let tolerance = self.config.stale_data_tolerance_in_seconds;
        self.market
            .ensure_fresh("dex_stats", stats.last_snapshot_timestamp, tolerance)?;

        if stats.reserves_in_eth.len() != stats.lst_stats_data.len() {
            return Err(Error::LengthMismatch {
                what: "reserves_in_eth",
                expected: stats.lst_stats_data.len(),
                actual: stats.reserves_in_eth.len(),
            });
        }

        let now = self.market.now();
        let weights = &self.config.model_weights;
        let discount_weight = match direction {
            RebalanceDirection::In => weights.discount_enter(),
            RebalanceDirection::Out => weights.discount_exit(),
        };
        let max_allowed_discount =
            to_signed(self.config.max_allowed_discount, "max_allowed_discount")?;

        let mut reserves_total = U256::ZERO;
        let mut base_apr = U256::ZERO;
        let mut price_return = I256::ZERO;
        let mut max_discount = I256::ZERO;
        let mut max_premium = I256::ZERO;

        for (lst, reserve) in stats.lst_stats_data.iter().zip(&stats.reserves_in_eth) {
            reserves_total = checked_add(reserves_total, *reserve, "reserves total")?;
            let reserve_signed = to_signed(*reserve, "reserve")?;

            let decayed = decayed_discount(lst, max_allowed_discount, now);
            let weight = if decayed > I256::ZERO {
                discount_weight
            } else {
                weights.premium()
            };
            let weighted = decayed
                .checked_mul(reserve_signed)
                .ok_or(Error::NumericOverflow("price return"))?;
            let weighted = mul_div_signed(weighted, weight, WEIGHT_PRECISION, "price return")?;
            price_return = checked_add_signed(price_return, weighted, "price return")?;

            if lst.is_empty() {
                continue;
            }
            self.market
                .ensure_fresh("lst_stats", lst.last_snapshot_timestamp, tolerance)?;

            let contribution = lst
                .base_apr
                .checked_mul(*reserve)
                .ok_or(Error::NumericOverflow("base apr"))?;
            base_apr = checked_add(base_apr, contribution, "base apr")?;

            max_discount = max_discount.max(lst.discount);
            max_premium = max_premium.min(lst.discount);
        }

        if reserves_total > U256::ZERO {
            base_apr /= reserves_total;
            price_return /= to_signed(reserves_total, "reserves total")?;
        }

        let incentive_apr = incentive_apr(
            self.market,
            &stats.staking_incentive_stats,
            direction,
            LpToken {
                token: vault.underlying(),
                price,
            },
            amount,
            tolerance,
        )?;

        let composite = [
            (base_apr, weights.base(), "base yield"),
            (stats.fee_apr, weights.fee(), "fee yield"),
            (incentive_apr, weights.incentive(), "incentive yield"),
        ]
        .into_iter()
        .try_fold(price_return, |acc, (apr, weight, what)| {
            let weighted = mul_div_signed(to_signed(apr, what)?, weight, WEIGHT_PRECISION, what)?;
            checked_add_signed(acc, weighted, "composite return")
        })?;

        tracing::debug!(
            destination = %address,
            %direction,
            base_apr = %base_apr,
            fee_apr = %stats.fee_apr,
            incentive_apr = %incentive_apr,
            price_return = %price_return,
            composite = %composite,
            "Scored destination"
        );

        Ok(DestinationSummary {
            destination,
            base_apr,
            fee_apr: stats.fee_apr,
            incentive_apr,
            safe_total_supply: stats.staking_incentive_stats.safe_total_supply,
            price_return,
            max_discount,
            max_premium,
            owned_shares: self.market.vault.destination_shares(address),
            composite_return: composite,
            price_per_share: price,
            slashing_cost: U256::ZERO,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::SECONDS_PER_DAY;
    use crate::scenario::testing::{addr, MarketBuilder};
    use crate::types::{DexLstStats, LstStats, StakingIncentiveStats};

    const E16: u128 = 10_000_000_000_000_000;
    const E18: u128 = 1_000_000_000_000_000_000;
    const NOW: u64 = 200 * SECONDS_PER_DAY;

    fn lst(base_apr: u128, discount: i128) -> LstStats {
        LstStats {
            last_snapshot_timestamp: NOW,
            base_apr: U256::new(base_apr),
            discount: I256::new(discount),
            ..Default::default()
        }
    }

    /// Two LSTs: 12 ETH at 4% base with a 1% discount, 18 ETH at 5% base with
    /// a 1.2% premium, 1% fee APR
    fn pool_stats() -> DexLstStats {
        DexLstStats {
            last_snapshot_timestamp: NOW,
            fee_apr: U256::new(E16),
            reserves_in_eth: vec![U256::new(12 * E18), U256::new(18 * E18)],
            staking_incentive_stats: StakingIncentiveStats::default(),
            lst_stats_data: vec![lst(4 * E16, E16 as i128), lst(5 * E16, -12 * E16 as i128 / 10)],
        }
    }

    fn score(stats: DexLstStats, direction: RebalanceDirection) -> Result<DestinationSummary> {
        let dest = addr(0xd1);
        let market = MarketBuilder::new(NOW)
            .destination(dest, addr(0xa1), vec![addr(0x11), addr(0x12)])
            .stats(dest, stats)
            .incentive_price(addr(0x71), U256::new(E18), U256::new(E18))
            .build();
        let config = StrategyConfig::default();
        YieldScorer::new(&market, &config).score(
            Destination::Vault(dest),
            U256::new(E18),
            direction,
            U256::new(E18),
        )
    }

    #[test]
    fn test_idle_summary_is_zero() {
        let market = MarketBuilder::new(NOW).build();
        let config = StrategyConfig::default();
        let summary = YieldScorer::new(&market, &config)
            .score(Destination::Idle, U256::new(E18), RebalanceDirection::In, U256::ONE)
            .unwrap();
        assert_eq!(summary, DestinationSummary::idle());
    }

    #[test]
    fn test_composite_entering() {
        let summary = score(pool_stats(), RebalanceDirection::In).unwrap();

        // (0.04 * 12 + 0.05 * 18) / 30
        assert_eq!(summary.base_apr, U256::new(46_000_000_000_000_000));
        // Discount weighted by 0 on entry, premium by 1: -0.012 * 18 / 30
        assert_eq!(summary.price_return, I256::new(-7_200_000_000_000_000));
        assert_eq!(summary.composite_return, I256::new(48_800_000_000_000_000));
        assert_eq!(summary.max_discount, I256::new(E16 as i128));
        assert_eq!(summary.max_premium, I256::new(-12 * E16 as i128 / 10));
    }

    #[test]
    fn test_composite_exiting() {
        let summary = score(pool_stats(), RebalanceDirection::Out).unwrap();

        // Discount weighted by 0.75 on exit: (0.01 * 12 * 0.75 - 0.012 * 18) / 30
        assert_eq!(summary.price_return, I256::new(-4_200_000_000_000_000));
        assert_eq!(summary.composite_return, I256::new(51_800_000_000_000_000));
    }

    #[test]
    fn test_incentive_apr_counts_on_exit_only() {
        // One reward program worth ~1.1363 ETH a year over 30 ETH of supply,
        // ending tomorrow: too soon to count when entering
        let mut stats = pool_stats();
        stats.staking_incentive_stats = StakingIncentiveStats {
            safe_total_supply: U256::new(30 * E18),
            reward_tokens: vec![addr(0x71)],
            annualized_reward_amounts: vec![U256::new(1_136_333_333_333_333_333)],
            period_finish_for_rewards: vec![NOW + SECONDS_PER_DAY],
            incentive_credits: 0,
        };

        let out = score(stats.clone(), RebalanceDirection::Out).unwrap();
        assert_eq!(out.incentive_apr, U256::new(37_877_777_777_777_777));
        // 5.18% + 0.9 * 3.7878%
        assert_eq!(out.composite_return, I256::new(85_889_999_999_999_999));

        let inn = score(stats, RebalanceDirection::In).unwrap();
        assert_eq!(inn.incentive_apr, U256::ZERO);
        assert_eq!(inn.composite_return, I256::new(48_800_000_000_000_000));
    }

    #[test]
    fn test_lst_without_data_only_adds_reserve() {
        let mut stats = pool_stats();
        stats.lst_stats_data[1] = LstStats::default();
        let summary = score(stats, RebalanceDirection::In).unwrap();

        // 0.04 * 12 / 30
        assert_eq!(summary.base_apr, U256::new(16_000_000_000_000_000));
        assert_eq!(summary.max_premium, I256::ZERO);
    }

    #[test]
    fn test_stale_pool_stats_rejected() {
        let mut stats = pool_stats();
        stats.last_snapshot_timestamp = NOW - 3 * SECONDS_PER_DAY;
        assert!(matches!(
            score(stats, RebalanceDirection::In),
            Err(Error::StaleData { feed: "dex_stats", .. })
        ));
    }

    #[test]
    fn test_stale_lst_stats_rejected() {
        let mut stats = pool_stats();
        stats.lst_stats_data[0].last_snapshot_timestamp = NOW - 3 * SECONDS_PER_DAY;
        assert!(matches!(
            score(stats, RebalanceDirection::Out),
            Err(Error::StaleData { feed: "lst_stats", .. })
        ));
    }

    #[test]
    fn test_reserve_length_mismatch() {
        let mut stats = pool_stats();
        stats.reserves_in_eth.pop();
        assert!(matches!(
            score(stats, RebalanceDirection::In),
            Err(Error::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_zero_reserves_leave_rates_zero() {
        let mut stats = pool_stats();
        stats.reserves_in_eth = vec![U256::ZERO, U256::ZERO];
        let summary = score(stats, RebalanceDirection::In).unwrap();
        assert_eq!(summary.base_apr, U256::ZERO);
        assert_eq!(summary.price_return, I256::ZERO);
        assert_eq!(summary.composite_return, I256::new(E16 as i128));
    }
}
