//! Trim Advisor
//!
//! Advises how much of a destination to keep when its LSTs trade at a
//! persistent discount, and verifies that a move into idle is either a dust
//! cleanup or a trim that does not overshoot the advice.

use ethnum::{I256, U256};

use super::config::StrategyConfig;
use crate::error::Result;
use crate::market::MarketContext;
use crate::math::{mul_div, WAD};
use crate::types::{Address, DexLstStats, RebalanceProposal};

/// Discount at which a minor trim is considered (3%)
pub const MINOR_TRIM_DISCOUNT: I256 = I256::new(30_000_000_000_000_000);

/// Discount at which a full exit is considered (5%)
pub const FULL_EXIT_DISCOUNT: I256 = I256::new(50_000_000_000_000_000);

/// History thresholds in 1e7 precision
pub const MINOR_TRIM_HISTORY_THRESHOLD: u32 = 300_000;
pub const FULL_EXIT_HISTORY_THRESHOLD: u32 = 500_000;

/// Days out of the last 10 the discount must have been above threshold
pub const TRIM_DAYS_REQUIRED: usize = 7;

/// Fraction kept on a minor trim (10%)
pub const MINOR_TRIM_KEEP: U256 = U256::new(100_000_000_000_000_000);

/// Positions below this share of total assets are dust (1 / 50 = 2%)
pub const CLEANUP_DIVISOR: U256 = U256::new(50);

/// Fraction of the destination to keep, 1e18 = keep everything, 0 = exit
pub fn trim_amount(stats: &DexLstStats) -> U256 {
    let mut keep = WAD;
    for lst in &stats.lst_stats_data {
        let minor_days = lst
            .discount_history
            .iter()
            .filter(|d| **d >= MINOR_TRIM_HISTORY_THRESHOLD)
            .count();
        let full_days = lst
            .discount_history
            .iter()
            .filter(|d| **d >= FULL_EXIT_HISTORY_THRESHOLD)
            .count();

        if lst.discount >= FULL_EXIT_DISCOUNT && full_days >= TRIM_DAYS_REQUIRED {
            return U256::ZERO;
        }
        if lst.discount >= MINOR_TRIM_DISCOUNT && minor_days >= TRIM_DAYS_REQUIRED {
            keep = keep.min(MINOR_TRIM_KEEP);
        }
    }
    keep
}

pub struct TrimAdvisor<'a> {
    market: &'a MarketContext,
    config: &'a StrategyConfig,
}

impl<'a> TrimAdvisor<'a> {
    pub fn new(market: &'a MarketContext, config: &'a StrategyConfig) -> Self {
        Self { market, config }
    }

    /// Advised fraction to keep in `destination`
    pub fn trim_amount(&self, destination: Address) -> Result<U256> {
        let stats = self.market.destination(destination)?.stats()?;
        Ok(trim_amount(&stats))
    }

    /// Vault's debt in `destination` scaled to the shares it holds right now
    fn current_debt(&self, destination: Address) -> Result<(U256, U256)> {
        let info = self.market.vault.destination_info(destination)?;
        self.market.ensure_fresh(
            "destination_info",
            info.last_report,
            self.config.stale_data_tolerance_in_seconds,
        )?;

        let shares = self.market.vault.destination_shares(destination);
        let debt = if info.owned_shares == U256::ZERO {
            U256::ZERO
        } else {
            mul_div(info.current_debt, shares, info.owned_shares, "current debt")?
        };
        Ok((debt, shares))
    }

    /// The source destination is small enough to be cleaned up
    pub fn verify_cleanup(&self, proposal: &RebalanceProposal) -> Result<bool> {
        let Some(destination) = proposal.destination_out.address() else {
            return Ok(false);
        };
        let (debt, _) = self.current_debt(destination)?;
        Ok(debt < self.market.vault.total_assets() / CLEANUP_DIVISOR)
    }

    /// The position left after the move is still at least `trim_amount` of
    /// the vault's assets
    pub fn verify_trim(&self, proposal: &RebalanceProposal, trim_amount: U256) -> Result<bool> {
        if trim_amount == U256::ZERO {
            return Ok(true);
        }
        let Some(destination) = proposal.destination_out.address() else {
            return Ok(false);
        };

        let (debt, shares) = self.current_debt(destination)?;
        let remaining = shares.saturating_sub(proposal.amount_out);
        let debt_after = self.market.destination(destination)?.debt_value(remaining)?;

        let assets_after = self
            .market
            .vault
            .total_assets()
            .saturating_add(proposal.amount_in)
            .saturating_sub(debt.saturating_sub(debt_after));
        if assets_after == U256::ZERO {
            return Ok(true);
        }

        Ok(mul_div(debt_after, WAD, assets_after, "trim ratio")? >= trim_amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::SECONDS_PER_DAY;
    use crate::scenario::testing::{addr, MarketBuilder};
    use crate::types::{Destination, DestinationInfo, LstStats};

    const E18: u128 = 1_000_000_000_000_000_000;
    const E16: i128 = 10_000_000_000_000_000;
    const NOW: u64 = 50 * SECONDS_PER_DAY;

    fn lst(discount_pct: i128, history: [u32; 10]) -> LstStats {
        LstStats {
            last_snapshot_timestamp: NOW,
            discount: I256::new(discount_pct * E16),
            discount_history: history,
            ..Default::default()
        }
    }

    fn with_lsts(lsts: Vec<LstStats>) -> DexLstStats {
        DexLstStats {
            reserves_in_eth: vec![U256::ONE; lsts.len()],
            lst_stats_data: lsts,
            ..Default::default()
        }
    }

    const SEVEN_AT_FIVE: [u32; 10] = [500_000, 500_000, 500_000, 500_000, 500_000, 500_000, 500_000, 0, 0, 0];
    const SIX_AT_FIVE: [u32; 10] = [500_000, 500_000, 500_000, 500_000, 500_000, 500_000, 0, 0, 0, 0];
    const SEVEN_AT_THREE: [u32; 10] = [300_000, 300_000, 300_000, 300_000, 300_000, 300_000, 300_000, 0, 0, 0];

    #[test]
    fn test_no_discount_keeps_everything() {
        assert_eq!(trim_amount(&with_lsts(vec![lst(0, [0; 10])])), WAD);
    }

    #[test]
    fn test_persistent_large_discount_exits() {
        let stats = with_lsts(vec![lst(3, SEVEN_AT_THREE), lst(5, SEVEN_AT_FIVE)]);
        assert_eq!(trim_amount(&stats), U256::ZERO);
    }

    #[test]
    fn test_persistent_minor_discount_trims() {
        assert_eq!(trim_amount(&with_lsts(vec![lst(3, SEVEN_AT_THREE)])), MINOR_TRIM_KEEP);
        // Large discount but only six days above 5%, still seven above 3%
        assert_eq!(trim_amount(&with_lsts(vec![lst(5, SIX_AT_FIVE)])), WAD);
        let mut history = SIX_AT_FIVE;
        history[6] = 300_000;
        assert_eq!(trim_amount(&with_lsts(vec![lst(5, history)])), MINOR_TRIM_KEEP);
    }

    #[test]
    fn test_current_discount_must_also_be_high() {
        assert_eq!(trim_amount(&with_lsts(vec![lst(2, SEVEN_AT_FIVE)])), WAD);
    }

    fn proposal(amount_out: u128) -> RebalanceProposal {
        RebalanceProposal {
            destination_in: Destination::Idle,
            token_in: addr(0xee),
            amount_in: U256::new(amount_out),
            destination_out: Destination::Vault(addr(0xd1)),
            token_out: addr(0xa1),
            amount_out: U256::new(amount_out),
        }
    }

    fn market(debt: u128, total_assets: u128, last_report: u64) -> MarketContext {
        let dest = addr(0xd1);
        MarketBuilder::new(NOW)
            .destination(dest, addr(0xa1), vec![])
            .vault_shares(dest, U256::new(debt))
            .destination_info(
                dest,
                DestinationInfo {
                    current_debt: U256::new(debt),
                    owned_shares: U256::new(debt),
                    last_report,
                },
            )
            .total_assets(U256::new(total_assets))
            .build()
    }

    #[test]
    fn test_cleanup_threshold() {
        let config = StrategyConfig::default();

        // 1.9 ETH of 100 ETH is dust
        let m = market(19 * E18 / 10, 100 * E18, NOW);
        assert!(TrimAdvisor::new(&m, &config).verify_cleanup(&proposal(E18)).unwrap());

        // Exactly 2% is not
        let m = market(2 * E18, 100 * E18, NOW);
        assert!(!TrimAdvisor::new(&m, &config).verify_cleanup(&proposal(E18)).unwrap());
    }

    #[test]
    fn test_cleanup_requires_fresh_info() {
        let config = StrategyConfig::default();
        let m = market(E18, 100 * E18, NOW - 3 * SECONDS_PER_DAY);
        assert!(TrimAdvisor::new(&m, &config).verify_cleanup(&proposal(E18)).is_err());
    }

    #[test]
    fn test_verify_trim() {
        let config = StrategyConfig::default();
        // 20 ETH position in a 100 ETH vault, shares valued 1:1
        let m = market(20 * E18, 100 * E18, NOW);
        let advisor = TrimAdvisor::new(&m, &config);

        // Down to 10 of 100: exactly the 10% the advice keeps
        assert!(advisor.verify_trim(&proposal(10 * E18), MINOR_TRIM_KEEP).unwrap());
        // Down to 5 of 100 overshoots
        assert!(!advisor.verify_trim(&proposal(15 * E18), MINOR_TRIM_KEEP).unwrap());
        // Full exit advice allows anything
        assert!(advisor.verify_trim(&proposal(20 * E18), U256::ZERO).unwrap());
    }
}
