//! Upstream statistics snapshots consumed by the scorer and trim advisor.
//!
//! These are produced by the stats calculators and the vault; the engine only
//! reads them.

use ethnum::{I256, U256};
use serde::{Deserialize, Serialize};

use super::Address;
use crate::error::{Error, Result};

/// Number of daily discount samples kept per LST
pub const DISCOUNT_HISTORY_LEN: usize = 10;

/// Number of percent bands with a recorded crossing timestamp (1%..=5%)
pub const DISCOUNT_BANDS: usize = 5;

/// Per-LST yield and discount statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LstStats {
    pub last_snapshot_timestamp: u64,
    #[serde(with = "crate::serde_utils::u256")]
    pub base_apr: U256,
    /// Positive is a discount, negative a premium (1e18 = 100%)
    #[serde(with = "crate::serde_utils::i256")]
    pub discount: I256,
    /// Daily discount samples, 1e7 precision
    pub discount_history: [u32; DISCOUNT_HISTORY_LEN],
    /// Slot `i` holds when the discount crossed `(i + 1)%`
    pub discount_timestamp_by_percent: [u64; DISCOUNT_BANDS],
}

impl LstStats {
    /// No yield data has ever been recorded for this LST
    pub fn is_empty(&self) -> bool {
        self.base_apr == U256::ZERO && self.last_snapshot_timestamp == 0
    }
}

/// Incentive program state of a destination pool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakingIncentiveStats {
    #[serde(with = "crate::serde_utils::u256")]
    pub safe_total_supply: U256,
    pub reward_tokens: Vec<Address>,
    #[serde(with = "crate::serde_utils::u256_seq")]
    pub annualized_reward_amounts: Vec<U256>,
    pub period_finish_for_rewards: Vec<u64>,
    pub incentive_credits: u8,
}

impl StakingIncentiveStats {
    /// Reward arrays must be parallel
    pub fn validate(&self) -> Result<()> {
        let expected = self.reward_tokens.len();
        if self.annualized_reward_amounts.len() != expected {
            return Err(Error::LengthMismatch {
                what: "annualized_reward_amounts",
                expected,
                actual: self.annualized_reward_amounts.len(),
            });
        }
        if self.period_finish_for_rewards.len() != expected {
            return Err(Error::LengthMismatch {
                what: "period_finish_for_rewards",
                expected,
                actual: self.period_finish_for_rewards.len(),
            });
        }
        Ok(())
    }
}

/// Pool-level statistics of a destination
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DexLstStats {
    pub last_snapshot_timestamp: u64,
    #[serde(with = "crate::serde_utils::u256")]
    pub fee_apr: U256,
    #[serde(with = "crate::serde_utils::u256_seq")]
    pub reserves_in_eth: Vec<U256>,
    pub staking_incentive_stats: StakingIncentiveStats,
    pub lst_stats_data: Vec<LstStats>,
}

/// Vault-side bookkeeping for a destination at its last debt report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationInfo {
    #[serde(with = "crate::serde_utils::u256")]
    pub current_debt: U256,
    #[serde(with = "crate::serde_utils::u256")]
    pub owned_shares: U256,
    pub last_report: u64,
}
