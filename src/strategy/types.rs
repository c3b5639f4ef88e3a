//! Shared types for the rebalance risk engine
//!
//! Results handed back to the orchestrator: destination summaries, value
//! stats, approvals and the read-only engine snapshot.

use ethnum::{I256, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{Address, Destination};

/// Which side of a rebalance a destination is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebalanceDirection {
    /// Funds are deposited into the destination
    In,
    /// Funds are pulled out of the destination
    Out,
}

impl std::fmt::Display for RebalanceDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RebalanceDirection::In => write!(f, "in"),
            RebalanceDirection::Out => write!(f, "out"),
        }
    }
}

impl std::str::FromStr for RebalanceDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "in" => Ok(RebalanceDirection::In),
            "out" => Ok(RebalanceDirection::Out),
            other => Err(format!("unknown direction '{}', expected in or out", other)),
        }
    }
}

/// Expected-yield summary of one destination, recomputed on every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationSummary {
    pub destination: Destination,
    #[serde(with = "crate::serde_utils::u256")]
    pub base_apr: U256,
    #[serde(with = "crate::serde_utils::u256")]
    pub fee_apr: U256,
    #[serde(with = "crate::serde_utils::u256")]
    pub incentive_apr: U256,
    #[serde(with = "crate::serde_utils::u256")]
    pub safe_total_supply: U256,
    /// Reserve-weighted, decayed and model-weighted price return
    #[serde(with = "crate::serde_utils::i256")]
    pub price_return: I256,
    /// Most extreme discount among the underlying LSTs, never below zero
    #[serde(with = "crate::serde_utils::i256")]
    pub max_discount: I256,
    /// Most extreme premium (negative discount), never above zero
    #[serde(with = "crate::serde_utils::i256")]
    pub max_premium: I256,
    #[serde(with = "crate::serde_utils::u256")]
    pub owned_shares: U256,
    #[serde(with = "crate::serde_utils::i256")]
    pub composite_return: I256,
    #[serde(with = "crate::serde_utils::u256")]
    pub price_per_share: U256,
    #[serde(with = "crate::serde_utils::u256")]
    pub slashing_cost: U256,
}

impl DestinationSummary {
    /// Summary of the idle reserve: earns nothing, risks nothing
    pub fn idle() -> Self {
        Self {
            destination: Destination::Idle,
            base_apr: U256::ZERO,
            fee_apr: U256::ZERO,
            incentive_apr: U256::ZERO,
            safe_total_supply: U256::ZERO,
            price_return: I256::ZERO,
            max_discount: I256::ZERO,
            max_premium: I256::ZERO,
            owned_shares: U256::ZERO,
            composite_return: I256::ZERO,
            price_per_share: U256::ZERO,
            slashing_cost: U256::ZERO,
        }
    }
}

/// Valuation of both legs of a proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueStats {
    #[serde(with = "crate::serde_utils::u256")]
    pub in_price: U256,
    #[serde(with = "crate::serde_utils::u256")]
    pub out_price: U256,
    #[serde(with = "crate::serde_utils::u256")]
    pub in_eth_value: U256,
    #[serde(with = "crate::serde_utils::u256")]
    pub out_eth_value: U256,
    #[serde(with = "crate::serde_utils::u256")]
    pub swap_cost: U256,
    /// `swap_cost / out_eth_value`, 1e18 = 100%
    #[serde(with = "crate::serde_utils::u256")]
    pub slippage: U256,
}

/// Why a move into idle was allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleScenario {
    DestinationShutdown,
    VaultShutdown,
    Cleanup,
    QueuedForRemoval,
    Trim,
}

/// An accepted rebalance and the numbers it was accepted on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceApproval {
    pub value_stats: ValueStats,
    /// Ceiling the slippage was checked against
    #[serde(with = "crate::serde_utils::u256")]
    pub slippage_ceiling: U256,
    /// Scenario that justified a move into idle
    pub idle_scenario: Option<IdleScenario>,
    pub in_summary: Option<DestinationSummary>,
    pub offset_period_in_days: Option<u16>,
    #[serde(default, with = "option_i256")]
    pub predicted_gain: Option<I256>,
}

mod option_i256 {
    use ethnum::I256;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<I256>, s: S) -> Result<S::Ok, S::Error> {
        value.map(|v| v.to_string()).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<I256>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|s| I256::from_str_radix(&s, 10).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// Pause state derived from `last_paused_timestamp` and the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseState {
    Active,
    Paused,
    /// Pause period elapsed but not yet cleared by a state-mutating call
    ExpiredPause,
}

/// Read-only view of the engine's adaptive state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub timestamp: u64,
    pub pause_state: PauseState,
    /// Stored period, before compute-on-read relaxation
    pub stored_offset_period_in_days: u16,
    /// Period a rebalance would be evaluated with right now
    pub current_offset_period_in_days: u16,
    pub last_rebalance_timestamp: u64,
    pub last_paused_timestamp: u64,
    pub violation_count: usize,
    pub violation_window_len: usize,
    pub nav_history_len: usize,
    pub last_add_timestamps: HashMap<Address, u64>,
}
