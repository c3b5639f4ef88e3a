//! Strategy configuration
//!
//! Immutable once an engine is built. Every field has a production default so
//! a config file only needs to name what it overrides.

use ethnum::{I256, U256};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::math::{to_signed, WAD};
use crate::tracking::{NAV_HISTORY_CAPACITY, VIOLATION_WINDOW};

/// Adaptive swap-cost offset bounds and step sizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapCostOffsetConfig {
    /// Period the engine starts at
    #[serde(default = "default_offset_init")]
    pub init_in_days: u16,

    /// Violations within the last 10 rebalances that trigger a tighten
    #[serde(default = "default_tighten_threshold")]
    pub tighten_threshold_in_violations: u16,

    #[serde(default = "default_tighten_step")]
    pub tighten_step_in_days: u16,

    /// Days without a rebalance per relax step
    #[serde(default = "default_relax_threshold")]
    pub relax_threshold_in_days: u16,

    #[serde(default = "default_relax_step")]
    pub relax_step_in_days: u16,

    #[serde(default = "default_offset_max")]
    pub max_in_days: u16,

    #[serde(default = "default_offset_min")]
    pub min_in_days: u16,
}

impl Default for SwapCostOffsetConfig {
    fn default() -> Self {
        Self {
            init_in_days: default_offset_init(),
            tighten_threshold_in_violations: default_tighten_threshold(),
            tighten_step_in_days: default_tighten_step(),
            relax_threshold_in_days: default_relax_threshold(),
            relax_step_in_days: default_relax_step(),
            max_in_days: default_offset_max(),
            min_in_days: default_offset_min(),
        }
    }
}

/// Days back the NAV-decay check compares against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavLookbackConfig {
    #[serde(default = "default_lookback1")]
    pub lookback1_in_days: u8,
    #[serde(default = "default_lookback2")]
    pub lookback2_in_days: u8,
    #[serde(default = "default_lookback3")]
    pub lookback3_in_days: u8,
}

impl Default for NavLookbackConfig {
    fn default() -> Self {
        Self {
            lookback1_in_days: default_lookback1(),
            lookback2_in_days: default_lookback2(),
            lookback3_in_days: default_lookback3(),
        }
    }
}

/// Slippage ceilings per operation kind (1e18 = 100%)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlippageConfig {
    #[serde(default = "default_normal_slippage", with = "crate::serde_utils::u256")]
    pub max_normal_operation_slippage: U256,
    #[serde(default = "default_trim_slippage", with = "crate::serde_utils::u256")]
    pub max_trim_operation_slippage: U256,
    #[serde(default = "default_emergency_slippage", with = "crate::serde_utils::u256")]
    pub max_emergency_operation_slippage: U256,
    #[serde(default = "default_shutdown_slippage", with = "crate::serde_utils::u256")]
    pub max_shutdown_operation_slippage: U256,
}

impl Default for SlippageConfig {
    fn default() -> Self {
        Self {
            max_normal_operation_slippage: default_normal_slippage(),
            max_trim_operation_slippage: default_trim_slippage(),
            max_emergency_operation_slippage: default_emergency_slippage(),
            max_shutdown_operation_slippage: default_shutdown_slippage(),
        }
    }
}

/// Composite-return weights, 1e6 = 1.0
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelWeights {
    #[serde(default = "default_weight_one")]
    pub base_yield: i64,
    #[serde(default = "default_weight_one")]
    pub fee_yield: i64,
    #[serde(default = "default_incentive_weight")]
    pub incentive_yield: i64,
    /// Accepted for completeness, slashing cost is not part of the composite
    #[serde(default = "default_weight_one")]
    pub slashing: i64,
    #[serde(default = "default_discount_exit_weight")]
    pub price_discount_exit: i64,
    #[serde(default)]
    pub price_discount_enter: i64,
    #[serde(default = "default_weight_one")]
    pub price_premium: i64,
}

impl Default for ModelWeights {
    fn default() -> Self {
        Self {
            base_yield: default_weight_one(),
            fee_yield: default_weight_one(),
            incentive_yield: default_incentive_weight(),
            slashing: default_weight_one(),
            price_discount_exit: default_discount_exit_weight(),
            price_discount_enter: 0,
            price_premium: default_weight_one(),
        }
    }
}

impl ModelWeights {
    pub fn base(&self) -> I256 {
        I256::new(self.base_yield as i128)
    }

    pub fn fee(&self) -> I256 {
        I256::new(self.fee_yield as i128)
    }

    pub fn incentive(&self) -> I256 {
        I256::new(self.incentive_yield as i128)
    }

    pub fn discount_exit(&self) -> I256 {
        I256::new(self.price_discount_exit as i128)
    }

    pub fn discount_enter(&self) -> I256 {
        I256::new(self.price_discount_enter as i128)
    }

    pub fn premium(&self) -> I256 {
        I256::new(self.price_premium as i128)
    }
}

/// Full risk-engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(default)]
    pub swap_cost_offset: SwapCostOffsetConfig,

    #[serde(default)]
    pub nav_lookback: NavLookbackConfig,

    #[serde(default)]
    pub slippage: SlippageConfig,

    #[serde(default)]
    pub model_weights: ModelWeights,

    /// How long a NAV-decay pause blocks new deployments
    #[serde(default = "default_pause_period")]
    pub pause_rebalance_period_in_days: u16,

    /// Largest premium tolerated on the destination being entered
    #[serde(default = "default_max_premium", with = "crate::serde_utils::u256")]
    pub max_premium: U256,

    /// Largest discount tolerated on the destination being entered
    #[serde(default = "default_max_discount", with = "crate::serde_utils::u256")]
    pub max_discount: U256,

    /// Per-LST discount cap applied before decay
    #[serde(default = "default_max_allowed_discount", with = "crate::serde_utils::u256")]
    pub max_allowed_discount: U256,

    /// Safe vs spot divergence tolerance in bps
    #[serde(default = "default_gap_tolerance")]
    pub lst_price_gap_tolerance: u32,

    #[serde(default = "default_stale_tolerance")]
    pub stale_data_tolerance_in_seconds: u64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            swap_cost_offset: SwapCostOffsetConfig::default(),
            nav_lookback: NavLookbackConfig::default(),
            slippage: SlippageConfig::default(),
            model_weights: ModelWeights::default(),
            pause_rebalance_period_in_days: default_pause_period(),
            max_premium: default_max_premium(),
            max_discount: default_max_discount(),
            max_allowed_discount: default_max_allowed_discount(),
            lst_price_gap_tolerance: default_gap_tolerance(),
            stale_data_tolerance_in_seconds: default_stale_tolerance(),
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> Error {
    Error::InvalidConfig {
        field,
        reason: reason.into(),
    }
}

impl StrategyConfig {
    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        let offset = &self.swap_cost_offset;
        if offset.min_in_days >= offset.max_in_days {
            return Err(invalid(
                "swap_cost_offset.min_in_days",
                format!("{} must be below max {}", offset.min_in_days, offset.max_in_days),
            ));
        }
        if offset.init_in_days < offset.min_in_days || offset.init_in_days > offset.max_in_days {
            return Err(invalid(
                "swap_cost_offset.init_in_days",
                format!(
                    "{} outside [{}, {}]",
                    offset.init_in_days, offset.min_in_days, offset.max_in_days
                ),
            ));
        }
        if offset.relax_threshold_in_days == 0 {
            return Err(invalid("swap_cost_offset.relax_threshold_in_days", "must be non-zero"));
        }
        if offset.relax_step_in_days == 0 {
            return Err(invalid("swap_cost_offset.relax_step_in_days", "must be non-zero"));
        }
        if offset.tighten_step_in_days == 0 {
            return Err(invalid("swap_cost_offset.tighten_step_in_days", "must be non-zero"));
        }
        if offset.tighten_threshold_in_violations == 0
            || offset.tighten_threshold_in_violations as usize > VIOLATION_WINDOW
        {
            return Err(invalid(
                "swap_cost_offset.tighten_threshold_in_violations",
                format!("must be in [1, {}]", VIOLATION_WINDOW),
            ));
        }

        let nav = &self.nav_lookback;
        if nav.lookback1_in_days == 0 {
            return Err(invalid("nav_lookback.lookback1_in_days", "must be non-zero"));
        }
        if nav.lookback1_in_days >= nav.lookback2_in_days
            || nav.lookback2_in_days >= nav.lookback3_in_days
        {
            return Err(invalid("nav_lookback", "lookbacks must be strictly increasing"));
        }
        if nav.lookback3_in_days as usize >= NAV_HISTORY_CAPACITY {
            return Err(invalid(
                "nav_lookback.lookback3_in_days",
                format!("must be below {}", NAV_HISTORY_CAPACITY),
            ));
        }

        let ceilings = [
            ("slippage.max_normal_operation_slippage", self.slippage.max_normal_operation_slippage),
            ("slippage.max_trim_operation_slippage", self.slippage.max_trim_operation_slippage),
            (
                "slippage.max_emergency_operation_slippage",
                self.slippage.max_emergency_operation_slippage,
            ),
            (
                "slippage.max_shutdown_operation_slippage",
                self.slippage.max_shutdown_operation_slippage,
            ),
            ("max_allowed_discount", self.max_allowed_discount),
        ];
        for (field, value) in ceilings {
            if value > WAD {
                return Err(invalid(field, format!("{} exceeds 1e18", value)));
            }
        }
        to_signed(self.max_premium, "max_premium")
            .map_err(|_| invalid("max_premium", "does not fit a signed value"))?;
        to_signed(self.max_discount, "max_discount")
            .map_err(|_| invalid("max_discount", "does not fit a signed value"))?;

        if self.pause_rebalance_period_in_days == 0 {
            return Err(invalid("pause_rebalance_period_in_days", "must be non-zero"));
        }
        if self.lst_price_gap_tolerance as u64 > 10_000 {
            return Err(invalid("lst_price_gap_tolerance", "cannot exceed 10000 bps"));
        }
        if self.stale_data_tolerance_in_seconds == 0 {
            return Err(invalid("stale_data_tolerance_in_seconds", "must be non-zero"));
        }

        Ok(())
    }

    /// Premium limit as a signed value, already range checked by `validate`
    pub fn max_premium_signed(&self) -> Result<I256> {
        to_signed(self.max_premium, "max_premium")
    }

    /// Discount limit as a signed value, already range checked by `validate`
    pub fn max_discount_signed(&self) -> Result<I256> {
        to_signed(self.max_discount, "max_discount")
    }
}

fn default_offset_init() -> u16 {
    28
}
fn default_tighten_threshold() -> u16 {
    5
}
fn default_tighten_step() -> u16 {
    3
}
fn default_relax_threshold() -> u16 {
    20
}
fn default_relax_step() -> u16 {
    3
}
fn default_offset_max() -> u16 {
    60
}
fn default_offset_min() -> u16 {
    10
}
fn default_lookback1() -> u8 {
    30
}
fn default_lookback2() -> u8 {
    60
}
fn default_lookback3() -> u8 {
    90
}
fn default_normal_slippage() -> U256 {
    U256::new(10_000_000_000_000_000) // 1%
}
fn default_trim_slippage() -> U256 {
    U256::new(20_000_000_000_000_000) // 2%
}
fn default_emergency_slippage() -> U256 {
    U256::new(25_000_000_000_000_000) // 2.5%
}
fn default_shutdown_slippage() -> U256 {
    U256::new(15_000_000_000_000_000) // 1.5%
}
fn default_weight_one() -> i64 {
    1_000_000
}
fn default_incentive_weight() -> i64 {
    900_000
}
fn default_discount_exit_weight() -> i64 {
    750_000
}
fn default_pause_period() -> u16 {
    90
}
fn default_max_premium() -> U256 {
    U256::new(10_000_000_000_000_000) // 1%
}
fn default_max_discount() -> U256 {
    U256::new(20_000_000_000_000_000) // 2%
}
fn default_max_allowed_discount() -> U256 {
    U256::new(50_000_000_000_000_000) // 5%
}
fn default_gap_tolerance() -> u32 {
    10
}
fn default_stale_tolerance() -> u64 {
    2 * 86_400
}
