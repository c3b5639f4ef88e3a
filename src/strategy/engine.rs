//! Rebalance Engine
//!
//! Main coordinator of the risk engine and sole owner of its mutable state:
//! the adaptive swap-cost offset, the NAV-decay pause, the per-destination
//! add timestamps and both trackers.
//!
//! Verification takes `&self` and never mutates. The two reporting entry
//! points take `&mut self`, so no other path into the engine can run while
//! they update state.

use ethnum::{I256, U256};
use std::collections::HashMap;

use super::config::StrategyConfig;
use super::pause::{nav_decay_detected, pause_state};
use super::price_gap::PriceGapValidator;
use super::swap_offset::{relaxed_period, tightened_period};
use super::trim::TrimAdvisor;
use super::types::{
    DestinationSummary, EngineSnapshot, IdleScenario, PauseState, RebalanceApproval,
    RebalanceDirection, ValueStats,
};
use super::validation::{token_price, validate_proposal, value_stats};
use super::yield_scorer::YieldScorer;
use crate::error::{Error, Result};
use crate::market::MarketContext;
use crate::math::{mul_div_signed, to_signed, DAYS_PER_YEAR, SECONDS_PER_DAY, WAD, WAD_I};
use crate::tracking::{NavTracker, ViolationTracker};
use crate::types::{Address, RebalanceProposal};

/// Adaptive risk state, only ever written by the engine
#[derive(Debug, Clone)]
struct RiskState {
    swap_cost_offset_period_in_days: u16,
    last_rebalance_timestamp: u64,
    /// 0 = never paused
    last_paused_timestamp: u64,
    last_add_timestamp_by_destination: HashMap<Address, u64>,
    violations: ViolationTracker,
    navs: NavTracker,
}

/// Highest slippage ceiling among the active move-to-idle scenarios
#[derive(Debug, Default)]
struct IdleCeiling(Option<(U256, IdleScenario)>);

impl IdleCeiling {
    fn below(&self, ceiling: U256) -> bool {
        self.0.map_or(true, |(current, _)| ceiling > current)
    }

    fn raise(&mut self, ceiling: U256, scenario: IdleScenario) {
        if self.below(ceiling) {
            self.0 = Some((ceiling, scenario));
        }
    }
}

pub struct RebalanceEngine {
    config: StrategyConfig,
    market: MarketContext,
    state: RiskState,
}

impl RebalanceEngine {
    /// Create an engine starting from the configured initial offset period
    pub fn new(config: StrategyConfig, market: MarketContext) -> Result<Self> {
        config.validate()?;
        let state = RiskState {
            swap_cost_offset_period_in_days: config.swap_cost_offset.init_in_days,
            last_rebalance_timestamp: market.now(),
            last_paused_timestamp: 0,
            last_add_timestamp_by_destination: HashMap::new(),
            violations: ViolationTracker::new(),
            navs: NavTracker::new(),
        };
        Ok(Self {
            config,
            market,
            state,
        })
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn market(&self) -> &MarketContext {
        &self.market
    }

    fn pause_state_at(&self, now: u64) -> PauseState {
        pause_state(
            self.state.last_paused_timestamp,
            self.config.pause_rebalance_period_in_days,
            now,
        )
    }

    /// New deployments are blocked by a NAV-decay pause
    pub fn paused(&self) -> bool {
        self.pause_state_at(self.market.now()) == PauseState::Paused
    }

    /// Offset period a rebalance would be judged with right now
    pub fn swap_cost_offset_period_in_days(&self) -> u16 {
        let now = self.market.now();
        if self.pause_state_at(now) == PauseState::ExpiredPause {
            return self.config.swap_cost_offset.min_in_days;
        }
        relaxed_period(
            &self.config.swap_cost_offset,
            self.state.swap_cost_offset_period_in_days,
            self.state.last_rebalance_timestamp,
            now,
        )
    }

    /// Summary of the destination funds would move into
    pub fn rebalance_in_summary_stats(&self, proposal: &RebalanceProposal) -> Result<DestinationSummary> {
        let price = token_price(&self.market, proposal.destination_in)?;
        YieldScorer::new(&self.market, &self.config).score(
            proposal.destination_in,
            price,
            RebalanceDirection::In,
            proposal.amount_in,
        )
    }

    /// Summary of the destination funds would move out of
    pub fn rebalance_out_summary_stats(&self, proposal: &RebalanceProposal) -> Result<DestinationSummary> {
        let price = token_price(&self.market, proposal.destination_out)?;
        YieldScorer::new(&self.market, &self.config).score(
            proposal.destination_out,
            price,
            RebalanceDirection::Out,
            proposal.amount_out,
        )
    }

    /// Decide whether `proposal` may execute. `out_summary` is the summary of
    /// the source destination as returned by
    /// [`rebalance_out_summary_stats`](Self::rebalance_out_summary_stats).
    pub fn verify_rebalance(
        &self,
        proposal: &RebalanceProposal,
        out_summary: &DestinationSummary,
    ) -> Result<RebalanceApproval> {
        let result = self.verify_rebalance_inner(proposal, out_summary);
        match &result {
            Ok(approval) => tracing::debug!(
                destination_in = %proposal.destination_in,
                destination_out = %proposal.destination_out,
                slippage = %approval.value_stats.slippage,
                ceiling = %approval.slippage_ceiling,
                "Rebalance accepted"
            ),
            Err(e) => tracing::warn!(
                destination_in = %proposal.destination_in,
                destination_out = %proposal.destination_out,
                "Rebalance rejected: {}",
                e
            ),
        }
        result
    }

    fn verify_rebalance_inner(
        &self,
        proposal: &RebalanceProposal,
        out_summary: &DestinationSummary,
    ) -> Result<RebalanceApproval> {
        validate_proposal(&self.market, proposal)?;
        let value_stats = value_stats(&self.market, proposal)?;

        if proposal.destination_in.is_idle() {
            return self.verify_rebalance_to_idle(proposal, value_stats);
        }

        if self.paused() {
            return Err(Error::StrategyPaused);
        }

        if !PriceGapValidator::new(&self.market).check(proposal, self.config.lst_price_gap_tolerance)? {
            return Err(Error::LstPriceGapToleranceExceeded);
        }

        let ceiling = self.config.slippage.max_normal_operation_slippage;
        if value_stats.slippage > ceiling {
            return Err(Error::MaxSlippageExceeded {
                slippage: value_stats.slippage,
                ceiling,
            });
        }

        let in_summary = self.rebalance_in_summary_stats(proposal)?;

        let max_discount = self.config.max_discount_signed()?;
        if in_summary.max_discount > max_discount {
            return Err(Error::MaxDiscountExceeded {
                discount: in_summary.max_discount,
                limit: max_discount,
            });
        }
        let max_premium = self.config.max_premium_signed()?;
        if -in_summary.max_premium > max_premium {
            return Err(Error::MaxPremiumExceeded {
                premium: -in_summary.max_premium,
                limit: max_premium,
            });
        }

        let mut period = self.swap_cost_offset_period_in_days();
        // Same token on both sides: a pure reallocation without an LST swap
        if proposal.token_in == proposal.token_out {
            period /= 2;
        }

        let predicted_gain = predicted_gain(
            &in_summary,
            out_summary,
            &value_stats,
            period,
        )?;
        let swap_cost = to_signed(value_stats.swap_cost, "swap cost")?;
        if predicted_gain <= swap_cost {
            return Err(Error::SwapCostExceeded {
                predicted_gain,
                swap_cost: value_stats.swap_cost,
            });
        }

        Ok(RebalanceApproval {
            value_stats,
            slippage_ceiling: ceiling,
            idle_scenario: None,
            in_summary: Some(in_summary),
            offset_period_in_days: Some(period),
            predicted_gain: Some(predicted_gain),
        })
    }

    /// Moves into idle skip the yield checks but need a reason
    fn verify_rebalance_to_idle(
        &self,
        proposal: &RebalanceProposal,
        value_stats: ValueStats,
    ) -> Result<RebalanceApproval> {
        let Some(source) = proposal.destination_out.address() else {
            return Err(Error::InvalidRebalanceToIdle);
        };
        let destination = self.market.destination(source)?;
        let slippage = &self.config.slippage;
        let trim = TrimAdvisor::new(&self.market, &self.config);

        let mut ceiling = IdleCeiling::default();
        if destination.is_shutdown() {
            ceiling.raise(slippage.max_emergency_operation_slippage, IdleScenario::DestinationShutdown);
        }
        if self.market.vault.is_shutdown() {
            ceiling.raise(slippage.max_shutdown_operation_slippage, IdleScenario::VaultShutdown);
        }
        if self.market.vault.is_queued_for_removal(source) {
            ceiling.raise(slippage.max_normal_operation_slippage, IdleScenario::QueuedForRemoval);
        }
        if ceiling.below(slippage.max_normal_operation_slippage) && trim.verify_cleanup(proposal)? {
            ceiling.raise(slippage.max_normal_operation_slippage, IdleScenario::Cleanup);
        }
        if ceiling.below(slippage.max_trim_operation_slippage) {
            let trim_amount = trim.trim_amount(source)?;
            if trim_amount < WAD && trim.verify_trim(proposal, trim_amount)? {
                ceiling.raise(slippage.max_trim_operation_slippage, IdleScenario::Trim);
            }
        }

        let Some((ceiling, scenario)) = ceiling.0 else {
            return Err(Error::InvalidRebalanceToIdle);
        };
        if value_stats.slippage > ceiling {
            return Err(Error::MaxSlippageExceeded {
                slippage: value_stats.slippage,
                ceiling,
            });
        }

        Ok(RebalanceApproval {
            value_stats,
            slippage_ceiling: ceiling,
            idle_scenario: Some(scenario),
            in_summary: None,
            offset_period_in_days: None,
            predicted_gain: None,
        })
    }

    /// Clear a pause whose period has elapsed. Returns whether one was cleared.
    fn clear_expired_pause(&mut self, now: u64) -> bool {
        if self.pause_state_at(now) != PauseState::ExpiredPause {
            return false;
        }
        self.state.last_paused_timestamp = 0;
        self.state.swap_cost_offset_period_in_days = self.config.swap_cost_offset.min_in_days;
        tracing::info!(
            offset_period_days = self.state.swap_cost_offset_period_in_days,
            "NAV-decay pause expired, offset period reset to minimum"
        );
        true
    }

    /// Record an executed rebalance and adapt the offset period
    pub fn rebalance_successfully_executed(&mut self, proposal: &RebalanceProposal) -> Result<()> {
        let now = self.market.now();
        let period = self.swap_cost_offset_period_in_days();

        if !self.clear_expired_pause(now) {
            self.state.swap_cost_offset_period_in_days = period;
        }

        if let Some(destination_in) = proposal.destination_in.address() {
            self.state.last_rebalance_timestamp = now;
            self.state
                .last_add_timestamp_by_destination
                .insert(destination_in, now);
        }

        if let Some(destination_out) = proposal
            .destination_out
            .address()
            .filter(|_| proposal.is_vault_to_vault())
        {
            let added_at = self
                .state
                .last_add_timestamp_by_destination
                .get(&destination_out)
                .copied()
                .unwrap_or(0);
            let is_violation = now.saturating_sub(added_at) < u64::from(period) * SECONDS_PER_DAY;
            self.state.violations.insert(is_violation);

            let threshold = self.config.swap_cost_offset.tighten_threshold_in_violations as usize;
            if self.state.violations.is_full() && self.state.violations.violation_count() >= threshold {
                let tightened = tightened_period(
                    &self.config.swap_cost_offset,
                    self.state.swap_cost_offset_period_in_days,
                );
                tracing::info!(
                    from = self.state.swap_cost_offset_period_in_days,
                    to = tightened,
                    violations = self.state.violations.violation_count(),
                    "Tightening swap cost offset period"
                );
                self.state.swap_cost_offset_period_in_days = tightened;
                self.state.violations.reset();
            }

            if is_violation {
                tracing::debug!(destination = %destination_out, "Recorded offset period violation");
            }
        }

        tracing::info!(
            destination_in = %proposal.destination_in,
            destination_out = %proposal.destination_out,
            offset_period_days = self.state.swap_cost_offset_period_in_days,
            "Rebalance recorded"
        );
        Ok(())
    }

    /// Record a NAV-per-share sample and pause on decay
    pub fn nav_update(&mut self, nav_per_share: U256) -> Result<()> {
        let now = self.market.now();
        self.state.navs.insert(nav_per_share, now)?;

        self.clear_expired_pause(now);

        if self.pause_state_at(now) != PauseState::Paused
            && nav_decay_detected(&self.state.navs, &self.config.nav_lookback)?
        {
            self.state.last_paused_timestamp = now;
            tracing::warn!(
                nav_per_share = %nav_per_share,
                pause_days = self.config.pause_rebalance_period_in_days,
                "NAV per share below all lookbacks, pausing new deployments"
            );
        }
        Ok(())
    }

    /// Read-only view of the adaptive state
    pub fn snapshot(&self) -> EngineSnapshot {
        let now = self.market.now();
        EngineSnapshot {
            timestamp: now,
            pause_state: self.pause_state_at(now),
            stored_offset_period_in_days: self.state.swap_cost_offset_period_in_days,
            current_offset_period_in_days: self.swap_cost_offset_period_in_days(),
            last_rebalance_timestamp: self.state.last_rebalance_timestamp,
            last_paused_timestamp: self.state.last_paused_timestamp,
            violation_count: self.state.violations.violation_count(),
            violation_window_len: self.state.violations.len(),
            nav_history_len: self.state.navs.len(),
            last_add_timestamps: self.state.last_add_timestamp_by_destination.clone(),
        }
    }
}

/// Yield advantage of the move over `period_in_days`, in ETH
fn predicted_gain(
    in_summary: &DestinationSummary,
    out_summary: &DestinationSummary,
    value_stats: &ValueStats,
    period_in_days: u16,
) -> Result<I256> {
    let in_value = to_signed(value_stats.in_eth_value, "in value")?;
    let out_value = to_signed(value_stats.out_eth_value, "out value")?;

    let in_return = in_summary
        .composite_return
        .checked_mul(in_value)
        .ok_or(Error::NumericOverflow("in return"))?;
    let out_return = out_summary
        .composite_return
        .checked_mul(out_value)
        .ok_or(Error::NumericOverflow("out return"))?;
    let diff = in_return
        .checked_sub(out_return)
        .ok_or(Error::NumericOverflow("predicted gain"))?;

    // Single truncation at the end
    mul_div_signed(
        diff,
        I256::new(period_in_days as i128),
        DAYS_PER_YEAR * WAD_I,
        "predicted gain",
    )
}
