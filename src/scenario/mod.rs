//! Scenario files and replay
//!
//! A scenario describes a vault, its destinations and the market around them,
//! plus a timeline of NAV reports and rebalance proposals. Replaying it drives
//! a [`RebalanceEngine`] on a manual clock through every step against
//! in-memory collaborators.

use ethnum::U256;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Context;

use crate::error::{Error, Result};
use crate::market::{
    Clock, DestinationVault, IncentivePricing, ManualClock, MarketContext, PriceOracle,
    TokenMetadata, VaultView,
};
use crate::math::{mul_div, WAD};
use crate::strategy::{EngineSnapshot, RebalanceApproval, RebalanceEngine, StrategyConfig};
use crate::types::{Address, Destination, DestinationInfo, DexLstStats, RebalanceProposal};

fn default_true() -> bool {
    true
}

fn default_decimals() -> u8 {
    18
}

fn default_wad() -> U256 {
    WAD
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultSpec {
    pub base_asset: Address,
    #[serde(default, with = "crate::serde_utils::u256")]
    pub total_idle: U256,
    #[serde(default, with = "crate::serde_utils::u256")]
    pub total_assets: U256,
    #[serde(default)]
    pub is_shutdown: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationSpec {
    pub address: Address,
    pub underlying: Address,
    #[serde(default)]
    pub pool: Address,
    #[serde(default)]
    pub underlying_tokens: Vec<Address>,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    #[serde(default)]
    pub is_shutdown: bool,
    #[serde(default = "default_true")]
    pub registered: bool,
    #[serde(default)]
    pub queued_for_removal: bool,
    /// Shares of this destination held by the vault
    #[serde(default, with = "crate::serde_utils::u256")]
    pub vault_shares: U256,
    /// Validated price of one unit of the underlying
    #[serde(default = "default_wad", with = "crate::serde_utils::u256")]
    pub spot_price: U256,
    /// Debt value of one share
    #[serde(default = "default_wad", with = "crate::serde_utils::u256")]
    pub share_value: U256,
    #[serde(default)]
    pub info: DestinationInfo,
    #[serde(default)]
    pub stats: DexLstStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPrice {
    pub token: Address,
    #[serde(with = "crate::serde_utils::u256")]
    pub safe: U256,
    #[serde(with = "crate::serde_utils::u256")]
    pub spot: U256,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncentivePrice {
    pub token: Address,
    #[serde(with = "crate::serde_utils::u256")]
    pub fast: U256,
    #[serde(with = "crate::serde_utils::u256")]
    pub slow: U256,
}

/// One timeline entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    NavUpdate {
        at: u64,
        #[serde(with = "crate::serde_utils::u256")]
        nav_per_share: U256,
    },
    Rebalance {
        at: u64,
        proposal: RebalanceProposal,
        /// Report the rebalance as executed when accepted
        #[serde(default = "default_true")]
        execute: bool,
    },
}

impl Step {
    pub fn at(&self) -> u64 {
        match self {
            Step::NavUpdate { at, .. } | Step::Rebalance { at, .. } => *at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Engine creation time
    #[serde(default)]
    pub start_timestamp: u64,
    pub vault: VaultSpec,
    #[serde(default)]
    pub destinations: Vec<DestinationSpec>,
    #[serde(default)]
    pub prices: Vec<TokenPrice>,
    #[serde(default)]
    pub incentive_prices: Vec<IncentivePrice>,
    #[serde(default)]
    pub token_decimals: HashMap<Address, u8>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Load a scenario from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse scenario {}", path.display()))
    }

    /// In-memory collaborators for this scenario
    pub fn market(&self, clock: Arc<dyn Clock>) -> (MarketContext, Arc<InMemoryVault>) {
        let destinations = self
            .destinations
            .iter()
            .map(|spec| {
                (
                    spec.address,
                    Arc::new(InMemoryDestination {
                        spec: RwLock::new(spec.clone()),
                    }),
                )
            })
            .collect();
        let vault = Arc::new(InMemoryVault {
            spec: RwLock::new(self.vault.clone()),
            destinations,
        });

        let mut decimals: HashMap<Address, u8> = self
            .destinations
            .iter()
            .map(|d| (d.underlying, d.decimals))
            .collect();
        decimals.extend(self.token_decimals.iter().map(|(k, v)| (*k, *v)));

        let market = MarketContext {
            vault: vault.clone(),
            oracle: Arc::new(InMemoryOracle {
                prices: self.prices.iter().map(|p| (p.token, (p.safe, p.spot))).collect(),
            }),
            incentives: Arc::new(InMemoryIncentivePricing {
                prices: self
                    .incentive_prices
                    .iter()
                    .map(|p| (p.token, (p.fast, p.slow)))
                    .collect(),
            }),
            tokens: Arc::new(InMemoryTokens { decimals }),
            clock,
        };
        (market, vault)
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

pub struct InMemoryDestination {
    spec: RwLock<DestinationSpec>,
}

impl DestinationVault for InMemoryDestination {
    fn underlying(&self) -> Address {
        read(&self.spec).underlying
    }

    fn pool(&self) -> Address {
        read(&self.spec).pool
    }

    fn underlying_tokens(&self) -> Vec<Address> {
        read(&self.spec).underlying_tokens.clone()
    }

    fn decimals(&self) -> u8 {
        read(&self.spec).decimals
    }

    fn is_shutdown(&self) -> bool {
        read(&self.spec).is_shutdown
    }

    fn validated_spot_price(&self) -> Result<U256> {
        Ok(read(&self.spec).spot_price)
    }

    fn debt_value(&self, shares: U256) -> Result<U256> {
        mul_div(shares, read(&self.spec).share_value, WAD, "debt value")
    }

    fn stats(&self) -> Result<DexLstStats> {
        Ok(read(&self.spec).stats.clone())
    }
}

pub struct InMemoryVault {
    spec: RwLock<VaultSpec>,
    destinations: HashMap<Address, Arc<InMemoryDestination>>,
}

impl InMemoryVault {
    fn spec_of(&self, destination: Address) -> Option<DestinationSpec> {
        self.destinations
            .get(&destination)
            .map(|d| read(&d.spec).clone())
    }

    /// Move balances as an executed rebalance would
    pub fn apply(&self, proposal: &RebalanceProposal) {
        match proposal.destination_out {
            Destination::Idle => {
                let mut vault = write(&self.spec);
                vault.total_idle = vault.total_idle.saturating_sub(proposal.amount_out);
            }
            Destination::Vault(address) => {
                if let Some(dest) = self.destinations.get(&address) {
                    let mut spec = write(&dest.spec);
                    spec.vault_shares = spec.vault_shares.saturating_sub(proposal.amount_out);
                }
            }
        }
        match proposal.destination_in {
            Destination::Idle => {
                let mut vault = write(&self.spec);
                vault.total_idle = vault.total_idle.saturating_add(proposal.amount_in);
            }
            Destination::Vault(address) => {
                if let Some(dest) = self.destinations.get(&address) {
                    let mut spec = write(&dest.spec);
                    spec.vault_shares = spec.vault_shares.saturating_add(proposal.amount_in);
                }
            }
        }
    }
}

impl VaultView for InMemoryVault {
    fn base_asset(&self) -> Address {
        read(&self.spec).base_asset
    }

    fn is_registered(&self, destination: Address) -> bool {
        self.spec_of(destination).map_or(false, |d| d.registered)
    }

    fn is_queued_for_removal(&self, destination: Address) -> bool {
        self.spec_of(destination)
            .map_or(false, |d| d.queued_for_removal)
    }

    fn destination_shares(&self, destination: Address) -> U256 {
        self.spec_of(destination)
            .map_or(U256::ZERO, |d| d.vault_shares)
    }

    fn total_idle(&self) -> U256 {
        read(&self.spec).total_idle
    }

    fn total_assets(&self) -> U256 {
        read(&self.spec).total_assets
    }

    fn is_shutdown(&self) -> bool {
        read(&self.spec).is_shutdown
    }

    fn destination_info(&self, destination: Address) -> Result<DestinationInfo> {
        self.spec_of(destination)
            .map(|d| d.info)
            .ok_or(Error::UnknownDestination(destination))
    }

    fn destination(&self, destination: Address) -> Option<Arc<dyn DestinationVault>> {
        self.destinations
            .get(&destination)
            .map(|d| d.clone() as Arc<dyn DestinationVault>)
    }
}

pub struct InMemoryOracle {
    prices: HashMap<Address, (U256, U256)>,
}

impl InMemoryOracle {
    fn lookup(&self, token: Address) -> Result<(U256, U256)> {
        self.prices
            .get(&token)
            .copied()
            .ok_or_else(|| Error::Upstream(format!("no price for {}", token)))
    }
}

impl PriceOracle for InMemoryOracle {
    fn safe_price(&self, token: Address) -> Result<U256> {
        Ok(self.lookup(token)?.0)
    }

    fn spot_price(&self, token: Address, _pool: Address) -> Result<U256> {
        Ok(self.lookup(token)?.1)
    }
}

pub struct InMemoryIncentivePricing {
    prices: HashMap<Address, (U256, U256)>,
}

impl IncentivePricing for InMemoryIncentivePricing {
    fn price(&self, token: Address, _stale_tolerance: u64) -> Result<(U256, U256)> {
        Ok(self
            .prices
            .get(&token)
            .copied()
            .unwrap_or((U256::ZERO, U256::ZERO)))
    }
}

pub struct InMemoryTokens {
    decimals: HashMap<Address, u8>,
}

impl TokenMetadata for InMemoryTokens {
    fn decimals(&self, token: Address) -> Result<u8> {
        Ok(self.decimals.get(&token).copied().unwrap_or(18))
    }
}

/// What happened at one step
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StepOutcome {
    Recorded,
    Accepted {
        approval: Box<RebalanceApproval>,
        executed: bool,
    },
    Rejected {
        kind: String,
        error: String,
    },
}

impl StepOutcome {
    fn rejected(error: &Error) -> Self {
        StepOutcome::Rejected {
            kind: format!("{:?}", error.kind()),
            error: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub at: u64,
    pub action: &'static str,
    pub outcome: StepOutcome,
    pub offset_period_in_days: u16,
    pub paused: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub steps: Vec<StepReport>,
    pub final_snapshot: EngineSnapshot,
}

/// Drive an engine through every step of `scenario`.
///
/// Rejections are part of the report; only fatal errors and steps out of
/// chronological order abort the replay.
pub fn replay(scenario: &Scenario, config: StrategyConfig) -> Result<ReplayReport> {
    let clock = Arc::new(ManualClock::new(scenario.start_timestamp));
    let (market, vault) = scenario.market(clock.clone());
    let mut engine = RebalanceEngine::new(config, market)?;

    let mut steps = Vec::with_capacity(scenario.steps.len());
    for step in &scenario.steps {
        if step.at() < clock.now() {
            return Err(Error::StepOutOfOrder {
                last: clock.now(),
                attempted: step.at(),
            });
        }
        clock.set(step.at());

        let (action, outcome) = match step {
            Step::NavUpdate { nav_per_share, .. } => {
                let outcome = match engine.nav_update(*nav_per_share) {
                    Ok(()) => StepOutcome::Recorded,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => StepOutcome::rejected(&e),
                };
                ("nav_update", outcome)
            }
            Step::Rebalance {
                proposal, execute, ..
            } => {
                let verdict = engine
                    .rebalance_out_summary_stats(proposal)
                    .and_then(|out| engine.verify_rebalance(proposal, &out));
                let outcome = match verdict {
                    Ok(approval) => {
                        if *execute {
                            vault.apply(proposal);
                            engine.rebalance_successfully_executed(proposal)?;
                        }
                        StepOutcome::Accepted {
                            approval: Box::new(approval),
                            executed: *execute,
                        }
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => StepOutcome::rejected(&e),
                };
                ("rebalance", outcome)
            }
        };

        steps.push(StepReport {
            at: step.at(),
            action,
            outcome,
            offset_period_in_days: engine.swap_cost_offset_period_in_days(),
            paused: engine.paused(),
        });
    }

    Ok(ReplayReport {
        steps,
        final_snapshot: engine.snapshot(),
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::SECONDS_PER_DAY;

    const DAY: u64 = SECONDS_PER_DAY;

    fn scenario_json() -> String {
        let d1 = "0xd1d1d1d1d1d1d1d1d1d1d1d1d1d1d1d1d1d1d1d1";
        let a1 = "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1";
        let base = "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee";
        format!(
            r#"{{
                "start_timestamp": {start},
                "vault": {{
                    "base_asset": "{base}",
                    "total_idle": "10000000000000000000",
                    "total_assets": "100000000000000000000"
                }},
                "destinations": [{{
                    "address": "{d1}",
                    "underlying": "{a1}",
                    "vault_shares": "1000000000000000000",
                    "info": {{
                        "current_debt": "1000000000000000000",
                        "owned_shares": "1000000000000000000",
                        "last_report": {start}
                    }},
                    "stats": {{ "last_snapshot_timestamp": {start} }}
                }}],
                "steps": [
                    {{ "action": "nav_update", "at": {start}, "nav_per_share": "1000000000000000000" }},
                    {{ "action": "rebalance", "at": {start}, "proposal": {{
                        "destination_in": "idle",
                        "token_in": "{base}",
                        "amount_in": "995000000000000000",
                        "destination_out": "{d1}",
                        "token_out": "{a1}",
                        "amount_out": "1000000000000000000"
                    }} }},
                    {{ "action": "nav_update", "at": {start}, "nav_per_share": "1" }}
                ]
            }}"#,
            start = 100 * DAY,
            base = base,
            d1 = d1,
            a1 = a1,
        )
    }

    #[test]
    fn test_parse_scenario() {
        let scenario: Scenario = serde_json::from_str(&scenario_json()).unwrap();
        assert_eq!(scenario.destinations.len(), 1);
        assert_eq!(scenario.destinations[0].decimals, 18);
        assert!(scenario.destinations[0].registered);
        assert_eq!(scenario.steps.len(), 3);
        assert!(matches!(scenario.steps[1], Step::Rebalance { execute: true, .. }));
    }

    #[test]
    fn test_replay_cleanup_to_idle() {
        let scenario: Scenario = serde_json::from_str(&scenario_json()).unwrap();
        let report = replay(&scenario, StrategyConfig::default()).unwrap();

        assert_eq!(report.steps.len(), 3);
        assert!(matches!(report.steps[0].outcome, StepOutcome::Recorded));
        // 1 ETH of 100 is dust, 0.5% slippage is within the normal ceiling
        match &report.steps[1].outcome {
            StepOutcome::Accepted { approval, executed } => {
                assert!(*executed);
                assert_eq!(approval.idle_scenario, Some(crate::strategy::IdleScenario::Cleanup));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        // Moves into idle do not count as deployments
        assert!(report.final_snapshot.last_add_timestamps.is_empty());
        assert_eq!(report.final_snapshot.nav_history_len, 1);
    }

    #[test]
    fn test_replay_rejects_steps_out_of_order() {
        let mut scenario: Scenario = serde_json::from_str(&scenario_json()).unwrap();
        scenario.steps.push(Step::NavUpdate {
            at: DAY,
            nav_per_share: WAD,
        });
        assert_eq!(
            replay(&scenario, StrategyConfig::default()).unwrap_err(),
            Error::StepOutOfOrder {
                last: 100 * DAY,
                attempted: DAY,
            }
        );
    }

    #[test]
    fn test_apply_moves_balances() {
        let scenario: Scenario = serde_json::from_str(&scenario_json()).unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let (market, vault) = scenario.market(clock);
        let d1 = scenario.destinations[0].address;

        if let Step::Rebalance { proposal, .. } = &scenario.steps[1] {
            vault.apply(proposal);
        }
        assert_eq!(market.vault.destination_shares(d1), U256::ZERO);
        assert_eq!(
            market.vault.total_idle(),
            U256::new(10_995_000_000_000_000_000)
        );
    }
}
