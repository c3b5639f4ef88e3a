//! CLI command implementations

use anyhow::{Context, Result};
use ethnum::U256;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::market::ManualClock;
use crate::scenario::{self, ReplayReport, Scenario, StepOutcome};
use crate::strategy::validation::token_price;
use crate::strategy::{RebalanceDirection, YieldScorer};
use crate::types::Destination;

/// Replay a scenario file through a fresh engine
pub fn replay(config: &Config, path: &Path, json: bool) -> Result<()> {
    let scenario = Scenario::load(path)?;
    info!(
        "Replaying {} steps from {}",
        scenario.steps.len(),
        path.display()
    );

    let report = scenario::replay(&scenario, config.strategy.clone())
        .with_context(|| format!("Replay of {} aborted", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &ReplayReport) {
    println!("\n=== REPLAY ===\n");
    for step in &report.steps {
        let outcome = match &step.outcome {
            StepOutcome::Recorded => "recorded".to_string(),
            StepOutcome::Accepted { approval, executed } => format!(
                "accepted (slippage {} <= {}{}{})",
                approval.value_stats.slippage,
                approval.slippage_ceiling,
                approval
                    .idle_scenario
                    .map(|s| format!(", {:?}", s))
                    .unwrap_or_default(),
                if *executed { "" } else { ", not executed" },
            ),
            StepOutcome::Rejected { kind, error } => format!("rejected [{}] {}", kind, error),
        };
        println!(
            "{:>12} {:<11} offset={:>2}d paused={:<5} {}",
            step.at, step.action, step.offset_period_in_days, step.paused, outcome
        );
    }

    let snap = &report.final_snapshot;
    println!("\n=== FINAL STATE ===\n");
    println!("Timestamp:           {}", snap.timestamp);
    println!("Pause state:         {:?}", snap.pause_state);
    println!(
        "Offset period:       {}d (stored {}d)",
        snap.current_offset_period_in_days, snap.stored_offset_period_in_days
    );
    println!("Last rebalance:      {}", snap.last_rebalance_timestamp);
    println!("Last paused:         {}", snap.last_paused_timestamp);
    println!(
        "Violations:          {} in last {}",
        snap.violation_count, snap.violation_window_len
    );
    println!("NAV samples:         {}", snap.nav_history_len);
}

/// Score one destination of a scenario's market
pub fn score(
    config: &Config,
    path: &Path,
    destination: Destination,
    direction: RebalanceDirection,
    amount: U256,
    at: Option<u64>,
) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let clock = Arc::new(ManualClock::new(at.unwrap_or(scenario.start_timestamp)));
    let (market, _) = scenario.market(clock);

    let price = token_price(&market, destination)
        .with_context(|| format!("Failed to price {}", destination))?;
    let summary = YieldScorer::new(&market, &config.strategy)
        .score(destination, price, direction, amount)
        .with_context(|| format!("Failed to score {}", destination))?;

    println!("\n=== DESTINATION {} ({}) ===\n", destination, direction);
    println!("Price:             {}", price);
    println!("Base APR:          {}", summary.base_apr);
    println!("Fee APR:           {}", summary.fee_apr);
    println!("Incentive APR:     {}", summary.incentive_apr);
    println!("Price return:      {}", summary.price_return);
    println!("Max discount:      {}", summary.max_discount);
    println!("Max premium:       {}", summary.max_premium);
    println!("Owned shares:      {}", summary.owned_shares);
    println!("Composite return:  {}", summary.composite_return);
    Ok(())
}

/// Show current configuration
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}
