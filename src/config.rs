//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

// Re-export strategy config
pub use crate::strategy::config::StrategyConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level for this crate's events when RUST_LOG does not say otherwise
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file and environment
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix AUTOPOOL__)
            .add_source(
                config::Environment::with_prefix("AUTOPOOL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.strategy
            .validate()
            .context("Invalid strategy configuration")?;

        match self.logging.level.to_ascii_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" | "off" => {}
            other => anyhow::bail!("Unknown log level: {}", other),
        }

        Ok(())
    }

    /// Log directive for this crate
    pub fn log_directive(&self) -> String {
        format!("autopool_risk={}", self.logging.level.to_ascii_lowercase())
    }

    /// Effective configuration for display
    pub fn masked_display(&self) -> String {
        let s = &self.strategy;
        let offset = &s.swap_cost_offset;
        let nav = &s.nav_lookback;
        let w = &s.model_weights;
        format!(
            r#"Configuration:
  Swap cost offset:
    init: {}d (min {}d, max {}d)
    tighten: {} violations -> -{}d
    relax: every {}d -> +{}d
  NAV lookback: {}d / {}d / {}d
  Pause period: {}d
  Slippage ceilings:
    normal: {}
    trim: {}
    emergency: {}
    shutdown: {}
  Model weights:
    base: {}, fee: {}, incentive: {}, slashing: {}
    discount exit: {}, discount enter: {}, premium: {}
  Max premium: {}
  Max discount: {}
  Max allowed discount: {}
  LST price gap tolerance: {}bps
  Stale data tolerance: {}s
  Logging:
    level: {}
    json: {}
"#,
            offset.init_in_days,
            offset.min_in_days,
            offset.max_in_days,
            offset.tighten_threshold_in_violations,
            offset.tighten_step_in_days,
            offset.relax_threshold_in_days,
            offset.relax_step_in_days,
            nav.lookback1_in_days,
            nav.lookback2_in_days,
            nav.lookback3_in_days,
            s.pause_rebalance_period_in_days,
            s.slippage.max_normal_operation_slippage,
            s.slippage.max_trim_operation_slippage,
            s.slippage.max_emergency_operation_slippage,
            s.slippage.max_shutdown_operation_slippage,
            w.base_yield,
            w.fee_yield,
            w.incentive_yield,
            w.slashing,
            w.price_discount_exit,
            w.price_discount_enter,
            w.price_premium,
            s.max_premium,
            s.max_discount,
            s.max_allowed_discount,
            s.lst_price_gap_tolerance,
            s.stale_data_tolerance_in_seconds,
            self.logging.level,
            self.logging.json,
        )
    }
}
