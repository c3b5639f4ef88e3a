//! Rebalance Risk Strategy
//!
//! Decides whether moving value between destinations is economically
//! justified and risk-bounded, and adapts its own tolerance over time.
//!
//! ## Scoring
//! - `yield_scorer` - Composite return per destination
//! - `price_return` - Discount decay
//! - `incentives` - Reward program APR
//!
//! ## Bounds
//! - `validation` - Proposal checks and leg valuation
//! - `price_gap` - Safe vs spot LST price divergence
//! - `trim` - Trim advice, cleanup and trim verification
//!
//! ## Adaptive state
//! - `swap_offset` - Swap-cost offset relax / tighten
//! - `pause` - NAV-decay pause
//! - `engine` - Orchestrator and owner of all mutable state

// Shared types
pub mod config;
pub mod types;

// Scoring
pub mod incentives;
pub mod price_return;
pub mod yield_scorer;

// Bounds
pub mod price_gap;
pub mod trim;
pub mod validation;

// Adaptive state
pub mod engine;
pub mod pause;
pub mod swap_offset;

// Re-exports
pub use config::{ModelWeights, NavLookbackConfig, SlippageConfig, StrategyConfig, SwapCostOffsetConfig};
pub use engine::RebalanceEngine;
pub use price_gap::PriceGapValidator;
pub use trim::TrimAdvisor;
pub use types::*;
pub use yield_scorer::YieldScorer;
