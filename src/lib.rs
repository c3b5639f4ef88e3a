//! LST Autopool Rebalance Risk Engine
//!
//! Scores destinations, bounds slippage and price gaps, and adapts the
//! swap-cost offset and NAV-decay pause from rebalance history.

pub mod cli;
pub mod config;
pub mod error;
pub mod market;
pub mod math;
pub mod scenario;
pub mod serde_utils;
pub mod strategy;
pub mod tracking;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use strategy::RebalanceEngine;
