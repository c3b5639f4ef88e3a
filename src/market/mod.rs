//! Collaborator interfaces the engine reads from.
//!
//! The vault, destination vaults, price oracle, incentive pricing feed and
//! token metadata are external systems. The engine only ever calls the
//! read-only methods below; implementations report failures as
//! `Error::Upstream`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use ethnum::U256;

use crate::error::{Error, Result};
use crate::types::{Address, DestinationInfo, DexLstStats};

/// Source of the current unix time in seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        Utc::now().timestamp().max(0) as u64
    }
}

/// Clock driven by hand, for replays and tests
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(now: u64) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// A yield-bearing destination the vault can deploy into
pub trait DestinationVault: Send + Sync {
    /// Token the destination accepts and returns (its LP token)
    fn underlying(&self) -> Address;

    /// Pool the underlying LSTs trade in
    fn pool(&self) -> Address;

    /// Constituent LST tokens of the pool
    fn underlying_tokens(&self) -> Vec<Address>;

    /// Decimals of the underlying, used to value amounts moving through it
    fn decimals(&self) -> u8;

    fn is_shutdown(&self) -> bool;

    /// Price of one unit of the underlying, cross-checked against safe prices
    fn validated_spot_price(&self) -> Result<U256>;

    /// Value in base asset of `shares` destination shares
    fn debt_value(&self, shares: U256) -> Result<U256>;

    /// Current pool and LST statistics
    fn stats(&self) -> Result<DexLstStats>;
}

/// Read-only view of the pooled vault
pub trait VaultView: Send + Sync {
    fn base_asset(&self) -> Address;

    fn is_registered(&self, destination: Address) -> bool;

    fn is_queued_for_removal(&self, destination: Address) -> bool;

    /// Shares of `destination` currently held by the vault
    fn destination_shares(&self, destination: Address) -> U256;

    fn total_idle(&self) -> U256;

    fn total_assets(&self) -> U256;

    fn is_shutdown(&self) -> bool;

    /// Debt bookkeeping at the destination's last report
    fn destination_info(&self, destination: Address) -> Result<DestinationInfo>;

    fn destination(&self, destination: Address) -> Option<Arc<dyn DestinationVault>>;
}

pub trait PriceOracle: Send + Sync {
    /// Manipulation-resistant price in base asset
    fn safe_price(&self, token: Address) -> Result<U256>;

    /// Instantaneous price of `token` in `pool`
    fn spot_price(&self, token: Address, pool: Address) -> Result<U256>;
}

pub trait IncentivePricing: Send + Sync {
    /// `(fast, slow)` moving-average prices, zero when older than `stale_tolerance`
    fn price(&self, token: Address, stale_tolerance: u64) -> Result<(U256, U256)>;
}

pub trait TokenMetadata: Send + Sync {
    fn decimals(&self, token: Address) -> Result<u8>;
}

/// Every collaborator the engine needs, bundled
#[derive(Clone)]
pub struct MarketContext {
    pub vault: Arc<dyn VaultView>,
    pub oracle: Arc<dyn PriceOracle>,
    pub incentives: Arc<dyn IncentivePricing>,
    pub tokens: Arc<dyn TokenMetadata>,
    pub clock: Arc<dyn Clock>,
}

impl MarketContext {
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Resolve a destination vault handle
    pub fn destination(&self, address: Address) -> Result<Arc<dyn DestinationVault>> {
        self.vault
            .destination(address)
            .ok_or(Error::UnknownDestination(address))
    }

    /// Fail with `StaleData` when `timestamp` is older than `tolerance`
    pub fn ensure_fresh(&self, feed: &'static str, timestamp: u64, tolerance: u64) -> Result<()> {
        let age_secs = self.now().saturating_sub(timestamp);
        if age_secs > tolerance {
            return Err(Error::StaleData {
                feed,
                age_secs,
                tolerance_secs: tolerance,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now(), 100);
        clock.advance(50);
        assert_eq!(clock.now(), 150);
        clock.set(10);
        assert_eq!(clock.now(), 10);
    }

    #[test]
    fn test_system_clock_is_recent() {
        // 2020-01-01
        assert!(SystemClock.now() > 1_577_836_800);
    }
}
