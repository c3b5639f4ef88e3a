//! Error types for the rebalance risk engine

use ethnum::{I256, U256};
use thiserror::Error;

use crate::types::{Address, Destination};

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Broad category of a rejection, so callers can decide what to do with it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller error, never worth resubmitting unchanged
    Malformed,
    /// Upstream data older than the configured tolerance
    Stale,
    /// A slippage / discount / premium / price-gap / swap-cost bound was hit
    Bound,
    /// Engine or vault state forbids the move
    Policy,
    /// Arithmetic overflow, unrecoverable
    Fatal,
    /// A collaborator could not answer
    Upstream,
    /// Invalid strategy configuration
    Config,
}

/// Main error type for the risk engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Malformed input
    #[error("Zero address for {0}")]
    ZeroAddress(&'static str),

    #[error("Zero amount for {0}")]
    ZeroAmount(&'static str),

    #[error("Destination {0} is not registered")]
    UnregisteredDestination(Address),

    #[error("Destination {0} is unknown to the vault")]
    UnknownDestination(Address),

    #[error("Rebalance destinations match: {0}")]
    RebalanceDestinationsMatch(Destination),

    #[error("Token mismatch for {destination}: expected {expected}, got {actual}")]
    RebalanceDestinationUnderlyerMismatch {
        destination: Destination,
        expected: Address,
        actual: Address,
    },

    #[error("Insufficient assets of {token}: requested {requested}, available {available}")]
    InsufficientAssets {
        token: Address,
        requested: U256,
        available: U256,
    },

    #[error("Length mismatch in {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("NAV timestamp {attempted} is before last recorded {last}")]
    InvalidNavTimestamp { last: u64, attempted: u64 },

    #[error("Cannot look back {days_ago} days with {len} days of history")]
    InvalidDaysAgo { days_ago: usize, len: usize },

    #[error("Step at {attempted} is before the previous step at {last}")]
    StepOutOfOrder { last: u64, attempted: u64 },

    // Stale upstream data
    #[error("Stale data from {feed}: {age_secs}s old, tolerance {tolerance_secs}s")]
    StaleData {
        feed: &'static str,
        age_secs: u64,
        tolerance_secs: u64,
    },

    // Bound violations
    #[error("Max slippage exceeded: {slippage} > {ceiling}")]
    MaxSlippageExceeded { slippage: U256, ceiling: U256 },

    #[error("LST price gap tolerance exceeded")]
    LstPriceGapToleranceExceeded,

    #[error("Max discount exceeded: {discount} > {limit}")]
    MaxDiscountExceeded { discount: I256, limit: I256 },

    #[error("Max premium exceeded: {premium} > {limit}")]
    MaxPremiumExceeded { premium: I256, limit: I256 },

    #[error("Swap cost exceeded: predicted gain {predicted_gain} <= swap cost {swap_cost}")]
    SwapCostExceeded { predicted_gain: I256, swap_cost: U256 },

    // Policy
    #[error("Invalid rebalance to idle")]
    InvalidRebalanceToIdle,

    #[error("Strategy paused")]
    StrategyPaused,

    #[error("Vault is shut down, only rebalances to idle are available")]
    OnlyRebalanceToIdleAvailable,

    // Fatal
    #[error("Numeric overflow: {0}")]
    NumericOverflow(&'static str),

    // Collaborators
    #[error("Upstream error: {0}")]
    Upstream(String),

    // Configuration
    #[error("Invalid config for {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

impl Error {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ZeroAddress(_)
            | Error::ZeroAmount(_)
            | Error::UnregisteredDestination(_)
            | Error::UnknownDestination(_)
            | Error::RebalanceDestinationsMatch(_)
            | Error::RebalanceDestinationUnderlyerMismatch { .. }
            | Error::InsufficientAssets { .. }
            | Error::LengthMismatch { .. }
            | Error::InvalidNavTimestamp { .. }
            | Error::InvalidDaysAgo { .. }
            | Error::StepOutOfOrder { .. } => ErrorKind::Malformed,
            Error::StaleData { .. } => ErrorKind::Stale,
            Error::MaxSlippageExceeded { .. }
            | Error::LstPriceGapToleranceExceeded
            | Error::MaxDiscountExceeded { .. }
            | Error::MaxPremiumExceeded { .. }
            | Error::SwapCostExceeded { .. } => ErrorKind::Bound,
            Error::InvalidRebalanceToIdle
            | Error::StrategyPaused
            | Error::OnlyRebalanceToIdleAvailable => ErrorKind::Policy,
            Error::NumericOverflow(_) => ErrorKind::Fatal,
            Error::Upstream(_) => ErrorKind::Upstream,
            Error::InvalidConfig { .. } => ErrorKind::Config,
        }
    }

    /// Check if this error is unrecoverable
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }

    /// Check if this error is a bound violation the caller may resubmit around
    pub fn is_bound_violation(&self) -> bool {
        self.kind() == ErrorKind::Bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::ZeroAmount("amount_in").kind(), ErrorKind::Malformed);
        assert_eq!(Error::StrategyPaused.kind(), ErrorKind::Policy);
        assert_eq!(Error::LstPriceGapToleranceExceeded.kind(), ErrorKind::Bound);
        assert!(Error::NumericOverflow("composite").is_fatal());
        assert!(!Error::InvalidRebalanceToIdle.is_fatal());
        assert_eq!(
            Error::StepOutOfOrder { last: 2, attempted: 1 }.kind(),
            ErrorKind::Malformed
        );
    }

    #[test]
    fn test_stale_error_names_source() {
        let err = Error::StaleData {
            feed: "dex_stats",
            age_secs: 200,
            tolerance_secs: 100,
        };
        assert_eq!(err.kind(), ErrorKind::Stale);
        assert!(err.to_string().contains("dex_stats"));
    }
}
