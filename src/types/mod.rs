//! Shared types: identifiers, proposals and upstream statistics snapshots

pub mod address;
pub mod proposal;
pub mod stats;

pub use address::{Address, AddressParseError, Destination};
pub use proposal::RebalanceProposal;
pub use stats::{DestinationInfo, DexLstStats, LstStats, StakingIncentiveStats};
