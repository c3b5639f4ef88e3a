//! Rebalance proposal submitted by the orchestrator

use ethnum::U256;
use serde::{Deserialize, Serialize};

use super::{Address, Destination};

/// "Pull `amount_out` of `token_out` from `destination_out`, deposit
/// `amount_in` of `token_in` into `destination_in`"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceProposal {
    pub destination_in: Destination,
    pub token_in: Address,
    #[serde(with = "crate::serde_utils::u256")]
    pub amount_in: U256,
    pub destination_out: Destination,
    pub token_out: Address,
    #[serde(with = "crate::serde_utils::u256")]
    pub amount_out: U256,
}

impl RebalanceProposal {
    /// Both legs touch destination vaults
    pub fn is_vault_to_vault(&self) -> bool {
        !self.destination_in.is_idle() && !self.destination_out.is_idle()
    }
}
