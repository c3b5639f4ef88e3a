//! Proposal validation and valuation
//!
//! Structural checks every proposal must pass before any risk check runs, and
//! the ETH valuation of both legs that slippage is measured on.

use ethnum::U256;

use super::types::ValueStats;
use crate::error::{Error, Result};
use crate::market::MarketContext;
use crate::math::{mul_div, ten_pow, WAD};
use crate::types::{Address, Destination, RebalanceProposal};

fn ensure_destination_set(destination: Destination, what: &'static str) -> Result<()> {
    match destination.address() {
        Some(address) if address.is_zero() => Err(Error::ZeroAddress(what)),
        _ => Ok(()),
    }
}

/// Structural validity of a proposal against the vault's current state
pub fn validate_proposal(market: &MarketContext, proposal: &RebalanceProposal) -> Result<()> {
    ensure_destination_set(proposal.destination_in, "destination_in")?;
    ensure_destination_set(proposal.destination_out, "destination_out")?;
    if proposal.token_in.is_zero() {
        return Err(Error::ZeroAddress("token_in"));
    }
    if proposal.token_out.is_zero() {
        return Err(Error::ZeroAddress("token_out"));
    }
    if proposal.amount_in == U256::ZERO {
        return Err(Error::ZeroAmount("amount_in"));
    }
    if proposal.amount_out == U256::ZERO {
        return Err(Error::ZeroAmount("amount_out"));
    }

    let vault = &market.vault;
    for destination in [proposal.destination_in, proposal.destination_out] {
        if let Some(address) = destination.address() {
            if !vault.is_registered(address) && !vault.is_queued_for_removal(address) {
                return Err(Error::UnregisteredDestination(address));
            }
        }
    }

    if vault.is_shutdown() && !proposal.destination_in.is_idle() {
        return Err(Error::OnlyRebalanceToIdleAvailable);
    }

    if proposal.destination_in == proposal.destination_out {
        return Err(Error::RebalanceDestinationsMatch(proposal.destination_in));
    }

    ensure_underlying(market, proposal.destination_in, proposal.token_in)?;
    ensure_underlying(market, proposal.destination_out, proposal.token_out)?;

    let available = match proposal.destination_out {
        Destination::Idle => vault.total_idle(),
        Destination::Vault(address) => vault.destination_shares(address),
    };
    if available < proposal.amount_out {
        return Err(Error::InsufficientAssets {
            token: proposal.token_out,
            requested: proposal.amount_out,
            available,
        });
    }

    Ok(())
}

fn ensure_underlying(market: &MarketContext, destination: Destination, token: Address) -> Result<()> {
    let expected = match destination {
        Destination::Idle => market.vault.base_asset(),
        Destination::Vault(address) => market.destination(address)?.underlying(),
    };
    if expected != token {
        return Err(Error::RebalanceDestinationUnderlyerMismatch {
            destination,
            expected,
            actual: token,
        });
    }
    Ok(())
}

/// Price of one unit of a destination's token, 1:1 for idle
pub fn token_price(market: &MarketContext, destination: Destination) -> Result<U256> {
    match destination {
        Destination::Idle => Ok(WAD),
        Destination::Vault(address) => market.destination(address)?.validated_spot_price(),
    }
}

fn eth_value(market: &MarketContext, destination: Destination, price: U256, amount: U256) -> Result<U256> {
    let decimals = match destination {
        Destination::Idle => return Ok(amount),
        Destination::Vault(address) => market.destination(address)?.decimals(),
    };
    mul_div(price, amount, ten_pow(decimals)?, "eth value")
}

/// Value both legs and derive the swap cost and slippage
pub fn value_stats(market: &MarketContext, proposal: &RebalanceProposal) -> Result<ValueStats> {
    let out_price = token_price(market, proposal.destination_out)?;
    let in_price = token_price(market, proposal.destination_in)?;

    let out_eth_value = eth_value(market, proposal.destination_out, out_price, proposal.amount_out)?;
    let in_eth_value = eth_value(market, proposal.destination_in, in_price, proposal.amount_in)?;

    let swap_cost = out_eth_value.saturating_sub(in_eth_value);
    let slippage = if out_eth_value == U256::ZERO {
        U256::ZERO
    } else {
        mul_div(swap_cost, WAD, out_eth_value, "slippage")?
    };

    Ok(ValueStats {
        in_price,
        out_price,
        in_eth_value,
        out_eth_value,
        swap_cost,
        slippage,
    })
}
