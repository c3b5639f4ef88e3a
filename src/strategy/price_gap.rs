//! LST Price Gap Validator
//!
//! Compares the manipulation-resistant (safe) price of every LST in a
//! destination pool against its spot price in that pool. Only the unfavourable
//! direction is checked for each leg: selling out of a pool where spot trades
//! below safe, or buying into a pool where spot trades above safe.

use ethnum::U256;

use crate::error::Result;
use crate::market::MarketContext;
use crate::math::BPS;
use crate::types::{Destination, RebalanceProposal};

/// Divergence of `spot` from `safe` in bps of `safe`, in the direction that
/// hurts the given leg. `None` if either price is zero or the gap overflows.
fn adverse_gap_bps(safe: U256, spot: U256, selling: bool) -> Option<U256> {
    if safe == U256::ZERO || spot == U256::ZERO {
        return None;
    }
    let gap = if selling {
        safe.saturating_sub(spot)
    } else {
        spot.saturating_sub(safe)
    };
    gap.checked_mul(BPS).map(|scaled| scaled / safe)
}

pub struct PriceGapValidator<'a> {
    market: &'a MarketContext,
}

impl<'a> PriceGapValidator<'a> {
    pub fn new(market: &'a MarketContext) -> Self {
        Self { market }
    }

    /// True when every LST of both destinations is within `tolerance_bps`
    pub fn check(&self, proposal: &RebalanceProposal, tolerance_bps: u32) -> Result<bool> {
        let tolerance = U256::from(tolerance_bps);
        Ok(self.check_leg(proposal.destination_out, true, tolerance)?
            && self.check_leg(proposal.destination_in, false, tolerance)?)
    }

    fn check_leg(&self, destination: Destination, selling: bool, tolerance: U256) -> Result<bool> {
        let Some(address) = destination.address() else {
            return Ok(true);
        };
        let vault = self.market.destination(address)?;
        let pool = vault.pool();

        for token in vault.underlying_tokens() {
            let safe = self.market.oracle.safe_price(token)?;
            let spot = self.market.oracle.spot_price(token, pool)?;

            match adverse_gap_bps(safe, spot, selling) {
                Some(gap) if gap <= tolerance => {}
                gap => {
                    tracing::warn!(
                        destination = %address,
                        token = %token,
                        safe = %safe,
                        spot = %spot,
                        gap_bps = ?gap.map(|g| g.to_string()),
                        "LST price gap outside tolerance"
                    );
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::testing::{addr, MarketBuilder};
    use crate::types::Destination;

    const E18: u128 = 1_000_000_000_000_000_000;

    fn proposal(out: Destination, inn: Destination) -> RebalanceProposal {
        RebalanceProposal {
            destination_in: inn,
            token_in: addr(0xa1),
            amount_in: U256::new(E18),
            destination_out: out,
            token_out: addr(0xa2),
            amount_out: U256::new(E18),
        }
    }

    #[test]
    fn test_adverse_gap_direction() {
        let safe = U256::new(E18);
        let below = U256::new(E18 - E18 / 100); // spot 1% below safe
        assert_eq!(adverse_gap_bps(safe, below, true), Some(U256::new(100)));
        assert_eq!(adverse_gap_bps(safe, below, false), Some(U256::ZERO));
        assert_eq!(adverse_gap_bps(U256::ZERO, below, true), None);
        assert_eq!(adverse_gap_bps(safe, U256::ZERO, false), None);
    }

    #[test]
    fn test_out_leg_fails_when_spot_below_safe() {
        let lst = addr(0x11);
        let market = MarketBuilder::new(1_000)
            .destination(addr(0xd1), addr(0xa2), vec![lst])
            .destination(addr(0xd2), addr(0xa1), vec![])
            .prices(lst, U256::new(E18), U256::new(E18 - E18 / 500)) // 20 bps below
            .build();
        let validator = PriceGapValidator::new(&market);

        let out_of_d1 = proposal(Destination::Vault(addr(0xd1)), Destination::Vault(addr(0xd2)));
        assert!(!validator.check(&out_of_d1, 10).unwrap());
        assert!(validator.check(&out_of_d1, 20).unwrap());

        // Buying into a pool trading below safe is favourable and ignored
        let into_d1 = proposal(Destination::Vault(addr(0xd2)), Destination::Vault(addr(0xd1)));
        assert!(validator.check(&into_d1, 10).unwrap());
    }

    #[test]
    fn test_in_leg_fails_when_spot_above_safe() {
        let lst = addr(0x11);
        let market = MarketBuilder::new(1_000)
            .destination(addr(0xd1), addr(0xa1), vec![lst])
            .destination(addr(0xd2), addr(0xa2), vec![])
            .prices(lst, U256::new(E18), U256::new(E18 + E18 / 500))
            .build();
        let validator = PriceGapValidator::new(&market);

        let into_d1 = proposal(Destination::Vault(addr(0xd2)), Destination::Vault(addr(0xd1)));
        assert!(!validator.check(&into_d1, 10).unwrap());

        let out_of_d1 = proposal(Destination::Vault(addr(0xd1)), Destination::Vault(addr(0xd2)));
        assert!(validator.check(&out_of_d1, 10).unwrap());
    }

    #[test]
    fn test_zero_price_fails() {
        let lst = addr(0x11);
        let market = MarketBuilder::new(1_000)
            .destination(addr(0xd1), addr(0xa1), vec![lst])
            .prices(lst, U256::ZERO, U256::new(E18))
            .build();
        let validator = PriceGapValidator::new(&market);
        let into_d1 = proposal(Destination::Idle, Destination::Vault(addr(0xd1)));
        assert!(!validator.check(&into_d1, 10_000).unwrap());
    }
}
