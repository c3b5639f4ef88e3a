//! Discount decay
//!
//! A discount on an LST is expected to close over time, so its contribution
//! to the expected return shrinks the longer it has persisted. The decay is a
//! fixed-point half-life approximation: halve once per full half-life, then
//! interpolate linearly to half of that across the remaining partial period.

use ethnum::I256;

use crate::math::{SECONDS_PER_DAY, WAD_I};
use crate::types::stats::{LstStats, DISCOUNT_BANDS};

/// Width of one discount band, 1%
pub const DISCOUNT_BAND: I256 = I256::new(10_000_000_000_000_000);

pub const DISCOUNT_DECAY_HALF_LIFE_SECS: u64 = 30 * SECONDS_PER_DAY;

const WAD_U128: u128 = 1_000_000_000_000_000_000;

/// Fraction of the discount left after `elapsed` seconds, 1e18 = all of it
pub fn decay_scale(elapsed: u64) -> u128 {
    let halvings = elapsed / DISCOUNT_DECAY_HALF_LIFE_SECS;
    if halvings >= 128 {
        return 0;
    }
    let scale = WAD_U128 >> halvings;
    let partial = (elapsed % DISCOUNT_DECAY_HALF_LIFE_SECS) as u128;
    scale - scale * partial / DISCOUNT_DECAY_HALF_LIFE_SECS as u128 / 2
}

/// Discount (positive) or premium (negative) of an LST after decay.
///
/// The discount is first clamped at `max_allowed_discount`. Discounts of at
/// most 1% and all premiums are returned as is. Larger discounts decay from
/// the time the discount crossed its current whole-percent band (capped at
/// the 5% band).
pub fn decayed_discount(stats: &LstStats, max_allowed_discount: I256, now: u64) -> I256 {
    let discount = stats.discount.min(max_allowed_discount);
    if discount <= DISCOUNT_BAND {
        return discount;
    }

    let mut band = 1;
    while band < DISCOUNT_BANDS && discount >= DISCOUNT_BAND * I256::new(band as i128 + 1) {
        band += 1;
    }
    let crossed_at = stats.discount_timestamp_by_percent[band - 1];
    let elapsed = now.saturating_sub(crossed_at);

    discount * I256::new(decay_scale(elapsed) as i128) / WAD_I
}
