//! Fixed-point helpers.
//!
//! Rates, prices and values are 18-decimal fixed point in 256-bit integers.
//! Every product that can overflow goes through a checked path and surfaces
//! `Error::NumericOverflow` instead of wrapping.

use ethnum::{I256, U256};

use crate::error::{Error, Result};

/// 1.0 in 18-decimal fixed point
pub const WAD: U256 = U256::new(1_000_000_000_000_000_000);

/// Signed 1.0 in 18-decimal fixed point
pub const WAD_I: I256 = I256::new(1_000_000_000_000_000_000);

/// 1.0 for model weights
pub const WEIGHT_PRECISION: I256 = I256::new(1_000_000);

/// Basis-point denominator
pub const BPS: U256 = U256::new(10_000);

pub const SECONDS_PER_DAY: u64 = 86_400;

pub const DAYS_PER_YEAR: I256 = I256::new(365);

/// Convert an unsigned value to signed, failing if it does not fit
pub fn to_signed(value: U256, what: &'static str) -> Result<I256> {
    if value > I256::MAX.as_u256() {
        return Err(Error::NumericOverflow(what));
    }
    Ok(value.as_i256())
}

/// `10^decimals`
pub fn ten_pow(decimals: u8) -> Result<U256> {
    let ten = U256::new(10);
    let mut out = U256::ONE;
    for _ in 0..decimals {
        out = out
            .checked_mul(ten)
            .ok_or(Error::NumericOverflow("token decimals"))?;
    }
    Ok(out)
}

/// `a * b / denominator`, zero when the denominator is zero
pub fn mul_div(a: U256, b: U256, denominator: U256, what: &'static str) -> Result<U256> {
    if denominator == U256::ZERO {
        return Ok(U256::ZERO);
    }
    let product = a.checked_mul(b).ok_or(Error::NumericOverflow(what))?;
    Ok(product / denominator)
}

/// Signed `a * b / denominator`, truncating toward zero
pub fn mul_div_signed(a: I256, b: I256, denominator: I256, what: &'static str) -> Result<I256> {
    if denominator == I256::ZERO {
        return Ok(I256::ZERO);
    }
    let product = a.checked_mul(b).ok_or(Error::NumericOverflow(what))?;
    Ok(product / denominator)
}

pub fn checked_add(a: U256, b: U256, what: &'static str) -> Result<U256> {
    a.checked_add(b).ok_or(Error::NumericOverflow(what))
}

pub fn checked_add_signed(a: I256, b: I256, what: &'static str) -> Result<I256> {
    a.checked_add(b).ok_or(Error::NumericOverflow(what))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ten_pow() {
        assert_eq!(ten_pow(0).unwrap(), U256::ONE);
        assert_eq!(ten_pow(18).unwrap(), WAD);
        assert!(ten_pow(78).is_err());
    }

    #[test]
    fn test_to_signed_bounds() {
        assert_eq!(to_signed(WAD, "x").unwrap(), WAD_I);
        assert_eq!(
            to_signed(U256::MAX, "x"),
            Err(Error::NumericOverflow("x"))
        );
    }

    #[test]
    fn test_mul_div() {
        assert_eq!(
            mul_div(U256::new(3), WAD, U256::new(2), "x").unwrap(),
            U256::new(1_500_000_000_000_000_000)
        );
        assert_eq!(mul_div(U256::new(3), WAD, U256::ZERO, "x").unwrap(), U256::ZERO);
        assert!(mul_div(U256::MAX, U256::new(2), U256::ONE, "x").is_err());
    }

    #[test]
    fn test_signed_division_truncates_toward_zero() {
        let out = mul_div_signed(I256::new(-7), I256::ONE, I256::new(2), "x").unwrap();
        assert_eq!(out, I256::new(-3));
    }
}
