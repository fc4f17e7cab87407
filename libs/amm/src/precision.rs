//! Fixed-point scale constants and overflow-safe integer helpers
//!
//! Stored quantities are `u128`. Products of two stored quantities can exceed
//! that range (two 18-decimal balances of 10^5 tokens already multiply to
//! 10^46), so every multiply-then-divide is carried out in 256 bits and
//! narrowed back at the end. Rounding direction is always explicit.

use primitive_types::U256;
use rust_decimal::Decimal;

use crate::error::{PoolError, Result};
use crate::types::Amount;

/// Share unit scale factor (18 decimals)
pub const PRECISION: Amount = 1_000_000_000_000_000_000;

/// Number of decimals in `PRECISION`
pub const PRECISION_DECIMALS: u32 = 18;

/// Shares minted for the first deposit into an empty pool
pub const INITIAL_SHARES: Amount = 100 * PRECISION;

/// Basis-point denominator for fee rates
pub const BPS_DENOMINATOR: Amount = 10_000;

/// `floor(a * b / d)` without intermediate overflow
pub fn mul_div_floor(a: Amount, b: Amount, d: Amount) -> Result<Amount> {
    if d == 0 {
        return Err(PoolError::EmptyPool);
    }
    let product = U256::from(a) * U256::from(b);
    narrow(product / U256::from(d))
}

/// `ceil(a * b / d)` without intermediate overflow
pub fn mul_div_ceil(a: Amount, b: Amount, d: Amount) -> Result<Amount> {
    if d == 0 {
        return Err(PoolError::EmptyPool);
    }
    let product = U256::from(a) * U256::from(b);
    let divisor = U256::from(d);
    let quotient = product / divisor;
    if (product % divisor).is_zero() {
        narrow(quotient)
    } else {
        narrow(quotient + U256::one())
    }
}

/// Full 256-bit product, used for the pricing invariant `k`
pub fn wide_product(a: Amount, b: Amount) -> U256 {
    U256::from(a) * U256::from(b)
}

/// Narrow a 256-bit intermediate back into a stored amount
pub fn narrow(value: U256) -> Result<Amount> {
    if value > U256::from(Amount::MAX) {
        return Err(PoolError::ArithmeticOverflow);
    }
    Ok(value.as_u128())
}

pub fn checked_add(a: Amount, b: Amount) -> Result<Amount> {
    a.checked_add(b).ok_or(PoolError::ArithmeticOverflow)
}

pub fn checked_sub(a: Amount, b: Amount) -> Result<Amount> {
    a.checked_sub(b).ok_or(PoolError::ArithmeticOverflow)
}

/// Interpret a raw amount as a decimal with `scale` fractional digits
///
/// Returns `None` when the value exceeds the 96-bit `Decimal` mantissa.
pub fn to_decimal(raw: Amount, scale: u32) -> Option<Decimal> {
    let signed = i128::try_from(raw).ok()?;
    Decimal::try_from_i128_with_scale(signed, scale)
        .ok()
        .map(|d| d.normalize())
}

/// Convert whole tokens to raw 18-decimal units
pub const fn tokens(whole: u64) -> Amount {
    whole as Amount * PRECISION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_rounding() {
        assert_eq!(mul_div_floor(7, 3, 2).unwrap(), 10);
        assert_eq!(mul_div_ceil(7, 3, 2).unwrap(), 11);
        assert_eq!(mul_div_ceil(6, 3, 2).unwrap(), 9);
        assert_eq!(mul_div_floor(1, 1, 0), Err(PoolError::EmptyPool));
    }

    #[test]
    fn test_wide_intermediates() {
        // 10^23 * 10^23 overflows u128 but the quotient fits
        let big = tokens(100_000);
        assert_eq!(mul_div_floor(big, big, big).unwrap(), big);
        assert_eq!(
            mul_div_floor(Amount::MAX, 2, 1),
            Err(PoolError::ArithmeticOverflow)
        );
    }

    #[test]
    fn test_checked_helpers() {
        assert_eq!(checked_add(Amount::MAX, 1), Err(PoolError::ArithmeticOverflow));
        assert_eq!(checked_sub(1, 2), Err(PoolError::ArithmeticOverflow));
        assert_eq!(tokens(100), INITIAL_SHARES);
    }

    #[test]
    fn test_to_decimal() {
        use rust_decimal_macros::dec;
        assert_eq!(to_decimal(tokens(3) / 2, PRECISION_DECIMALS), Some(dec!(1.5)));
        assert_eq!(to_decimal(Amount::MAX, 0), None);
    }
}
