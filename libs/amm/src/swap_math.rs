//! Constant-product curve math with exact integer rounding
//!
//! Pure functions over a `(balance_in, balance_out)` pair, so the same code
//! prices both swap directions. Every rounding step favors the pool.

use primitive_types::U256;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::{PoolError, Result};
use crate::precision::{
    mul_div_ceil, mul_div_floor, narrow, to_decimal, wide_product, BPS_DENOMINATOR, PRECISION,
    PRECISION_DECIMALS,
};
use crate::types::Amount;

/// Input remaining after the fee is withheld, rounded down
pub fn amount_in_after_fee(amount_in: Amount, fee_bps: u32) -> Result<Amount> {
    let fee = fee_bps as Amount;
    if fee >= BPS_DENOMINATOR {
        return Err(PoolError::InvalidParams(format!(
            "fee rate {} bps must be below {}",
            fee_bps, BPS_DENOMINATOR
        )));
    }
    mul_div_floor(amount_in, BPS_DENOMINATOR - fee, BPS_DENOMINATOR)
}

/// Calculate the output of an x*y=k swap
///
/// `amount_out = balance_out - ceil(k / (balance_in + amount_in_after_fee))`.
/// Rounding the new out-side balance up rounds the payout down, so
/// `balance_in' * balance_out' >= k` for every swap.
///
/// A zero `amount_in` fails with `ZeroAmount` before the reserves are looked
/// at, so a zero-input swap on an empty pool reports `ZeroAmount` in either
/// direction.
///
/// # Arguments
/// * `amount_in` - Input amount given by the trader
/// * `balance_in` - Pool balance of the input asset
/// * `balance_out` - Pool balance of the output asset
/// * `fee_bps` - Fee in basis points (30 = 0.3%)
pub fn calculate_swap_out(
    amount_in: Amount,
    balance_in: Amount,
    balance_out: Amount,
    fee_bps: u32,
) -> Result<Amount> {
    if amount_in == 0 {
        return Err(PoolError::ZeroAmount);
    }
    if balance_in == 0 || balance_out == 0 {
        return Err(PoolError::ZeroLiquidity);
    }

    let effective_in = amount_in_after_fee(amount_in, fee_bps)?;
    let k = wide_product(balance_in, balance_out);
    // sum of two u128 values always fits in 256 bits
    let denominator = U256::from(balance_in) + U256::from(effective_in);

    let quotient = k / denominator;
    let new_balance_out = if (k % denominator).is_zero() {
        quotient
    } else {
        quotient + U256::one()
    };
    let new_balance_out = narrow(new_balance_out)?;

    Ok(balance_out - new_balance_out)
}

/// Smallest input whose swap output is at least `amount_out`, rounded up
pub fn calculate_swap_in(
    amount_out: Amount,
    balance_in: Amount,
    balance_out: Amount,
    fee_bps: u32,
) -> Result<Amount> {
    if amount_out == 0 {
        return Err(PoolError::ZeroAmount);
    }
    if balance_in == 0 || balance_out == 0 {
        return Err(PoolError::ZeroLiquidity);
    }
    if amount_out >= balance_out {
        return Err(PoolError::InsufficientLiquidity {
            available: balance_out,
            requested: amount_out,
        });
    }

    let fee = fee_bps as Amount;
    if fee >= BPS_DENOMINATOR {
        return Err(PoolError::InvalidParams(format!(
            "fee rate {} bps must be below {}",
            fee_bps, BPS_DENOMINATOR
        )));
    }

    let effective_in = mul_div_ceil(balance_in, amount_out, balance_out - amount_out)?;
    mul_div_ceil(effective_in, BPS_DENOMINATOR, BPS_DENOMINATOR - fee)
}

/// Price impact of a trade as a percentage of the pre-trade price
pub fn price_impact(
    amount_in: Amount,
    balance_in: Amount,
    balance_out: Amount,
    fee_bps: u32,
) -> Result<Decimal> {
    let amount_out = calculate_swap_out(amount_in, balance_in, balance_out, fee_bps)?;

    let new_in = balance_in
        .checked_add(amount_in)
        .ok_or(PoolError::ArithmeticOverflow)?;
    let price_before = fixed_ratio(balance_out, balance_in)?;
    let price_after = fixed_ratio(balance_out - amount_out, new_in)?;

    if price_before.is_zero() {
        return Ok(Decimal::ZERO);
    }
    Ok((price_before - price_after).abs() / price_before * dec!(100))
}

/// Shortfall of the actual output against the spot-price output, in percent
pub fn slippage(
    amount_in: Amount,
    balance_in: Amount,
    balance_out: Amount,
    fee_bps: u32,
) -> Result<Decimal> {
    let actual = calculate_swap_out(amount_in, balance_in, balance_out, fee_bps)?;
    let ideal = mul_div_floor(amount_in, balance_out, balance_in)?;
    if ideal == 0 {
        return Ok(Decimal::ZERO);
    }

    let ideal_dec = to_decimal(ideal, 0).ok_or(PoolError::ArithmeticOverflow)?;
    let shortfall = to_decimal(ideal.saturating_sub(actual), 0).ok_or(PoolError::ArithmeticOverflow)?;
    Ok(shortfall / ideal_dec * dec!(100))
}

fn fixed_ratio(numerator: Amount, denominator: Amount) -> Result<Decimal> {
    let scaled = mul_div_floor(numerator, PRECISION, denominator)?;
    to_decimal(scaled, PRECISION_DECIMALS).ok_or(PoolError::ArithmeticOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precision::tokens;

    #[test]
    fn test_swap_out_with_fee() {
        // fee leaves 99 of 100 units, 2000 * 99 / 1099 = 180.16
        let out = calculate_swap_out(100, 1_000, 2_000, 30).unwrap();
        assert_eq!(out, 180);

        // 100 tokens in, 1000:2000 reserves, 0.3% fee -> ~181.32 tokens
        let out = calculate_swap_out(tokens(100), tokens(1_000), tokens(2_000), 30).unwrap();
        assert!(out > tokens(181) && out < tokens(182));
    }

    #[test]
    fn test_swap_out_rounds_down() {
        // ideal output is 2000 * 1 / 1001 = 1.998..., payout must be 1
        assert_eq!(calculate_swap_out(1, 1_000, 2_000, 0).unwrap(), 1);
        // exact division leaves the product untouched
        assert_eq!(calculate_swap_out(1_000, 1_000, 2_000, 0).unwrap(), 1_000);
    }

    #[test]
    fn test_swap_out_rejects_bad_inputs() {
        assert_eq!(calculate_swap_out(0, 10, 10, 0), Err(PoolError::ZeroAmount));
        assert_eq!(calculate_swap_out(1, 0, 10, 0), Err(PoolError::ZeroLiquidity));
        assert_eq!(calculate_swap_out(1, 10, 0, 0), Err(PoolError::ZeroLiquidity));
        // zero input wins over empty reserves on both sides
        assert_eq!(calculate_swap_out(0, 0, 0, 30), Err(PoolError::ZeroAmount));
        assert!(matches!(
            calculate_swap_out(1, 10, 10, 10_000),
            Err(PoolError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_swap_in_covers_requested_output() {
        let (b_in, b_out) = (tokens(1_000), tokens(2_000));
        for fee in [0u32, 30, 100] {
            let wanted = tokens(50);
            let needed = calculate_swap_in(wanted, b_in, b_out, fee).unwrap();
            assert!(calculate_swap_out(needed, b_in, b_out, fee).unwrap() >= wanted);
            assert!(calculate_swap_out(needed - 1, b_in, b_out, fee).unwrap() <= wanted);
        }
        assert!(matches!(
            calculate_swap_in(b_out, b_in, b_out, 0),
            Err(PoolError::InsufficientLiquidity { .. })
        ));
    }

    #[test]
    fn test_price_impact() {
        let impact = price_impact(tokens(100), tokens(1_000), tokens(2_000), 0).unwrap();

        // 10% of reserves moves the price noticeably but not extremely
        assert!(impact > dec!(0));
        assert!(impact < dec!(20));
    }

    #[test]
    fn test_slippage_grows_with_size() {
        let small = slippage(tokens(1), tokens(1_000), tokens(1_000), 0).unwrap();
        let large = slippage(tokens(100), tokens(1_000), tokens(1_000), 0).unwrap();
        assert!(small < large);
    }
}
