//! Swap Engine
//!
//! Both trade directions go through the same planning routine; the direction
//! only decides which balance is the input side. Keeping a single code path is
//! what guarantees identical rounding and invariant checks for both assets.

use tracing::debug;

use crate::error::{PoolError, Result};
use crate::pool_state::{PoolState, Reserves, Side};
use crate::precision::checked_add;
use crate::swap_math::calculate_swap_out;
use crate::types::{AccountId, Amount, AssetId};

/// Which asset the trader gives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapDirection {
    /// Give asset 1, receive asset 2
    Token1In,
    /// Give asset 2, receive asset 1
    Token2In,
}

impl SwapDirection {
    pub fn input_side(self) -> Side {
        match self {
            SwapDirection::Token1In => Side::One,
            SwapDirection::Token2In => Side::Two,
        }
    }

    pub fn output_side(self) -> Side {
        self.input_side().other()
    }
}

/// Validated effect of a swap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapPlan {
    pub trader: AccountId,
    pub direction: SwapDirection,
    pub asset_in: AssetId,
    pub asset_out: AssetId,
    pub amount_in: Amount,
    pub amount_out: Amount,
    pub prev_balance_in: Amount,
    pub prev_balance_out: Amount,
    pub new_balance_in: Amount,
    pub new_balance_out: Amount,
}

/// Quote a swap in `direction` against a reserves snapshot
pub fn quote_on_reserves(
    reserves: &Reserves,
    fee_rate_bps: u32,
    direction: SwapDirection,
    amount_in: Amount,
) -> Result<Amount> {
    calculate_swap_out(
        amount_in,
        reserves.balance(direction.input_side()),
        reserves.balance(direction.output_side()),
        fee_rate_bps,
    )
}

/// Quote a swap in `direction` against the current reserves
pub fn quote_swap(state: &PoolState, direction: SwapDirection, amount_in: Amount) -> Result<Amount> {
    quote_on_reserves(
        &state.reserves(),
        state.params().fee_rate_bps,
        direction,
        amount_in,
    )
}

/// Output of giving `amount_in` of asset 1
pub fn calculate_token1_swap(state: &PoolState, amount_in: Amount) -> Result<Amount> {
    quote_swap(state, SwapDirection::Token1In, amount_in)
}

/// Output of giving `amount_in` of asset 2
pub fn calculate_token2_swap(state: &PoolState, amount_in: Amount) -> Result<Amount> {
    quote_swap(state, SwapDirection::Token2In, amount_in)
}

pub fn plan_swap(
    state: &PoolState,
    trader: AccountId,
    direction: SwapDirection,
    amount_in: Amount,
) -> Result<SwapPlan> {
    let input = direction.input_side();
    let output = direction.output_side();
    let balance_in = state.balance(input);
    let balance_out = state.balance(output);

    let amount_out = quote_swap(state, direction, amount_in)?;
    if amount_out >= balance_out {
        return Err(PoolError::InsufficientLiquidity {
            available: balance_out,
            requested: amount_out,
        });
    }
    if amount_out == 0 {
        // trader would give value for nothing
        return Err(PoolError::ZeroAmount);
    }

    let plan = SwapPlan {
        trader,
        direction,
        asset_in: state.asset(input),
        asset_out: state.asset(output),
        amount_in,
        amount_out,
        prev_balance_in: balance_in,
        prev_balance_out: balance_out,
        new_balance_in: checked_add(balance_in, amount_in)?,
        new_balance_out: balance_out - amount_out,
    };
    debug!(?plan, "planned swap");
    Ok(plan)
}

pub(crate) fn apply_swap(state: &mut PoolState, plan: &SwapPlan) {
    state.set_balance(plan.direction.input_side(), plan.new_balance_in);
    state.set_balance(plan.direction.output_side(), plan.new_balance_out);
}

pub(crate) fn revert_swap(state: &mut PoolState, plan: &SwapPlan) {
    state.set_balance(plan.direction.input_side(), plan.prev_balance_in);
    state.set_balance(plan.direction.output_side(), plan.prev_balance_out);
}
