//! Liquidity Manager
//!
//! Computes deposit and withdrawal effects on reserves and shares. Planning is
//! pure; `apply_*` commits a validated plan and `revert_*` undoes it exactly,
//! which the engine uses when custody settlement fails.

use tracing::debug;

use crate::error::{PoolError, Result};
use crate::pool_state::{PoolState, Reserves, Side};
use crate::precision::{checked_add, mul_div_floor, INITIAL_SHARES};
use crate::types::{AccountId, Amount};

/// Validated effect of an `add_liquidity` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositPlan {
    pub provider: AccountId,
    pub amount1: Amount,
    pub amount2: Amount,
    pub shares_issued: Amount,
    pub prev_balance1: Amount,
    pub prev_balance2: Amount,
    pub new_balance1: Amount,
    pub new_balance2: Amount,
}

/// Validated effect of a `remove_liquidity` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawalPlan {
    pub provider: AccountId,
    pub shares_burned: Amount,
    pub amount1: Amount,
    pub amount2: Amount,
    pub prev_balance1: Amount,
    pub prev_balance2: Amount,
    pub new_balance1: Amount,
    pub new_balance2: Amount,
}

/// Amount of the other asset required to deposit `amount` of `side` at the current ratio
///
/// Rounded down. Fails with `EmptyPool` before the first deposit since no
/// ratio exists yet.
pub fn proportional_deposit(reserves: &Reserves, side: Side, amount: Amount) -> Result<Amount> {
    if reserves.is_empty() {
        return Err(PoolError::EmptyPool);
    }
    mul_div_floor(reserves.balance(side.other()), amount, reserves.balance(side))
}

/// Asset 2 amount matching a deposit of `amount1` of asset 1
pub fn calculate_token2_deposit(state: &PoolState, amount1: Amount) -> Result<Amount> {
    proportional_deposit(&state.reserves(), Side::One, amount1)
}

/// Asset 1 amount matching a deposit of `amount2` of asset 2
pub fn calculate_token1_deposit(state: &PoolState, amount2: Amount) -> Result<Amount> {
    proportional_deposit(&state.reserves(), Side::Two, amount2)
}

pub fn plan_add_liquidity(
    state: &PoolState,
    provider: AccountId,
    amount1: Amount,
    amount2: Amount,
) -> Result<DepositPlan> {
    if amount1 == 0 || amount2 == 0 {
        return Err(PoolError::ZeroAmount);
    }

    let total = state.total_shares();
    let shares_issued = if total == 0 {
        // first deposit sets the price; the ratio is the caller's choice
        INITIAL_SHARES
    } else {
        let required = calculate_token2_deposit(state, amount1)?;
        if amount2 < required || amount2 - required > 1 {
            return Err(PoolError::InvalidDepositRatio {
                required,
                supplied: amount2,
            });
        }
        let shares = mul_div_floor(amount1, total, state.balance1())?;
        if shares == 0 {
            return Err(PoolError::ZeroAmount);
        }
        shares
    };
    // ledger mint must not be able to fail once the plan is accepted
    checked_add(total, shares_issued)?;

    let plan = DepositPlan {
        provider,
        amount1,
        amount2,
        shares_issued,
        prev_balance1: state.balance1(),
        prev_balance2: state.balance2(),
        new_balance1: checked_add(state.balance1(), amount1)?,
        new_balance2: checked_add(state.balance2(), amount2)?,
    };
    debug!(?plan, "planned deposit");
    Ok(plan)
}

pub fn plan_remove_liquidity(
    state: &PoolState,
    provider: AccountId,
    shares: Amount,
) -> Result<WithdrawalPlan> {
    if shares == 0 {
        return Err(PoolError::ZeroAmount);
    }
    let available = state.shares_of(&provider);
    if shares > available {
        return Err(PoolError::InsufficientShares {
            available,
            requested: shares,
        });
    }

    let total = state.total_shares();
    let amount1 = mul_div_floor(state.balance1(), shares, total)?;
    let amount2 = mul_div_floor(state.balance2(), shares, total)?;

    let plan = WithdrawalPlan {
        provider,
        shares_burned: shares,
        amount1,
        amount2,
        prev_balance1: state.balance1(),
        prev_balance2: state.balance2(),
        // shares <= total, so each payout is at most the balance
        new_balance1: state.balance1() - amount1,
        new_balance2: state.balance2() - amount2,
    };
    debug!(?plan, "planned withdrawal");
    Ok(plan)
}

pub(crate) fn apply_deposit(state: &mut PoolState, plan: &DepositPlan) -> Result<()> {
    state.ledger.mint(plan.provider, plan.shares_issued)?;
    state.balance1 = plan.new_balance1;
    state.balance2 = plan.new_balance2;
    Ok(())
}

pub(crate) fn revert_deposit(state: &mut PoolState, plan: &DepositPlan) -> Result<()> {
    state.ledger.burn(plan.provider, plan.shares_issued)?;
    state.balance1 = plan.prev_balance1;
    state.balance2 = plan.prev_balance2;
    Ok(())
}

pub(crate) fn apply_withdrawal(state: &mut PoolState, plan: &WithdrawalPlan) -> Result<()> {
    state.ledger.burn(plan.provider, plan.shares_burned)?;
    state.balance1 = plan.new_balance1;
    state.balance2 = plan.new_balance2;
    Ok(())
}

pub(crate) fn revert_withdrawal(state: &mut PoolState, plan: &WithdrawalPlan) -> Result<()> {
    state.ledger.mint(plan.provider, plan.shares_burned)?;
    state.balance1 = plan.prev_balance1;
    state.balance2 = plan.prev_balance2;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precision::{tokens, PRECISION};
    use crate::types::{AssetId, PoolParams};

    fn empty_pool() -> PoolState {
        PoolState::new(PoolParams::new(
            AssetId::from_low_byte(1),
            AssetId::from_low_byte(2),
            0,
        ))
        .unwrap()
    }

    fn seeded_pool(b1: Amount, b2: Amount) -> PoolState {
        let mut state = empty_pool();
        let plan = plan_add_liquidity(&state, AccountId::from_low_byte(9), b1, b2).unwrap();
        apply_deposit(&mut state, &plan).unwrap();
        state
    }

    #[test]
    fn test_first_deposit_issues_initial_shares() {
        let state = empty_pool();
        let plan = plan_add_liquidity(&state, AccountId::from_low_byte(1), 7, 3).unwrap();
        assert_eq!(plan.shares_issued, 100 * PRECISION);
        assert_eq!((plan.new_balance1, plan.new_balance2), (7, 3));
    }

    #[test]
    fn test_deposit_quote_on_empty_pool_fails() {
        let state = empty_pool();
        assert_eq!(calculate_token2_deposit(&state, 10), Err(PoolError::EmptyPool));
        assert_eq!(calculate_token1_deposit(&state, 10), Err(PoolError::EmptyPool));
    }

    #[test]
    fn test_proportional_deposit_quotes() {
        let state = seeded_pool(tokens(1_000), tokens(3_000));
        assert_eq!(calculate_token2_deposit(&state, tokens(10)).unwrap(), tokens(30));
        assert_eq!(calculate_token1_deposit(&state, tokens(30)).unwrap(), tokens(10));
        // floor on a non-exact ratio
        let odd = seeded_pool(3, 5);
        assert_eq!(calculate_token2_deposit(&odd, 1).unwrap(), 1);
    }

    #[test]
    fn test_ratio_tolerance_is_one_unit_upward() {
        let state = seeded_pool(3_000, 5_000);
        let provider = AccountId::from_low_byte(2);
        // required = 5000 * 10 / 3000 = 16
        assert!(plan_add_liquidity(&state, provider, 10, 16).is_ok());
        assert!(plan_add_liquidity(&state, provider, 10, 17).is_ok());
        assert_eq!(
            plan_add_liquidity(&state, provider, 10, 15),
            Err(PoolError::InvalidDepositRatio {
                required: 16,
                supplied: 15
            })
        );
        assert!(matches!(
            plan_add_liquidity(&state, provider, 10, 18),
            Err(PoolError::InvalidDepositRatio { .. })
        ));
    }

    #[test]
    fn test_dust_deposit_minting_no_shares_is_rejected() {
        let state = seeded_pool(tokens(1_000_000_000_000), tokens(1_000_000_000_000));
        // 1 * 10^20 / 10^30 rounds to zero shares
        assert_eq!(
            plan_add_liquidity(&state, AccountId::from_low_byte(2), 1, 1),
            Err(PoolError::ZeroAmount)
        );
    }

    #[test]
    fn test_withdrawal_is_proportional_and_rounds_down() {
        let mut state = seeded_pool(1_001, 2_003);
        let provider = AccountId::from_low_byte(9);
        let total = state.total_shares();

        let plan = plan_remove_liquidity(&state, provider, total / 3).unwrap();
        assert_eq!(plan.amount1, 1_001 * (total / 3) / total);
        assert_eq!(plan.amount2, 2_003 * (total / 3) / total);

        apply_withdrawal(&mut state, &plan).unwrap();
        revert_withdrawal(&mut state, &plan).unwrap();
        assert_eq!((state.balance1(), state.balance2()), (1_001, 2_003));
        assert_eq!(state.shares_of(&provider), total);
    }

    #[test]
    fn test_withdrawal_preconditions() {
        let state = seeded_pool(100, 100);
        let stranger = AccountId::from_low_byte(3);
        assert_eq!(
            plan_remove_liquidity(&state, stranger, 0),
            Err(PoolError::ZeroAmount)
        );
        assert_eq!(
            plan_remove_liquidity(&state, stranger, 1),
            Err(PoolError::InsufficientShares {
                available: 0,
                requested: 1
            })
        );
    }

    #[test]
    fn test_deposit_revert_restores_state() {
        let mut state = seeded_pool(1_000, 1_000);
        let provider = AccountId::from_low_byte(4);
        let plan = plan_add_liquidity(&state, provider, 500, 500).unwrap();
        apply_deposit(&mut state, &plan).unwrap();
        assert_eq!(state.shares_of(&provider), 50 * PRECISION);

        revert_deposit(&mut state, &plan).unwrap();
        assert_eq!(state.shares_of(&provider), 0);
        assert_eq!(state.total_shares(), 100 * PRECISION);
        assert_eq!((state.balance1(), state.balance2()), (1_000, 1_000));
        state.check_invariants().unwrap();
    }
}
