//! Property tests for the pricing invariant and share accounting
//!
//! These hold for any reserves and trade sizes, not just the fixtures used
//! in the scenario tests.

use amm::{
    AccountId, AssetId, InMemoryCustody, PoolEngine, PoolError, PoolEvent, PoolParams, PoolQuery,
    TxContext, U256,
};
use proptest::prelude::*;

const POOL: AccountId = AccountId::from_low_byte(0xee);
const FIRST: AccountId = AccountId::from_low_byte(1);
const SECOND: AccountId = AccountId::from_low_byte(2);
const TRADER: AccountId = AccountId::from_low_byte(3);
const A1: AssetId = AssetId::from_low_byte(0xa1);
const A2: AssetId = AssetId::from_low_byte(0xa2);

const WALLET: u128 = 100_000_000_000_000_000_000_000_000_000_000_000_000; // 10^38

type Engine = PoolEngine<InMemoryCustody, Vec<PoolEvent>>;

fn seeded_pool(balance1: u128, balance2: u128, fee_rate_bps: u32) -> Engine {
    let mut custody = InMemoryCustody::new();
    for account in [FIRST, SECOND, TRADER] {
        for asset in [A1, A2] {
            custody.mint(asset, account, WALLET);
            custody.approve(asset, account, POOL, u128::MAX);
        }
    }
    let mut pool = PoolEngine::new(PoolParams::new(A1, A2, fee_rate_bps), POOL, custody, Vec::new())
        .expect("valid params");
    pool.add_liquidity(&TxContext::new(FIRST, 0), balance1, balance2)
        .expect("first deposit");
    pool
}

fn k(pool: &Engine) -> U256 {
    U256::from(pool.token1_balance()) * U256::from(pool.token2_balance())
}

prop_compose! {
    fn reserve()(raw in 1_000_000_000_000_000_000u128..1_000_000_000_000_000_000_000_000_000_000u128) -> u128 {
        raw
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_swaps_never_shrink_k(
        b1 in reserve(),
        b2 in reserve(),
        amount_in in 1u128..1_000_000_000_000_000_000_000_000u128,
        fee in 0u32..1_000,
        token1_in in any::<bool>(),
    ) {
        let mut pool = seeded_pool(b1, b2, fee);
        let before = k(&pool);
        let ctx = TxContext::new(TRADER, 1);

        let result = if token1_in {
            pool.swap_token1(&ctx, amount_in)
        } else {
            pool.swap_token2(&ctx, amount_in)
        };

        match result {
            Ok(_) => {
                let after = k(&pool);
                prop_assert!(after >= before);
                if fee > 0 {
                    prop_assert!(after > before);
                } else {
                    // the only excess is the ceiling on the out-side balance
                    let new_in = if token1_in { pool.token1_balance() } else { pool.token2_balance() };
                    prop_assert!(after - before < U256::from(new_in));
                }
            }
            Err(err) => {
                prop_assert!(matches!(err, PoolError::ZeroAmount), "unexpected {:?}", err);
                prop_assert_eq!(k(&pool), before);
            }
        }
        pool.state().check_invariants().unwrap();
    }

    #[test]
    fn prop_matched_deposits_preserve_ratio_and_shares(
        b1 in reserve(),
        b2 in reserve(),
        amount1 in 1_000_000u128..1_000_000_000_000_000_000_000_000u128,
    ) {
        let mut pool = seeded_pool(b1, b2, 0);
        let total_before = pool.total_shares();
        let amount2 = pool.calculate_token2_deposit(amount1).unwrap();

        match pool.add_liquidity(&TxContext::new(SECOND, 1), amount1, amount2) {
            Ok(issued) => {
                let expected = U256::from(amount1) * U256::from(total_before) / U256::from(b1);
                prop_assert_eq!(U256::from(issued), expected);
                prop_assert_eq!(pool.total_shares(), total_before + issued);

                // b1' * b2 - b2' * b1 lies in [0, b1)
                let lhs = U256::from(pool.token1_balance()) * U256::from(b2);
                let rhs = U256::from(pool.token2_balance()) * U256::from(b1);
                prop_assert!(lhs >= rhs);
                prop_assert!(lhs - rhs < U256::from(b1));
            }
            Err(err) => {
                // dust on one side or zero shares
                prop_assert_eq!(err, PoolError::ZeroAmount);
                prop_assert_eq!(pool.total_shares(), total_before);
            }
        }
    }

    #[test]
    fn prop_deposit_then_withdraw_never_profits(
        b1 in reserve(),
        b2 in reserve(),
        amount1 in 1_000_000_000u128..1_000_000_000_000_000_000_000_000u128,
    ) {
        let mut pool = seeded_pool(b1, b2, 0);
        let amount2 = pool.calculate_token2_deposit(amount1).unwrap();
        let issued = match pool.add_liquidity(&TxContext::new(SECOND, 1), amount1, amount2) {
            Ok(issued) => issued,
            Err(_) => return Ok(()),
        };

        let (out1, out2) = pool.remove_liquidity(&TxContext::new(SECOND, 2), issued).unwrap();
        prop_assert!(out1 <= amount1);
        prop_assert!(out2 <= amount2);
        prop_assert_eq!(pool.shares_of(&SECOND), 0);
        pool.state().check_invariants().unwrap();
    }

    #[test]
    fn prop_larger_trades_get_worse_rates(
        b1 in 1_000_000_000_000_000_000_000u128..1_000_000_000_000_000_000_000_000u128,
        b2 in 1_000_000_000_000_000_000_000u128..1_000_000_000_000_000_000_000_000u128,
        x1 in 1_000_000_000_000_000_000u128..1_000_000_000_000_000_000_000u128,
        extra in 1_000_000_000_000_000_000u128..1_000_000_000_000_000_000_000u128,
        fee in 0u32..100,
    ) {
        let pool = seeded_pool(b1, b2, fee);
        let x2 = x1 + extra;
        let out1 = pool.calculate_token1_swap(x1).unwrap();
        let out2 = pool.calculate_token1_swap(x2).unwrap();

        prop_assert!(out2 > out1);
        // out1 / x1 > out2 / x2
        prop_assert!(U256::from(out1) * U256::from(x2) > U256::from(out2) * U256::from(x1));
    }
}
