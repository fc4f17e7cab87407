//! Read-only query surface exposed to hosts and UIs

use rust_decimal::Decimal;

use crate::error::Result;
use crate::liquidity;
use crate::pool_state::PoolState;
use crate::swap;
use crate::types::{AccountId, Amount, AssetId};

/// Side-effect-free reads against the latest committed pool state
pub trait PoolQuery {
    /// Committed state the queries are answered from
    fn pool_state(&self) -> &PoolState;

    fn token1_balance(&self) -> Amount {
        self.pool_state().balance1()
    }

    fn token2_balance(&self) -> Amount {
        self.pool_state().balance2()
    }

    fn shares_of(&self, provider: &AccountId) -> Amount {
        self.pool_state().shares_of(provider)
    }

    fn total_shares(&self) -> Amount {
        self.pool_state().total_shares()
    }

    fn asset1(&self) -> AssetId {
        self.pool_state().params().asset1
    }

    fn asset2(&self) -> AssetId {
        self.pool_state().params().asset2
    }

    fn fee_rate_bps(&self) -> u32 {
        self.pool_state().params().fee_rate_bps
    }

    /// Asset 1 needed alongside `amount2` of asset 2
    fn calculate_token1_deposit(&self, amount2: Amount) -> Result<Amount> {
        liquidity::calculate_token1_deposit(self.pool_state(), amount2)
    }

    /// Asset 2 needed alongside `amount1` of asset 1
    fn calculate_token2_deposit(&self, amount1: Amount) -> Result<Amount> {
        liquidity::calculate_token2_deposit(self.pool_state(), amount1)
    }

    /// Asset 2 received for giving `amount_in` of asset 1
    fn calculate_token1_swap(&self, amount_in: Amount) -> Result<Amount> {
        swap::calculate_token1_swap(self.pool_state(), amount_in)
    }

    /// Asset 1 received for giving `amount_in` of asset 2
    fn calculate_token2_swap(&self, amount_in: Amount) -> Result<Amount> {
        swap::calculate_token2_swap(self.pool_state(), amount_in)
    }

    fn spot_price(&self) -> Option<Decimal> {
        self.pool_state().spot_price()
    }
}

impl PoolQuery for PoolState {
    fn pool_state(&self) -> &PoolState {
        self
    }
}
