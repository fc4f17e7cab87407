//! Pool State
//!
//! Single owned value holding reserves, the share ledger and the immutable
//! construction parameters. Mutated only through the engine's four
//! state-changing operations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{PoolError, Result};
use crate::precision::{mul_div_floor, to_decimal, wide_product, PRECISION, PRECISION_DECIMALS};
use crate::share_ledger::ShareLedger;
use crate::types::{AccountId, Amount, AssetId, PoolParams};

#[derive(Debug, Clone)]
pub struct PoolState {
    pub(crate) balance1: Amount,
    pub(crate) balance2: Amount,
    pub(crate) ledger: ShareLedger,
    params: PoolParams,
}

/// Reserves and supply at a point in time, without the per-provider map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserves {
    pub balance1: Amount,
    pub balance2: Amount,
    pub total_shares: Amount,
}

impl Reserves {
    pub fn balance(&self, side: Side) -> Amount {
        match side {
            Side::One => self.balance1,
            Side::Two => self.balance2,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_shares == 0
    }

    /// Asset 2 per asset 1, `None` while the pool is empty
    pub fn spot_price(&self) -> Option<Decimal> {
        if self.balance1 == 0 {
            return None;
        }
        let scaled = mul_div_floor(self.balance2, PRECISION, self.balance1).ok()?;
        to_decimal(scaled, PRECISION_DECIMALS)
    }
}

impl PoolState {
    /// Create an empty pool; parameters are fixed from here on
    pub fn new(params: PoolParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            balance1: 0,
            balance2: 0,
            ledger: ShareLedger::new(),
            params,
        })
    }

    pub fn params(&self) -> &PoolParams {
        &self.params
    }

    pub fn balance1(&self) -> Amount {
        self.balance1
    }

    pub fn balance2(&self) -> Amount {
        self.balance2
    }

    pub fn total_shares(&self) -> Amount {
        self.ledger.total()
    }

    pub fn shares_of(&self, provider: &AccountId) -> Amount {
        self.ledger.balance_of(provider)
    }

    pub fn ledger(&self) -> &ShareLedger {
        &self.ledger
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.total() == 0
    }

    pub fn reserves(&self) -> Reserves {
        Reserves {
            balance1: self.balance1,
            balance2: self.balance2,
            total_shares: self.ledger.total(),
        }
    }

    /// Asset id on the given side
    pub fn asset(&self, side: Side) -> AssetId {
        match side {
            Side::One => self.params.asset1,
            Side::Two => self.params.asset2,
        }
    }

    pub fn balance(&self, side: Side) -> Amount {
        match side {
            Side::One => self.balance1,
            Side::Two => self.balance2,
        }
    }

    pub(crate) fn set_balance(&mut self, side: Side, value: Amount) {
        match side {
            Side::One => self.balance1 = value,
            Side::Two => self.balance2 = value,
        }
    }

    /// Asset 2 per asset 1 at the current reserves
    pub fn spot_price(&self) -> Option<Decimal> {
        self.reserves().spot_price()
    }

    /// Verify the bookkeeping invariants that must hold between operations
    pub fn check_invariants(&self) -> Result<()> {
        let total = self.ledger.total();
        match self.ledger.sum_of_balances() {
            Some(sum) if sum == total => {}
            _ => {
                return Err(PoolError::InvariantViolation(format!(
                    "share total {} diverges from ledger sum",
                    total
                )))
            }
        }

        let empty_reserves = self.balance1 == 0 && self.balance2 == 0;
        if empty_reserves != (total == 0) {
            return Err(PoolError::InvariantViolation(format!(
                "reserves ({}, {}) inconsistent with {} outstanding shares",
                self.balance1, self.balance2, total
            )));
        }
        Ok(())
    }

    /// Pricing invariant `k = balance1 * balance2`
    pub fn k(&self) -> primitive_types::U256 {
        wide_product(self.balance1, self.balance2)
    }
}

/// One of the two sides of the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    One,
    Two,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::One => Side::Two,
            Side::Two => Side::One,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> PoolParams {
        PoolParams::new(AssetId::from_low_byte(1), AssetId::from_low_byte(2), 0)
    }

    #[test]
    fn test_new_pool_is_empty_and_consistent() {
        let state = PoolState::new(params()).unwrap();
        assert!(state.is_empty());
        assert_eq!(state.spot_price(), None);
        state.check_invariants().unwrap();
    }

    #[test]
    fn test_invariant_check_detects_orphan_reserves() {
        let mut state = PoolState::new(params()).unwrap();
        state.balance1 = 10;
        assert!(state.check_invariants().is_err());
    }

    #[test]
    fn test_spot_price() {
        let mut state = PoolState::new(params()).unwrap();
        state.balance1 = 1_000;
        state.balance2 = 2_000;
        assert_eq!(state.spot_price(), Some(Decimal::from(2)));
    }
}
