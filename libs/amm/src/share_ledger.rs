//! Share Ledger
//!
//! Tracks each provider's ownership share and the total outstanding supply.
//! `total` and the per-provider map are only ever mutated together, so the
//! total always equals the sum of individual balances.

use std::collections::HashMap;

use crate::error::{PoolError, Result};
use crate::types::{AccountId, Amount};

#[derive(Debug, Clone, Default)]
pub struct ShareLedger {
    balances: HashMap<AccountId, Amount>,
    total: Amount,
}

impl ShareLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` shares to `provider`
    pub fn mint(&mut self, provider: AccountId, amount: Amount) -> Result<()> {
        let total = self
            .total
            .checked_add(amount)
            .ok_or(PoolError::ArithmeticOverflow)?;
        // balance <= total, so this cannot overflow once the total fits
        *self.balances.entry(provider).or_insert(0) += amount;
        self.total = total;
        Ok(())
    }

    /// Debit `amount` shares from `provider`; zeroed entries are removed
    pub fn burn(&mut self, provider: AccountId, amount: Amount) -> Result<()> {
        let available = self.balance_of(&provider);
        if amount > available {
            return Err(PoolError::InsufficientShares {
                available,
                requested: amount,
            });
        }
        let remaining = available - amount;
        if remaining == 0 {
            self.balances.remove(&provider);
        } else {
            self.balances.insert(provider, remaining);
        }
        self.total -= amount;
        Ok(())
    }

    pub fn balance_of(&self, provider: &AccountId) -> Amount {
        self.balances.get(provider).copied().unwrap_or(0)
    }

    pub fn total(&self) -> Amount {
        self.total
    }

    /// Number of providers with a non-zero balance
    pub fn holders(&self) -> usize {
        self.balances.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, &Amount)> {
        self.balances.iter()
    }

    /// Recompute the sum of balances; used by invariant checks
    pub fn sum_of_balances(&self) -> Option<Amount> {
        self.balances
            .values()
            .try_fold(0u128, |acc, v| acc.checked_add(*v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_and_burn_keep_total_in_sync() {
        let alice = AccountId::from_low_byte(1);
        let bob = AccountId::from_low_byte(2);
        let mut ledger = ShareLedger::new();

        ledger.mint(alice, 100).unwrap();
        ledger.mint(bob, 50).unwrap();
        assert_eq!(ledger.total(), 150);
        assert_eq!(ledger.sum_of_balances(), Some(150));

        ledger.burn(bob, 50).unwrap();
        assert_eq!(ledger.balance_of(&bob), 0);
        assert_eq!(ledger.holders(), 1);
        assert_eq!(ledger.total(), 100);
    }

    #[test]
    fn test_burn_more_than_held_fails_without_change() {
        let alice = AccountId::from_low_byte(1);
        let mut ledger = ShareLedger::new();
        ledger.mint(alice, 10).unwrap();

        let err = ledger.burn(alice, 11).unwrap_err();
        assert_eq!(
            err,
            PoolError::InsufficientShares {
                available: 10,
                requested: 11
            }
        );
        assert_eq!(ledger.balance_of(&alice), 10);
        assert_eq!(ledger.total(), 10);
    }

    #[test]
    fn test_mint_overflow_is_rejected() {
        let alice = AccountId::from_low_byte(1);
        let mut ledger = ShareLedger::new();
        ledger.mint(alice, Amount::MAX).unwrap();
        assert_eq!(ledger.mint(alice, 1), Err(PoolError::ArithmeticOverflow));
        assert_eq!(ledger.total(), Amount::MAX);
    }
}
