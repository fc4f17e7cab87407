//! Asset custody capability and settlement
//!
//! The engine never moves tokens itself. It describes the movements an
//! operation needs as [`TransferLeg`]s and hands them to an [`AssetCustody`]
//! implementation through [`settle`]. Every leg is checked before any leg
//! runs; a leg that still fails mid-way has the completed legs reversed by
//! custody-side compensation, which needs no counterparty allowance.

use std::collections::{HashMap, HashSet};

use tracing::{error, warn};

use crate::error::CustodyError;
use crate::types::{AccountId, Amount, AssetId};

/// Token-like ledger the pool settles against
pub trait AssetCustody {
    /// Move `amount` of `asset` from `owner` into `pool`, spending the pool's allowance
    fn transfer_from(
        &mut self,
        asset: AssetId,
        owner: AccountId,
        pool: AccountId,
        amount: Amount,
    ) -> Result<(), CustodyError>;

    /// Move `amount` of `asset` held by `pool` to `recipient`
    fn transfer(
        &mut self,
        asset: AssetId,
        pool: AccountId,
        recipient: AccountId,
        amount: Amount,
    ) -> Result<(), CustodyError>;

    /// Whether `transfer_from` with these arguments would succeed right now
    fn check_transfer_from(
        &self,
        asset: AssetId,
        owner: AccountId,
        pool: AccountId,
        amount: Amount,
    ) -> Result<(), CustodyError>;

    /// Whether `transfer` with these arguments would succeed right now
    fn check_transfer(
        &self,
        asset: AssetId,
        pool: AccountId,
        recipient: AccountId,
        amount: Amount,
    ) -> Result<(), CustodyError>;

    /// Undo a completed `transfer_from`, restoring the owner's balance and allowance
    fn refund(
        &mut self,
        asset: AssetId,
        owner: AccountId,
        pool: AccountId,
        amount: Amount,
    ) -> Result<(), CustodyError>;

    /// Undo a completed `transfer`, taking the payout back into `pool`
    ///
    /// Only valid for a transfer made in the same settlement; no allowance
    /// from `recipient` is required.
    fn reclaim(
        &mut self,
        asset: AssetId,
        pool: AccountId,
        recipient: AccountId,
        amount: Amount,
    ) -> Result<(), CustodyError>;

    fn balance_of(&self, asset: AssetId, account: AccountId) -> Amount;
}

/// One asset movement between the pool and a counterparty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferLeg {
    /// Pull from a trader or provider into the pool
    Pull {
        asset: AssetId,
        owner: AccountId,
        amount: Amount,
    },
    /// Pay out from the pool
    Push {
        asset: AssetId,
        recipient: AccountId,
        amount: Amount,
    },
}

impl TransferLeg {
    fn amount(&self) -> Amount {
        match self {
            TransferLeg::Pull { amount, .. } | TransferLeg::Push { amount, .. } => *amount,
        }
    }

    fn check<C: AssetCustody + ?Sized>(&self, custody: &C, pool: AccountId) -> Result<(), CustodyError> {
        match *self {
            TransferLeg::Pull {
                asset,
                owner,
                amount,
            } => custody.check_transfer_from(asset, owner, pool, amount),
            TransferLeg::Push {
                asset,
                recipient,
                amount,
            } => custody.check_transfer(asset, pool, recipient, amount),
        }
    }

    fn execute<C: AssetCustody + ?Sized>(
        &self,
        custody: &mut C,
        pool: AccountId,
    ) -> Result<(), CustodyError> {
        match *self {
            TransferLeg::Pull {
                asset,
                owner,
                amount,
            } => custody.transfer_from(asset, owner, pool, amount),
            TransferLeg::Push {
                asset,
                recipient,
                amount,
            } => custody.transfer(asset, pool, recipient, amount),
        }
    }

    fn compensate<C: AssetCustody + ?Sized>(
        &self,
        custody: &mut C,
        pool: AccountId,
    ) -> Result<(), CustodyError> {
        match *self {
            TransferLeg::Pull {
                asset,
                owner,
                amount,
            } => custody.refund(asset, owner, pool, amount),
            TransferLeg::Push {
                asset,
                recipient,
                amount,
            } => custody.reclaim(asset, pool, recipient, amount),
        }
    }
}

/// Execute `legs` in order with all-or-nothing semantics
///
/// Every non-zero leg is checked up front and nothing moves unless all of
/// them pass. The checks are per leg, so legs must not compete for the same
/// balance. If a leg still fails during execution, completed legs are
/// compensated newest first and the failing leg's error is returned. When a
/// compensation fails as well, the result is [`CustodyError::UnwindFailed`]
/// and custody no longer matches the state before the call.
pub fn settle<C: AssetCustody + ?Sized>(
    custody: &mut C,
    pool: AccountId,
    legs: &[TransferLeg],
) -> Result<(), CustodyError> {
    let legs: Vec<&TransferLeg> = legs.iter().filter(|leg| leg.amount() > 0).collect();
    for leg in &legs {
        leg.check(&*custody, pool)?;
    }

    let mut completed: Vec<&TransferLeg> = Vec::with_capacity(legs.len());
    for leg in legs {
        if let Err(err) = leg.execute(custody, pool) {
            warn!(?leg, %err, "settlement leg failed, unwinding {} completed legs", completed.len());
            let mut unwind_failure = None;
            for done in completed.iter().rev() {
                if let Err(unwind_err) = done.compensate(custody, pool) {
                    error!(leg = ?done, %unwind_err, "failed to unwind settlement leg");
                    unwind_failure.get_or_insert(unwind_err);
                }
            }
            return Err(match unwind_failure {
                Some(unwind) => CustodyError::UnwindFailed {
                    cause: Box::new(err),
                    unwind: Box::new(unwind),
                },
                None => err,
            });
        }
        completed.push(leg);
    }
    Ok(())
}

/// ERC-20-like in-memory ledger for simulation and tests
#[derive(Debug, Default, Clone)]
pub struct InMemoryCustody {
    assets: HashSet<AssetId>,
    balances: HashMap<(AssetId, AccountId), Amount>,
    allowances: HashMap<(AssetId, AccountId, AccountId), Amount>,
    rejected: HashSet<AssetId>,
    /// Successful movements left before one injected failure
    fail_after: Option<usize>,
}

impl InMemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_asset(&mut self, asset: AssetId) {
        self.assets.insert(asset);
    }

    /// Create `amount` of `asset` out of thin air for `account`
    pub fn mint(&mut self, asset: AssetId, account: AccountId, amount: Amount) {
        self.assets.insert(asset);
        *self.balances.entry((asset, account)).or_insert(0) += amount;
    }

    pub fn approve(&mut self, asset: AssetId, owner: AccountId, spender: AccountId, amount: Amount) {
        self.allowances.insert((asset, owner, spender), amount);
    }

    pub fn allowance(&self, asset: AssetId, owner: AccountId, spender: AccountId) -> Amount {
        self.allowances
            .get(&(asset, owner, spender))
            .copied()
            .unwrap_or(0)
    }

    /// Make every subsequent movement of `asset` fail, checks included
    pub fn reject_transfers_of(&mut self, asset: AssetId) {
        self.rejected.insert(asset);
    }

    pub fn accept_transfers_of(&mut self, asset: AssetId) {
        self.rejected.remove(&asset);
    }

    /// Let `count` more transfers through, then fail the next one once
    ///
    /// Checks do not see the pending failure, so this models a transfer that
    /// fails after settlement has started.
    pub fn fail_transfers_after(&mut self, count: usize) {
        self.fail_after = Some(count);
    }

    fn check_asset(&self, asset: AssetId) -> Result<(), CustodyError> {
        if !self.assets.contains(&asset) {
            return Err(CustodyError::UnknownAsset(asset));
        }
        if self.rejected.contains(&asset) {
            return Err(CustodyError::Rejected(format!("transfers of {} are disabled", asset)));
        }
        Ok(())
    }

    fn check_allowance(
        &self,
        asset: AssetId,
        owner: AccountId,
        spender: AccountId,
        amount: Amount,
    ) -> Result<Amount, CustodyError> {
        let allowance = self.allowance(asset, owner, spender);
        if allowance < amount {
            return Err(CustodyError::InsufficientAllowance {
                asset,
                owner,
                spender,
                allowance,
                required: amount,
            });
        }
        Ok(allowance)
    }

    /// Balances of `from` and `to` after the move, without applying it
    fn plan_move(
        &self,
        asset: AssetId,
        from: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<(Amount, Amount), CustodyError> {
        let available = self.balance_of(asset, from);
        if available < amount {
            return Err(CustodyError::InsufficientBalance {
                asset,
                account: from,
                available,
                required: amount,
            });
        }
        let credited = self
            .balance_of(asset, to)
            .checked_add(amount)
            .ok_or_else(|| CustodyError::Rejected(format!("balance overflow for {}", to)))?;
        Ok((available - amount, credited))
    }

    fn move_balance(
        &mut self,
        asset: AssetId,
        from: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<(), CustodyError> {
        let (debited, credited) = self.plan_move(asset, from, to, amount)?;
        self.balances.insert((asset, from), debited);
        self.balances.insert((asset, to), credited);
        Ok(())
    }

    fn consume_injected_failure(&mut self) -> Result<(), CustodyError> {
        match self.fail_after {
            Some(0) => {
                self.fail_after = None;
                Err(CustodyError::Rejected("injected transfer failure".to_string()))
            }
            Some(remaining) => {
                self.fail_after = Some(remaining - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl AssetCustody for InMemoryCustody {
    fn transfer_from(
        &mut self,
        asset: AssetId,
        owner: AccountId,
        pool: AccountId,
        amount: Amount,
    ) -> Result<(), CustodyError> {
        self.check_transfer_from(asset, owner, pool, amount)?;
        self.consume_injected_failure()?;
        let allowance = self.allowance(asset, owner, pool);
        self.move_balance(asset, owner, pool, amount)?;
        self.allowances
            .insert((asset, owner, pool), allowance - amount);
        Ok(())
    }

    fn transfer(
        &mut self,
        asset: AssetId,
        pool: AccountId,
        recipient: AccountId,
        amount: Amount,
    ) -> Result<(), CustodyError> {
        self.check_transfer(asset, pool, recipient, amount)?;
        self.consume_injected_failure()?;
        self.move_balance(asset, pool, recipient, amount)
    }

    fn check_transfer_from(
        &self,
        asset: AssetId,
        owner: AccountId,
        pool: AccountId,
        amount: Amount,
    ) -> Result<(), CustodyError> {
        self.check_asset(asset)?;
        self.check_allowance(asset, owner, pool, amount)?;
        self.plan_move(asset, owner, pool, amount).map(|_| ())
    }

    fn check_transfer(
        &self,
        asset: AssetId,
        pool: AccountId,
        recipient: AccountId,
        amount: Amount,
    ) -> Result<(), CustodyError> {
        self.check_asset(asset)?;
        self.plan_move(asset, pool, recipient, amount).map(|_| ())
    }

    fn refund(
        &mut self,
        asset: AssetId,
        owner: AccountId,
        pool: AccountId,
        amount: Amount,
    ) -> Result<(), CustodyError> {
        self.move_balance(asset, pool, owner, amount)?;
        let allowance = self.allowance(asset, owner, pool).saturating_add(amount);
        self.allowances.insert((asset, owner, pool), allowance);
        Ok(())
    }

    fn reclaim(
        &mut self,
        asset: AssetId,
        pool: AccountId,
        recipient: AccountId,
        amount: Amount,
    ) -> Result<(), CustodyError> {
        self.move_balance(asset, recipient, pool, amount)
    }

    fn balance_of(&self, asset: AssetId, account: AccountId) -> Amount {
        self.balances.get(&(asset, account)).copied().unwrap_or(0)
    }
}
