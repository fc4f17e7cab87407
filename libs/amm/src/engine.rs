//! Pool Engine
//!
//! Orchestrates the Share Ledger, Liquidity Manager and Swap Engine over one
//! owned [`PoolState`]. Each operation runs the same sequence:
//!
//! 1. validate inputs and plan every new balance and share amount (pure)
//! 2. apply the plan to the state
//! 3. settle the asset movements with the custody collaborator
//! 4. on settlement failure restore the exact previous state, otherwise
//!    bump the sequence and emit one event
//!
//! If custody cannot undo a half-finished settlement the engine halts: the
//! state is still restored, but every later mutation fails with
//! [`PoolError::Halted`] until the host reconciles custody out of band.
//!
//! No observer can see a partially committed operation: the engine is driven
//! through `&mut self`, so nothing else can read the state between steps.

use tracing::{debug, error, info};

use crate::custody::{settle, AssetCustody, TransferLeg};
use crate::error::{CustodyError, PoolError, Result};
use crate::events::{EventSink, LiquidityEvent, PoolEvent, SwapEvent};
use crate::liquidity::{self, DepositPlan, WithdrawalPlan};
use crate::pool_state::PoolState;
use crate::pool_traits::PoolQuery;
use crate::swap::{self, SwapDirection, SwapPlan};
use crate::types::{AccountId, Amount, PoolParams, TxContext};

pub struct PoolEngine<C, S> {
    state: PoolState,
    custody: C,
    sink: S,
    /// Account under which the custody ledger holds the pool's reserves
    pool_account: AccountId,
    /// Number of committed operations
    sequence: u64,
    /// Set once custody and state have diverged
    halted: Option<String>,
}

impl<C: AssetCustody, S: EventSink> PoolEngine<C, S> {
    pub fn new(params: PoolParams, pool_account: AccountId, custody: C, sink: S) -> Result<Self> {
        let state = PoolState::new(params)?;
        info!(
            asset1 = %params.asset1,
            asset2 = %params.asset2,
            fee_rate_bps = params.fee_rate_bps,
            pool = %pool_account,
            "pool created"
        );
        Ok(Self {
            state,
            custody,
            sink,
            pool_account,
            sequence: 0,
            halted: None,
        })
    }

    pub fn state(&self) -> &PoolState {
        &self.state
    }

    pub fn pool_account(&self) -> AccountId {
        self.pool_account
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Why mutations are refused, if an unwind ever failed
    pub fn halted(&self) -> Option<&str> {
        self.halted.as_deref()
    }

    pub fn custody(&self) -> &C {
        &self.custody
    }

    /// Direct custody access for hosts that fund or approve accounts
    pub fn custody_mut(&mut self) -> &mut C {
        &mut self.custody
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Deposit both assets and receive shares
    ///
    /// The first deposit sets the price and issues `INITIAL_SHARES`. Later
    /// deposits must supply `amount2 = calculate_token2_deposit(amount1)` (or
    /// one unit more) and receive `amount1 * total_shares / balance1` shares.
    pub fn add_liquidity(&mut self, ctx: &TxContext, amount1: Amount, amount2: Amount) -> Result<Amount> {
        self.ensure_running()?;
        let plan = liquidity::plan_add_liquidity(&self.state, ctx.caller, amount1, amount2)?;
        liquidity::apply_deposit(&mut self.state, &plan)?;

        let params = *self.state.params();
        let legs = [
            TransferLeg::Pull {
                asset: params.asset1,
                owner: ctx.caller,
                amount: amount1,
            },
            TransferLeg::Pull {
                asset: params.asset2,
                owner: ctx.caller,
                amount: amount2,
            },
        ];
        if let Err(err) = settle(&mut self.custody, self.pool_account, &legs) {
            liquidity::revert_deposit(&mut self.state, &plan)?;
            debug!(provider = %ctx.caller, %err, "deposit rolled back");
            return Err(self.settlement_failed(err));
        }

        let event = self.deposit_event(&plan, ctx.timestamp);
        self.commit(PoolEvent::LiquidityAdded(event));
        Ok(plan.shares_issued)
    }

    /// Burn `shares` and pay out the proportional slice of both reserves
    pub fn remove_liquidity(&mut self, ctx: &TxContext, shares: Amount) -> Result<(Amount, Amount)> {
        self.ensure_running()?;
        let plan = liquidity::plan_remove_liquidity(&self.state, ctx.caller, shares)?;
        liquidity::apply_withdrawal(&mut self.state, &plan)?;

        let params = *self.state.params();
        let legs = [
            TransferLeg::Push {
                asset: params.asset1,
                recipient: ctx.caller,
                amount: plan.amount1,
            },
            TransferLeg::Push {
                asset: params.asset2,
                recipient: ctx.caller,
                amount: plan.amount2,
            },
        ];
        if let Err(err) = settle(&mut self.custody, self.pool_account, &legs) {
            liquidity::revert_withdrawal(&mut self.state, &plan)?;
            debug!(provider = %ctx.caller, %err, "withdrawal rolled back");
            return Err(self.settlement_failed(err));
        }

        let event = self.withdrawal_event(&plan, ctx.timestamp);
        self.commit(PoolEvent::LiquidityRemoved(event));
        Ok((plan.amount1, plan.amount2))
    }

    /// Give `amount_in` of asset 1, receive asset 2
    pub fn swap_token1(&mut self, ctx: &TxContext, amount_in: Amount) -> Result<Amount> {
        self.swap(ctx, SwapDirection::Token1In, amount_in)
    }

    /// Give `amount_in` of asset 2, receive asset 1
    pub fn swap_token2(&mut self, ctx: &TxContext, amount_in: Amount) -> Result<Amount> {
        self.swap(ctx, SwapDirection::Token2In, amount_in)
    }

    pub fn swap(&mut self, ctx: &TxContext, direction: SwapDirection, amount_in: Amount) -> Result<Amount> {
        self.ensure_running()?;
        let plan = swap::plan_swap(&self.state, ctx.caller, direction, amount_in)?;
        swap::apply_swap(&mut self.state, &plan);

        let legs = [
            TransferLeg::Pull {
                asset: plan.asset_in,
                owner: ctx.caller,
                amount: plan.amount_in,
            },
            TransferLeg::Push {
                asset: plan.asset_out,
                recipient: ctx.caller,
                amount: plan.amount_out,
            },
        ];
        if let Err(err) = settle(&mut self.custody, self.pool_account, &legs) {
            swap::revert_swap(&mut self.state, &plan);
            debug!(trader = %ctx.caller, %err, "swap rolled back");
            return Err(self.settlement_failed(err));
        }

        let event = self.swap_event(&plan, ctx.timestamp);
        self.commit(PoolEvent::Swap(event));
        Ok(plan.amount_out)
    }

    fn ensure_running(&self) -> Result<()> {
        match &self.halted {
            Some(reason) => Err(PoolError::Halted(reason.clone())),
            None => Ok(()),
        }
    }

    fn settlement_failed(&mut self, err: CustodyError) -> PoolError {
        if matches!(err, CustodyError::UnwindFailed { .. }) {
            error!(%err, pool = %self.pool_account, "custody diverged from pool state, halting");
            self.halted = Some(err.to_string());
        }
        err.into()
    }

    fn commit(&mut self, event: PoolEvent) {
        debug_assert!(self.state.check_invariants().is_ok());
        self.sequence += 1;
        info!(sequence = self.sequence, "operation committed");
        self.sink.emit(event);
    }

    fn deposit_event(&self, plan: &DepositPlan, timestamp: u64) -> LiquidityEvent {
        LiquidityEvent {
            provider: plan.provider,
            amount1: plan.amount1,
            amount2: plan.amount2,
            shares: plan.shares_issued,
            new_balance1: self.state.balance1(),
            new_balance2: self.state.balance2(),
            new_total_shares: self.state.total_shares(),
            timestamp,
        }
    }

    fn withdrawal_event(&self, plan: &WithdrawalPlan, timestamp: u64) -> LiquidityEvent {
        LiquidityEvent {
            provider: plan.provider,
            amount1: plan.amount1,
            amount2: plan.amount2,
            shares: plan.shares_burned,
            new_balance1: self.state.balance1(),
            new_balance2: self.state.balance2(),
            new_total_shares: self.state.total_shares(),
            timestamp,
        }
    }

    fn swap_event(&self, plan: &SwapPlan, timestamp: u64) -> SwapEvent {
        SwapEvent {
            trader: plan.trader,
            asset_given: plan.asset_in,
            amount_given: plan.amount_in,
            asset_received: plan.asset_out,
            amount_received: plan.amount_out,
            new_balance1: self.state.balance1(),
            new_balance2: self.state.balance2(),
            timestamp,
        }
    }
}

impl<C, S> PoolQuery for PoolEngine<C, S> {
    fn pool_state(&self) -> &PoolState {
        &self.state
    }
}
