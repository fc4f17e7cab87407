//! Event records for committed pool operations
//!
//! Exactly one event is emitted per committed operation; failed operations
//! emit nothing.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::{AccountId, Amount, AssetId};

/// Committed swap, fields in the order downstream consumers index them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapEvent {
    pub trader: AccountId,
    pub asset_given: AssetId,
    pub amount_given: Amount,
    pub asset_received: AssetId,
    pub amount_received: Amount,
    pub new_balance1: Amount,
    pub new_balance2: Amount,
    pub timestamp: u64,
}

/// Committed deposit or withdrawal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityEvent {
    pub provider: AccountId,
    pub amount1: Amount,
    pub amount2: Amount,
    /// Shares issued on deposit, burned on withdrawal
    pub shares: Amount,
    pub new_balance1: Amount,
    pub new_balance2: Amount,
    pub new_total_shares: Amount,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolEvent {
    Swap(SwapEvent),
    LiquidityAdded(LiquidityEvent),
    LiquidityRemoved(LiquidityEvent),
}

impl PoolEvent {
    pub fn timestamp(&self) -> u64 {
        match self {
            PoolEvent::Swap(e) => e.timestamp,
            PoolEvent::LiquidityAdded(e) | PoolEvent::LiquidityRemoved(e) => e.timestamp,
        }
    }

    pub fn as_swap(&self) -> Option<&SwapEvent> {
        match self {
            PoolEvent::Swap(e) => Some(e),
            _ => None,
        }
    }
}

/// Consumer of committed pool events
pub trait EventSink {
    fn emit(&mut self, event: PoolEvent);
}

impl EventSink for Vec<PoolEvent> {
    fn emit(&mut self, event: PoolEvent) {
        self.push(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: PoolEvent) {
        (**self).emit(event);
    }
}

/// Sink that only records events in the structured log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, event: PoolEvent) {
        match &event {
            PoolEvent::Swap(e) => info!(
                trader = %e.trader,
                asset_given = %e.asset_given,
                amount_given = %e.amount_given,
                asset_received = %e.asset_received,
                amount_received = %e.amount_received,
                balance1 = %e.new_balance1,
                balance2 = %e.new_balance2,
                timestamp = e.timestamp,
                "swap"
            ),
            PoolEvent::LiquidityAdded(e) => info!(
                provider = %e.provider,
                amount1 = %e.amount1,
                amount2 = %e.amount2,
                shares = %e.shares,
                total_shares = %e.new_total_shares,
                "liquidity added"
            ),
            PoolEvent::LiquidityRemoved(e) => info!(
                provider = %e.provider,
                amount1 = %e.amount1,
                amount2 = %e.amount2,
                shares = %e.shares,
                total_shares = %e.new_total_shares,
                "liquidity removed"
            ),
        }
    }
}
