//! Error taxonomy for pool operations
//!
//! Every engine operation is all-or-nothing: when one of these is returned the
//! pool state is exactly what it was before the call and no event was emitted.
//! The one exception is [`CustodyError::UnwindFailed`], after which custody
//! may no longer match the pool and the engine refuses further mutations.

use thiserror::Error;

use crate::types::{AccountId, Amount, AssetId};

/// Errors raised by the asset custody collaborator
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CustodyError {
    #[error("account {account} holds {available} of {asset}, needs {required}")]
    InsufficientBalance {
        asset: AssetId,
        account: AccountId,
        available: Amount,
        required: Amount,
    },

    #[error("allowance of {spender} over {owner}'s {asset} is {allowance}, needs {required}")]
    InsufficientAllowance {
        asset: AssetId,
        owner: AccountId,
        spender: AccountId,
        allowance: Amount,
        required: Amount,
    },

    #[error("unknown asset {0}")]
    UnknownAsset(AssetId),

    #[error("transfer rejected: {0}")]
    Rejected(String),

    /// A settlement leg failed and reversing the completed legs failed too
    #[error("settlement failed ({cause}) and could not be unwound ({unwind})")]
    UnwindFailed {
        cause: Box<CustodyError>,
        unwind: Box<CustodyError>,
    },
}

/// Errors returned by pool engine operations and queries
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// A required amount is zero, or a computed amount rounds to zero
    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("pool has no liquidity")]
    EmptyPool,

    #[error("zero liquidity on one side of the swap")]
    ZeroLiquidity,

    #[error("deposit of {supplied} is outside the required {required} (+1) for the current ratio")]
    InvalidDepositRatio { required: Amount, supplied: Amount },

    #[error("insufficient shares: holding {available}, requested {requested}")]
    InsufficientShares { available: Amount, requested: Amount },

    #[error("insufficient liquidity: swap needs {requested} of a {available} balance")]
    InsufficientLiquidity { available: Amount, requested: Amount },

    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    #[error("custody failure: {0}")]
    CustodyFailure(#[from] CustodyError),

    #[error("invalid pool parameters: {0}")]
    InvalidParams(String),

    #[error("pool invariant violated: {0}")]
    InvariantViolation(String),

    /// An earlier settlement left custody out of step with the pool
    #[error("pool halted: {0}")]
    Halted(String),
}

pub type Result<T> = std::result::Result<T, PoolError>;
