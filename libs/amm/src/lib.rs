//! # Torq Pool Engine - Two-Asset Constant-Product AMM
//!
//! ## Purpose
//!
//! Pricing and accounting core for a two-asset liquidity pool: providers deposit
//! a pair of assets and receive proportional shares, traders swap along the
//! `x * y = k` curve, and providers redeem shares for a proportional slice of
//! the reserves. All math is integer-only with 256-bit intermediates and an
//! explicit rounding direction that always favors the pool.
//!
//! ## Components
//!
//! - **Share Ledger** ([`share_ledger`]): per-provider shares and total supply
//! - **Liquidity Manager** ([`liquidity`]): deposit and withdrawal effects
//! - **Swap Engine** ([`swap`], [`swap_math`]): trade effects under the invariant
//! - **Pool Engine** ([`engine`]): validate, apply, settle with custody, emit
//!
//! ## Integration Points
//!
//! - **Asset movements**: delegated to an [`AssetCustody`] implementation
//! - **Events**: one [`PoolEvent`] per committed operation, sent to an [`EventSink`]
//! - **Queries**: the [`PoolQuery`] trait, answered from committed state only
//!
//! ```rust
//! use amm::{tokens, AccountId, AssetId, InMemoryCustody, PoolEngine, PoolParams, PoolQuery, TxContext};
//!
//! let (sob, usd) = (AssetId::from_low_byte(1), AssetId::from_low_byte(2));
//! let pool_account = AccountId::from_low_byte(0xee);
//! let provider = AccountId::from_low_byte(7);
//!
//! let mut custody = InMemoryCustody::new();
//! for asset in [sob, usd] {
//!     custody.mint(asset, provider, tokens(1_000));
//!     custody.approve(asset, provider, pool_account, tokens(1_000));
//! }
//!
//! let mut pool = PoolEngine::new(PoolParams::new(sob, usd, 0), pool_account, custody, Vec::new()).unwrap();
//! let shares = pool.add_liquidity(&TxContext::new(provider, 1), tokens(100), tokens(100)).unwrap();
//! assert_eq!(shares, tokens(100));
//! assert_eq!(pool.token1_balance(), tokens(100));
//! ```

pub mod custody;
pub mod engine;
pub mod error;
pub mod events;
pub mod liquidity;
pub mod pool_state;
pub mod pool_traits;
pub mod precision;
pub mod share_ledger;
pub mod swap;
pub mod swap_math;
pub mod types;

pub use custody::{settle, AssetCustody, InMemoryCustody, TransferLeg};
pub use engine::PoolEngine;
pub use error::{CustodyError, PoolError, Result};
pub use events::{EventSink, LiquidityEvent, PoolEvent, SwapEvent, TracingSink};
pub use pool_state::{PoolState, Reserves, Side};
pub use pool_traits::PoolQuery;
pub use precision::{tokens, BPS_DENOMINATOR, INITIAL_SHARES, PRECISION};
pub use share_ledger::ShareLedger;
pub use swap::SwapDirection;
pub use swap_math::{calculate_swap_in, calculate_swap_out, price_impact, slippage};
pub use types::{AccountId, Amount, AssetId, ParseIdError, PoolParams, TxContext};

/// Common types for AMM calculations
pub use primitive_types::U256;
pub use rust_decimal::Decimal;
