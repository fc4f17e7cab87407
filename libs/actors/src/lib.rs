//! Pool Actor
//!
//! Runs a [`PoolEngine`](amm::PoolEngine) on its own tokio task so every
//! mutating operation is processed one at a time, in mailbox order. Callers
//! hold a cloneable [`PoolHandle`] that sends commands and awaits the
//! committed result.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  PoolCommand   ┌──────────────────┐
//! │ PoolHandle   │───────────────▶│ PoolActor        │
//! │ (any task)   │◀── oneshot ────│ (single writer)  │
//! └──────┬───────┘                └───┬──────────┬───┘
//!        │ snapshot()                 │ publish  │ emit
//!        ▼                            ▼          ▼
//! ┌──────────────┐              ┌──────────┐ ┌───────────┐
//! │ PoolSnapshot │◀─────────────│ Shared   │ │ broadcast │
//! └──────────────┘              └──────────┘ └───────────┘
//! ```
//!
//! Queries never enter the mailbox; they read the last committed snapshot,
//! so a quote taken between two commands always reflects a whole operation.
//!
//! # Examples
//!
//! ```rust
//! use amm::{tokens, AccountId, AssetId, InMemoryCustody, PoolEngine, PoolParams, TxContext};
//! use pool_actor::{spawn_pool_actor, BroadcastSink};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (sob, usd) = (AssetId::from_low_byte(1), AssetId::from_low_byte(2));
//! let pool_account = AccountId::from_low_byte(0xee);
//! let provider = AccountId::from_low_byte(7);
//!
//! let mut custody = InMemoryCustody::new();
//! for asset in [sob, usd] {
//!     custody.mint(asset, provider, tokens(10));
//!     custody.approve(asset, provider, pool_account, tokens(10));
//! }
//! let engine = PoolEngine::new(PoolParams::new(sob, usd, 30), pool_account, custody, BroadcastSink::new(16)).unwrap();
//!
//! let (handle, task) = spawn_pool_actor(engine, 64);
//! let shares = handle.add_liquidity(TxContext::new(provider, 1), tokens(5), tokens(5)).await.unwrap();
//! assert_eq!(handle.shares_of(&provider), shares);
//!
//! handle.shutdown().await.unwrap();
//! let engine = task.await.unwrap();
//! assert_eq!(engine.sequence(), 1);
//! # }
//! ```

pub mod messages;
pub mod system;

pub use messages::{CommandKind, PoolCommand, Reply};
pub use system::{
    spawn_pool_actor, ActorError, ActorStats, BroadcastSink, PoolActor, PoolHandle, PoolSnapshot,
};
