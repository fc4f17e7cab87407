//! Pool actor runtime
//!
//! One task owns the engine and drains the mailbox serially. After every
//! committed command the actor republishes a [`PoolSnapshot`] and the
//! caller's share balance, so handles can answer queries without touching
//! the mailbox.
//!
//! # Publication order
//!
//! The caller's share entry is written before the snapshot is swapped. A
//! reader that sees sequence `n` in the snapshot therefore sees share
//! balances at least as new as operation `n`.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use amm::liquidity::proportional_deposit;
use amm::swap::quote_on_reserves;
use amm::{
    AccountId, Amount, AssetCustody, AssetId, Decimal, EventSink, PoolEngine, PoolError,
    PoolEvent, PoolParams, PoolQuery, Reserves, Side, SwapDirection, TxContext,
};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::messages::{PoolCommand, Reply};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActorError {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("pool actor mailbox is closed")]
    MailboxClosed,

    #[error("pool actor dropped the reply")]
    ReplyDropped,
}

/// Event sink that fans committed events out to every subscriber
///
/// Sending with no live subscriber is not an error; the event is dropped.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<PoolEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PoolEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for BroadcastSink {
    fn emit(&mut self, event: PoolEvent) {
        if self.sender.send(event).is_err() {
            trace!("no event subscribers");
        }
    }
}

/// Committed pool state as of `sequence`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolSnapshot {
    pub params: PoolParams,
    pub reserves: Reserves,
    pub sequence: u64,
}

impl PoolSnapshot {
    fn capture<C: AssetCustody>(engine: &PoolEngine<C, BroadcastSink>) -> Self {
        Self {
            params: *engine.state().params(),
            reserves: engine.state().reserves(),
            sequence: engine.sequence(),
        }
    }

    pub fn token1_balance(&self) -> Amount {
        self.reserves.balance1
    }

    pub fn token2_balance(&self) -> Amount {
        self.reserves.balance2
    }

    pub fn total_shares(&self) -> Amount {
        self.reserves.total_shares
    }

    pub fn asset1(&self) -> AssetId {
        self.params.asset1
    }

    pub fn asset2(&self) -> AssetId {
        self.params.asset2
    }

    pub fn fee_rate_bps(&self) -> u32 {
        self.params.fee_rate_bps
    }

    pub fn spot_price(&self) -> Option<Decimal> {
        self.reserves.spot_price()
    }

    pub fn calculate_token1_deposit(&self, amount2: Amount) -> amm::Result<Amount> {
        proportional_deposit(&self.reserves, Side::Two, amount2)
    }

    pub fn calculate_token2_deposit(&self, amount1: Amount) -> amm::Result<Amount> {
        proportional_deposit(&self.reserves, Side::One, amount1)
    }

    pub fn calculate_token1_swap(&self, amount_in: Amount) -> amm::Result<Amount> {
        quote_on_reserves(
            &self.reserves,
            self.params.fee_rate_bps,
            SwapDirection::Token1In,
            amount_in,
        )
    }

    pub fn calculate_token2_swap(&self, amount_in: Amount) -> amm::Result<Amount> {
        quote_on_reserves(
            &self.reserves,
            self.params.fee_rate_bps,
            SwapDirection::Token2In,
            amount_in,
        )
    }
}

/// Command counters
#[derive(Debug, Default)]
pub struct ActorStats {
    processed: AtomicU64,
    failed: AtomicU64,
    total_processing_time_ns: AtomicU64,
}

impl ActorStats {
    fn record(&self, committed: bool, duration: Duration) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        if !committed {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.total_processing_time_ns.fetch_add(
            u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX),
            Ordering::Relaxed,
        );
    }

    /// Commands handled, committed or not
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Commands the engine rejected
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn avg_processing_time_ns(&self) -> u64 {
        let count = self.processed();
        if count == 0 {
            return 0;
        }
        self.total_processing_time_ns.load(Ordering::Relaxed) / count
    }
}

/// State shared between the actor and its handles
#[derive(Debug)]
struct Shared {
    snapshot: RwLock<Arc<PoolSnapshot>>,
    shares: DashMap<AccountId, Amount>,
    stats: ActorStats,
}

/// Owner of the engine; runs on its own task
pub struct PoolActor<C: AssetCustody> {
    engine: PoolEngine<C, BroadcastSink>,
    mailbox: mpsc::Receiver<PoolCommand>,
    shared: Arc<Shared>,
}

impl<C: AssetCustody> PoolActor<C> {
    /// Drain the mailbox until shutdown, then hand the engine back
    pub async fn run(mut self) -> PoolEngine<C, BroadcastSink> {
        info!(sequence = self.engine.sequence(), "pool actor started");
        while let Some(command) = self.mailbox.recv().await {
            if self.process(command).is_break() {
                break;
            }
        }
        info!(
            sequence = self.engine.sequence(),
            processed = self.shared.stats.processed(),
            failed = self.shared.stats.failed(),
            "pool actor stopped"
        );
        self.engine
    }

    fn process(&mut self, command: PoolCommand) -> ControlFlow<()> {
        let kind = command.kind();
        let caller = command.caller();
        let started = Instant::now();

        let outcome = match command {
            PoolCommand::AddLiquidity {
                ctx,
                amount1,
                amount2,
                reply,
            } => respond(reply, self.engine.add_liquidity(&ctx, amount1, amount2)),
            PoolCommand::RemoveLiquidity { ctx, shares, reply } => {
                respond(reply, self.engine.remove_liquidity(&ctx, shares))
            }
            PoolCommand::Swap {
                ctx,
                direction,
                amount_in,
                reply,
            } => respond(reply, self.engine.swap(&ctx, direction, amount_in)),
            PoolCommand::Shutdown { reply } => {
                if reply.send(()).is_err() {
                    debug!("shutdown requester went away");
                }
                return ControlFlow::Break(());
            }
        };

        match &outcome {
            Ok(()) => self.publish(caller),
            Err(error) => warn!(?kind, caller = ?caller, %error, "pool command rejected"),
        }
        self.shared.stats.record(outcome.is_ok(), started.elapsed());
        ControlFlow::Continue(())
    }

    fn publish(&self, caller: Option<AccountId>) {
        if let Some(account) = caller {
            match self.engine.shares_of(&account) {
                0 => {
                    self.shared.shares.remove(&account);
                }
                shares => {
                    self.shared.shares.insert(account, shares);
                }
            }
        }
        let snapshot = Arc::new(PoolSnapshot::capture(&self.engine));
        *self.shared.snapshot.write() = snapshot;
    }
}

fn respond<T>(reply: Reply<T>, result: Result<T, PoolError>) -> Result<(), PoolError> {
    let outcome = result.as_ref().map(|_| ()).map_err(Clone::clone);
    if reply.send(result).is_err() {
        debug!("caller dropped the reply channel");
    }
    outcome
}

/// Cloneable client of a running pool actor
#[derive(Debug, Clone)]
pub struct PoolHandle {
    mailbox: mpsc::Sender<PoolCommand>,
    shared: Arc<Shared>,
    events: BroadcastSink,
}

impl PoolHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> PoolCommand,
    ) -> Result<T, ActorError> {
        let (reply, response) = oneshot::channel();
        self.mailbox
            .send(build(reply))
            .await
            .map_err(|_| ActorError::MailboxClosed)?;
        let result = response.await.map_err(|_| ActorError::ReplyDropped)?;
        Ok(result?)
    }

    pub async fn add_liquidity(
        &self,
        ctx: TxContext,
        amount1: Amount,
        amount2: Amount,
    ) -> Result<Amount, ActorError> {
        self.request(|reply| PoolCommand::AddLiquidity {
            ctx,
            amount1,
            amount2,
            reply,
        })
        .await
    }

    pub async fn remove_liquidity(
        &self,
        ctx: TxContext,
        shares: Amount,
    ) -> Result<(Amount, Amount), ActorError> {
        self.request(|reply| PoolCommand::RemoveLiquidity { ctx, shares, reply })
            .await
    }

    pub async fn swap(
        &self,
        ctx: TxContext,
        direction: SwapDirection,
        amount_in: Amount,
    ) -> Result<Amount, ActorError> {
        self.request(|reply| PoolCommand::Swap {
            ctx,
            direction,
            amount_in,
            reply,
        })
        .await
    }

    pub async fn swap_token1(&self, ctx: TxContext, amount_in: Amount) -> Result<Amount, ActorError> {
        self.swap(ctx, SwapDirection::Token1In, amount_in).await
    }

    pub async fn swap_token2(&self, ctx: TxContext, amount_in: Amount) -> Result<Amount, ActorError> {
        self.swap(ctx, SwapDirection::Token2In, amount_in).await
    }

    /// Ask the actor to stop once the commands already queued are done
    pub async fn shutdown(&self) -> Result<(), ActorError> {
        let (reply, done) = oneshot::channel();
        self.mailbox
            .send(PoolCommand::Shutdown { reply })
            .await
            .map_err(|_| ActorError::MailboxClosed)?;
        done.await.map_err(|_| ActorError::ReplyDropped)
    }

    pub fn snapshot(&self) -> Arc<PoolSnapshot> {
        Arc::clone(&self.shared.snapshot.read())
    }

    pub fn shares_of(&self, provider: &AccountId) -> Amount {
        self.shared
            .shares
            .get(provider)
            .map(|entry| *entry.value())
            .unwrap_or(0)
    }

    pub fn calculate_token1_deposit(&self, amount2: Amount) -> amm::Result<Amount> {
        self.snapshot().calculate_token1_deposit(amount2)
    }

    pub fn calculate_token2_deposit(&self, amount1: Amount) -> amm::Result<Amount> {
        self.snapshot().calculate_token2_deposit(amount1)
    }

    pub fn calculate_token1_swap(&self, amount_in: Amount) -> amm::Result<Amount> {
        self.snapshot().calculate_token1_swap(amount_in)
    }

    pub fn calculate_token2_swap(&self, amount_in: Amount) -> amm::Result<Amount> {
        self.snapshot().calculate_token2_swap(amount_in)
    }

    /// Committed events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<PoolEvent> {
        self.events.subscribe()
    }

    pub fn stats(&self) -> &ActorStats {
        &self.shared.stats
    }
}

/// Move `engine` onto a new task and return a handle to it
///
/// The join handle resolves to the engine after shutdown, or once every
/// handle has been dropped.
pub fn spawn_pool_actor<C>(
    engine: PoolEngine<C, BroadcastSink>,
    mailbox_capacity: usize,
) -> (PoolHandle, JoinHandle<PoolEngine<C, BroadcastSink>>)
where
    C: AssetCustody + Send + 'static,
{
    let shares = engine
        .state()
        .ledger()
        .iter()
        .map(|(account, shares)| (*account, *shares))
        .collect();
    let shared = Arc::new(Shared {
        snapshot: RwLock::new(Arc::new(PoolSnapshot::capture(&engine))),
        shares,
        stats: ActorStats::default(),
    });

    let (tx, rx) = mpsc::channel(mailbox_capacity.max(1));
    let handle = PoolHandle {
        mailbox: tx,
        shared: Arc::clone(&shared),
        events: engine.sink().clone(),
    };
    let actor = PoolActor {
        engine,
        mailbox: rx,
        shared,
    };
    (handle, tokio::spawn(actor.run()))
}
