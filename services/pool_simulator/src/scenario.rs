//! Seed scenario
//!
//! The deployer opens the pool at 1:1, a second provider matches the ratio,
//! investor 1 sells asset 1 three times (small, small, large), investor 2
//! sells asset 2 once, and the second provider withdraws everything.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use amm::{
    tokens, AccountId, Amount, AssetCustody, EventSink, InMemoryCustody, PoolEngine, PoolEvent,
    PoolParams, PoolQuery, TracingSink, TxContext,
};
use anyhow::{bail, ensure, Context, Result};
use pool_actor::{spawn_pool_actor, BroadcastSink, PoolHandle, PoolSnapshot};
use pool_config::{PoolConfig, SimulationConfig};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{info, warn};

pub const DEPLOYER: AccountId = AccountId::from_low_byte(0x01);
pub const LIQUIDITY_PROVIDER: AccountId = AccountId::from_low_byte(0x02);
pub const INVESTOR1: AccountId = AccountId::from_low_byte(0x03);
pub const INVESTOR2: AccountId = AccountId::from_low_byte(0x04);

const OPENING_DEPOSIT: u64 = 100_000;
const MATCHING_DEPOSIT: u64 = 50_000;

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub snapshot: PoolSnapshot,
    pub events: Vec<PoolEvent>,
    pub swap_outputs: Vec<Amount>,
    pub withdrawn: (Amount, Amount),
    pub commands_processed: u64,
    pub commands_failed: u64,
}

/// Mint balances and grant the pool the allowances the scenario spends
pub fn fund_custody(
    params: &PoolParams,
    pool_account: AccountId,
    simulation: &SimulationConfig,
) -> InMemoryCustody {
    let deployer_funds = tokens(simulation.deployer_funding);
    let participant_funds = tokens(simulation.participant_funding);
    let (asset1, asset2) = (params.asset1, params.asset2);

    let mut custody = InMemoryCustody::new();
    custody.register_asset(asset1);
    custody.register_asset(asset2);

    for asset in [asset1, asset2] {
        custody.mint(asset, DEPLOYER, deployer_funds);
        custody.approve(asset, DEPLOYER, pool_account, deployer_funds);
        custody.mint(asset, LIQUIDITY_PROVIDER, participant_funds);
        custody.approve(asset, LIQUIDITY_PROVIDER, pool_account, participant_funds);
    }
    custody.mint(asset1, INVESTOR1, participant_funds);
    custody.approve(asset1, INVESTOR1, pool_account, participant_funds);
    custody.mint(asset2, INVESTOR2, participant_funds);
    custody.approve(asset2, INVESTOR2, pool_account, participant_funds);
    custody
}

struct Clock {
    now: u64,
    interval: u64,
}

impl Clock {
    fn tx(&mut self, caller: AccountId) -> TxContext {
        self.now += self.interval;
        TxContext::new(caller, self.now)
    }
}

async fn seed(handle: &PoolHandle, clock: &mut Clock) -> Result<(Vec<Amount>, (Amount, Amount))> {
    let shares = handle
        .add_liquidity(clock.tx(DEPLOYER), tokens(OPENING_DEPOSIT), tokens(OPENING_DEPOSIT))
        .await
        .context("Opening deposit failed")?;
    info!(provider = %DEPLOYER, %shares, "pool opened");

    let amount1 = tokens(MATCHING_DEPOSIT);
    let amount2 = handle.calculate_token2_deposit(amount1)?;
    let lp_shares = handle
        .add_liquidity(clock.tx(LIQUIDITY_PROVIDER), amount1, amount2)
        .await
        .context("Matching deposit failed")?;
    info!(provider = %LIQUIDITY_PROVIDER, shares = %lp_shares, "liquidity matched");

    let mut outputs = Vec::new();
    for whole in [1, 1, 100] {
        let amount_in = tokens(whole);
        let quote = handle.calculate_token1_swap(amount_in)?;
        let received = handle
            .swap_token1(clock.tx(INVESTOR1), amount_in)
            .await
            .context("Investor 1 swap failed")?;
        ensure!(received == quote, "swap paid {} against a quote of {}", received, quote);
        info!(trader = %INVESTOR1, %amount_in, %received, price = ?handle.snapshot().spot_price(), "sold asset 1");
        outputs.push(received);
    }

    let amount_in = tokens(1);
    let received = handle
        .swap_token2(clock.tx(INVESTOR2), amount_in)
        .await
        .context("Investor 2 swap failed")?;
    info!(trader = %INVESTOR2, %amount_in, %received, price = ?handle.snapshot().spot_price(), "sold asset 2");
    outputs.push(received);

    let withdrawn = handle
        .remove_liquidity(clock.tx(LIQUIDITY_PROVIDER), lp_shares)
        .await
        .context("Withdrawal failed")?;
    info!(provider = %LIQUIDITY_PROVIDER, amount1 = %withdrawn.0, amount2 = %withdrawn.1, "liquidity withdrawn");

    Ok((outputs, withdrawn))
}

fn drain(events: &mut broadcast::Receiver<PoolEvent>) -> Vec<PoolEvent> {
    let mut drained = Vec::new();
    loop {
        match events.try_recv() {
            Ok(event) => drained.push(event),
            Err(TryRecvError::Lagged(missed)) => {
                warn!(missed, "event subscriber lagged; increase actor.event_capacity");
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
    drained
}

fn write_event_log(path: &Path, events: &[PoolEvent]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);
    for event in events {
        serde_json::to_writer(&mut writer, event).context("Failed to encode event")?;
        writer.write_all(b"\n")?;
    }
    writer.flush().context("Failed to flush event log")?;
    info!(path = ?path, count = events.len(), "event log written");
    Ok(())
}

/// Feed already committed events to another sink
pub fn replay<S: EventSink>(mut sink: S, events: &[PoolEvent]) {
    for event in events {
        sink.emit(event.clone());
    }
}

/// Deploy, replay the seed flow and shut the actor down
pub async fn run(config: &PoolConfig) -> Result<ScenarioReport> {
    let params = config.to_pool_params()?;
    let pool_account = config.pool_account()?;
    let custody = fund_custody(&params, pool_account, &config.simulation);

    let engine = PoolEngine::new(
        params,
        pool_account,
        custody,
        BroadcastSink::new(config.actor.event_capacity),
    )
    .context("Failed to deploy pool")?;
    let (handle, task) = spawn_pool_actor(engine, config.actor.mailbox_capacity);
    let mut events = handle.subscribe();

    let mut clock = Clock {
        now: config.simulation.clock_start,
        interval: config.simulation.block_interval_secs,
    };
    let seeded = seed(&handle, &mut clock).await;

    handle.shutdown().await?;
    let engine = task.await.context("Pool actor panicked")?;
    let (swap_outputs, withdrawn) = seeded?;

    for (asset, reserve) in [
        (params.asset1, engine.token1_balance()),
        (params.asset2, engine.token2_balance()),
    ] {
        let held = engine.custody().balance_of(asset, pool_account);
        if held != reserve {
            bail!("custody holds {} of {} but the pool records {}", held, asset, reserve);
        }
    }
    engine.state().check_invariants()?;

    let events = drain(&mut events);
    match config.event_log_path() {
        Some(path) => write_event_log(&path, &events)?,
        None => replay(TracingSink, &events),
    }

    let snapshot = handle.snapshot().as_ref().clone();
    info!(
        sequence = snapshot.sequence,
        balance1 = %snapshot.token1_balance(),
        balance2 = %snapshot.token2_balance(),
        total_shares = %snapshot.total_shares(),
        "simulation complete"
    );

    Ok(ScenarioReport {
        snapshot,
        events,
        swap_outputs,
        withdrawn,
        commands_processed: handle.stats().processed(),
        commands_failed: handle.stats().failed(),
    })
}
