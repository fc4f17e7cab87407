//! Pool simulator
//!
//! Deploys a pool behind its actor, funds a handful of participants in an
//! in-memory custody ledger and replays the seed flow: two providers deposit,
//! traders swap in both directions, one provider exits.

pub mod scenario;
pub mod telemetry;

pub use scenario::{fund_custody, run, ScenarioReport, DEPLOYER, INVESTOR1, INVESTOR2, LIQUIDITY_PROVIDER};
pub use telemetry::init_tracing;
