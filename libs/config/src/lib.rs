//! # Pool Configuration
//!
//! Layered configuration for the pool engine, its actor and the simulator.
//!
//! ## Sources, lowest precedence first
//!
//! - **Base file**: `config/pool.toml` unless a path is given
//! - **Environment overlay**: `environments/<env>.toml` next to the base file
//! - **Environment variables**: `AMM_` prefix, `__` between nested keys
//!   (`AMM_POOL__FEE_RATE_BPS=30`)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pool_config::load_config;
//!
//! let config = load_config(Some("staging")).unwrap();
//! let params = config.to_pool_params().unwrap();
//! println!("fee: {} bps", params.fee_rate_bps);
//! ```

pub mod pool_config;

pub use pool_config::{
    load_config, ActorSettings, LoggingConfig, PoolConfig, PoolSettings, SimulationConfig,
    DEFAULT_CONFIG_PATH, ENV_PREFIX,
};
