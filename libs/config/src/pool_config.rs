//! Pool Configuration Module
//!
//! Loads pool construction parameters, logging, actor sizing and simulator
//! settings from TOML with environment-specific overrides.

use amm::{AccountId, AssetId, PoolParams};
use anyhow::{bail, ensure, Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "config/pool.toml";
pub const ENV_PREFIX: &str = "AMM";

/// Main pool configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PoolConfig {
    /// Construction parameters
    pub pool: PoolSettings,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub actor: ActorSettings,

    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Pool identity and fee, identifiers as `0x`-prefixed hex
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PoolSettings {
    pub asset1: String,
    pub asset2: String,
    /// Custody account holding the reserves
    pub account: String,
    #[serde(default)]
    pub fee_rate_bps: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `amm=debug,info`
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ActorSettings {
    pub mailbox_capacity: usize,
    pub event_capacity: usize,
}

/// Settings for the seed scenario replayed by the simulator
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Timestamp of the first simulated transaction
    pub clock_start: u64,
    /// Seconds between simulated transactions
    pub block_interval_secs: u64,
    /// Whole tokens minted to the deployer
    pub deployer_funding: u64,
    /// Whole tokens minted to every other participant
    pub participant_funding: u64,
    /// Optional JSON-lines file receiving every committed event
    pub event_log: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for ActorSettings {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1024,
            event_capacity: 1024,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            clock_start: 1_700_000_000,
            block_interval_secs: 12,
            deployer_funding: 1_000_000,
            participant_funding: 100_000,
            event_log: None,
        }
    }
}

impl PoolConfig {
    /// Load configuration from files with environment overrides
    pub fn load(base_path: Option<&Path>, environment: Option<&str>) -> Result<Self> {
        let base = base_path.unwrap_or(Path::new(DEFAULT_CONFIG_PATH));

        let mut builder = Config::builder().add_source(File::from(base).required(true));

        // Environment overlays live next to the base file
        if let Some(env) = environment {
            let env_file = base
                .parent()
                .unwrap_or(Path::new("."))
                .join("environments")
                .join(format!("{}.toml", env));

            if env_file.exists() {
                info!("Loading environment config: {:?}", env_file);
                builder = builder.add_source(File::from(env_file));
            } else {
                warn!("Environment config not found: {:?}", env_file);
            }
        }

        // Override with environment variables (AMM_ prefix)
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Reject settings the engine or actor cannot run with
    pub fn validate(&self) -> Result<()> {
        let params = self.to_pool_params()?;
        params
            .validate()
            .context("Invalid pool parameters")?;
        self.pool_account()?;

        ensure!(
            self.actor.mailbox_capacity > 0,
            "actor.mailbox_capacity must be positive"
        );
        ensure!(
            self.actor.event_capacity > 0,
            "actor.event_capacity must be positive"
        );
        if self.simulation.participant_funding > self.simulation.deployer_funding {
            bail!(
                "simulation.participant_funding ({}) exceeds deployer_funding ({})",
                self.simulation.participant_funding,
                self.simulation.deployer_funding
            );
        }
        Ok(())
    }

    /// Engine construction parameters
    pub fn to_pool_params(&self) -> Result<PoolParams> {
        let asset1: AssetId = self
            .pool
            .asset1
            .parse()
            .with_context(|| format!("Invalid pool.asset1: {}", self.pool.asset1))?;
        let asset2: AssetId = self
            .pool
            .asset2
            .parse()
            .with_context(|| format!("Invalid pool.asset2: {}", self.pool.asset2))?;
        Ok(PoolParams::new(asset1, asset2, self.pool.fee_rate_bps))
    }

    pub fn pool_account(&self) -> Result<AccountId> {
        self.pool
            .account
            .parse()
            .with_context(|| format!("Invalid pool.account: {}", self.pool.account))
    }

    /// Expand environment variables in path values
    pub fn expand_env_vars(&mut self) -> Result<()> {
        if let Some(path) = &self.simulation.event_log {
            let expanded = shellexpand::full(path).context("Failed to expand event log path")?;
            self.simulation.event_log = Some(expanded.to_string());
        }
        Ok(())
    }

    pub fn event_log_path(&self) -> Option<PathBuf> {
        self.simulation.event_log.as_ref().map(PathBuf::from)
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

/// Load from the default location, expand paths and validate
pub fn load_config(environment: Option<&str>) -> Result<PoolConfig> {
    let mut config = PoolConfig::load(None, environment)?;
    config.expand_env_vars()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const BASE: &str = r#"
[pool]
asset1 = "0x00000000000000000000000000000000000000a1"
asset2 = "0x00000000000000000000000000000000000000a2"
account = "0x00000000000000000000000000000000000000ee"

[logging]
level = "debug"

[simulation]
block_interval_secs = 15
"#;

    fn write_base(dir: &Path) -> PathBuf {
        let config_path = dir.join("pool.toml");
        fs::write(&config_path, BASE).unwrap();
        config_path
    }

    #[test]
    fn test_load_base_config() {
        let dir = tempdir().unwrap();
        let config_path = write_base(dir.path());

        let config = PoolConfig::load(Some(&config_path), None).unwrap();

        assert_eq!(config.pool.fee_rate_bps, 0);
        assert_eq!(config.logging.level, "debug");
        assert!(!config.logging.json);
        assert_eq!(config.actor, ActorSettings::default());
        assert_eq!(config.simulation.block_interval_secs, 15);
        assert_eq!(config.simulation.clock_start, 1_700_000_000);
        config.validate().unwrap();

        let params = config.to_pool_params().unwrap();
        assert_eq!(params.asset1, AssetId::from_low_byte(0xa1));
        assert_eq!(params.asset2, AssetId::from_low_byte(0xa2));
        assert_eq!(config.pool_account().unwrap(), AccountId::from_low_byte(0xee));
    }

    #[test]
    fn test_environment_override() {
        let dir = tempdir().unwrap();
        let config_path = write_base(dir.path());
        fs::create_dir(dir.path().join("environments")).unwrap();
        fs::write(
            dir.path().join("environments").join("staging.toml"),
            "[pool]\nfee_rate_bps = 30\n\n[actor]\nmailbox_capacity = 8\n",
        )
        .unwrap();

        let config = PoolConfig::load(Some(&config_path), Some("staging")).unwrap();
        assert_eq!(config.pool.fee_rate_bps, 30);
        assert_eq!(config.actor.mailbox_capacity, 8);
        assert_eq!(config.actor.event_capacity, 1024);
        // base values survive the overlay
        assert_eq!(config.logging.level, "debug");

        // a missing overlay is not fatal
        let config = PoolConfig::load(Some(&config_path), Some("nowhere")).unwrap();
        assert_eq!(config.pool.fee_rate_bps, 0);
    }

    #[test]
    fn test_environment_variables_override_files() {
        let dir = tempdir().unwrap();
        let config_path = write_base(dir.path());

        std::env::set_var("AMM_SIMULATION__DEPLOYER_FUNDING", "5000000");
        let config = PoolConfig::load(Some(&config_path), None);
        std::env::remove_var("AMM_SIMULATION__DEPLOYER_FUNDING");

        assert_eq!(config.unwrap().simulation.deployer_funding, 5_000_000);
    }

    #[test]
    fn test_missing_base_file_fails() {
        let dir = tempdir().unwrap();
        let err = PoolConfig::load(Some(&dir.path().join("absent.toml")), None).unwrap_err();
        assert!(err.to_string().contains("Failed to build configuration"));
    }

    #[test]
    fn test_validation_rejects_bad_pools() {
        let dir = tempdir().unwrap();
        let config = PoolConfig::load(Some(&write_base(dir.path())), None).unwrap();

        let mut same_assets = config.clone();
        same_assets.pool.asset2 = same_assets.pool.asset1.clone();
        assert!(same_assets.validate().is_err());

        let mut fee = config.clone();
        fee.pool.fee_rate_bps = 10_000;
        assert!(fee.validate().is_err());

        let mut garbled = config.clone();
        garbled.pool.asset1 = "0xnothex".to_string();
        let err = garbled.validate().unwrap_err();
        assert!(err.to_string().contains("pool.asset1"));

        let mut mailbox = config;
        mailbox.actor.mailbox_capacity = 0;
        assert!(mailbox.validate().is_err());
    }

    #[test]
    fn test_event_log_expansion_and_toml_output() {
        let dir = tempdir().unwrap();
        let mut config = PoolConfig::load(Some(&write_base(dir.path())), None).unwrap();
        assert_eq!(config.event_log_path(), None);

        std::env::set_var("POOL_CONFIG_TEST_DIR", "/var/tmp/pool");
        config.simulation.event_log = Some("$POOL_CONFIG_TEST_DIR/events.jsonl".to_string());
        config.expand_env_vars().unwrap();
        std::env::remove_var("POOL_CONFIG_TEST_DIR");
        assert_eq!(
            config.event_log_path(),
            Some(PathBuf::from("/var/tmp/pool/events.jsonl"))
        );

        let rendered = config.to_toml().unwrap();
        let reparsed: PoolConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(reparsed, config);
    }
}
