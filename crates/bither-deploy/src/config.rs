//! Deployment configuration.
//!
//! Values come from, in increasing priority: built-in defaults matching the
//! production deployment, an optional TOML/JSON file, and `BITHER_*`
//! environment variables (`BITHER_OWNERS` and `BITHER_TRANSACTION_IDS` are
//! comma-separated lists).

use std::path::{Path, PathBuf};

use ::config::{Config, Environment, File};
use bither_core::constants::{
    DEFAULT_OPENING_TIME, DEFAULT_REQUIRED_CONFIRMATIONS, UNIT, WEI_PER_ETHER,
};
use bither_core::types::{Address, Amount};
use serde::{Deserialize, Serialize};

use crate::error::DeployError;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "BITHER";

/// File name of the persisted deployment inside the state directory.
pub const STATE_FILE: &str = "deployment.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct DeploymentConfig {
    /// BTR granted to the crowdsale, in whole tokens.
    pub btr_allowance: u64,
    /// BSK granted to the crowdsale, in whole tokens.
    pub bsk_allowance: u64,
    /// Raise cap, in whole ether.
    pub cap_ether: u64,
    /// Multisig confirmations required to execute.
    pub confirmations: usize,
    /// Multisig owners. The first submits the approvals.
    pub owners: Vec<Address>,
    /// Account the tokens are minted to before moving to the multisig.
    pub deployer: Address,
    /// Crowdsale opening time, Unix seconds.
    pub opening_time: u64,
    /// Multisig transactions confirmed by `confirm-approvals`.
    pub transaction_ids: Vec<u64>,
    /// Directory holding the persisted deployment.
    pub state_dir: PathBuf,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        let state_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bither");

        Self {
            btr_allowance: 33_000_000,
            bsk_allowance: 21_000_000,
            cap_ether: 300_000,
            confirmations: DEFAULT_REQUIRED_CONFIRMATIONS,
            owners: (0..3).map(|i| Address::from_label(&format!("owner{i}"))).collect(),
            deployer: Address::from_label("deployer"),
            opening_time: DEFAULT_OPENING_TIME,
            transaction_ids: vec![0, 1],
            state_dir,
        }
    }
}

impl DeploymentConfig {
    /// Load defaults, then `file` if given, then the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self, DeployError> {
        Self::load_with_env(file, Self::environment())
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("owners")
            .with_list_parse_key("transaction_ids")
    }

    fn load_with_env(file: Option<&Path>, env: Environment) -> Result<Self, DeployError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }
        let config: Self = builder.add_source(env).build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DeployError> {
        if self.owners.is_empty() {
            return Err(DeployError::InvalidConfig("at least one multisig owner is required".into()));
        }
        if self.confirmations == 0 || self.confirmations > self.owners.len() {
            return Err(DeployError::InvalidConfig(format!(
                "confirmations must be between 1 and {}, got {}",
                self.owners.len(),
                self.confirmations
            )));
        }
        if self.cap_ether == 0 {
            return Err(DeployError::InvalidConfig("cap must be positive".into()));
        }
        Ok(())
    }

    /// BTR allowance in minor units.
    pub fn btr_allowance_units(&self) -> Amount {
        Amount::from(self.btr_allowance) * UNIT
    }

    /// BSK allowance in minor units.
    pub fn bsk_allowance_units(&self) -> Amount {
        Amount::from(self.bsk_allowance) * UNIT
    }

    /// Cap in wei.
    pub fn cap_wei(&self) -> Amount {
        Amount::from(self.cap_ether) * WEI_PER_ETHER
    }

    /// Path to the persisted deployment.
    pub fn state_path(&self) -> PathBuf {
        self.state_dir.join(STATE_FILE)
    }
}
