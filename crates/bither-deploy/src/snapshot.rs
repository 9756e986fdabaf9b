//! Persisted deployment state.
//!
//! The snapshot is a single JSON document carrying a format version, the
//! ledger contents and both engine states. Writes go to a sibling temporary
//! file that is then renamed over the target.

use std::fs;
use std::path::Path;

use bither_core::error::BitherError;
use bither_core::ledger::LedgerState;
use bither_core::types::Address;
use bither_multisig::WalletSnapshot;
use bither_sale::CrowdsaleSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::deployment::DeployedTokens;
use crate::error::DeployError;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DeploymentSnapshot {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub deployer: Address,
    pub tokens: DeployedTokens,
    pub ledger: LedgerState,
    pub wallet: WalletSnapshot,
    pub crowdsale: CrowdsaleSnapshot,
}

impl DeploymentSnapshot {
    pub fn save(&self, path: &Path) -> Result<(), DeployError> {
        let io_err = |source| DeployError::Io { path: path.to_path_buf(), source };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)?;
        debug!(path = %path.display(), "deployment snapshot saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, DeployError> {
        if !path.exists() {
            return Err(DeployError::NotDeployed(path.to_path_buf()));
        }
        let bytes = fs::read(path).map_err(|source| DeployError::Io { path: path.to_path_buf(), source })?;
        let snapshot: Self = serde_json::from_slice(&bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(BitherError::Snapshot(format!(
                "unsupported version {}, expected {SNAPSHOT_VERSION}",
                snapshot.version
            ))
            .into());
        }
        debug!(path = %path.display(), "deployment snapshot loaded");
        Ok(snapshot)
    }
}
