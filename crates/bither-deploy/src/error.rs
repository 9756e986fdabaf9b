//! Errors raised while deploying or operating a persisted deployment.

use std::path::PathBuf;

use bither_core::error::{BitherError, LedgerError, QuorumError, SaleError, ScheduleError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("configuration: {0}")] Config(#[from] ::config::ConfigError),
    #[error("invalid configuration: {0}")] InvalidConfig(String),
    #[error("i/o on {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("snapshot encoding: {0}")] Json(#[from] serde_json::Error),
    #[error("no deployment found at {0}")] NotDeployed(PathBuf),
    #[error(transparent)] Bither(#[from] BitherError),
}

macro_rules! via_bither_error {
    ($($ty:ty),*) => {
        $(impl From<$ty> for DeployError {
            fn from(e: $ty) -> Self {
                DeployError::Bither(e.into())
            }
        })*
    };
}

via_bither_error!(LedgerError, ScheduleError, SaleError, QuorumError);
