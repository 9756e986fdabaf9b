//! # bither-deploy: Deployment orchestration.
//!
//! Composes the token ledger, the multisig wallet and the crowdsale the way
//! the production deployment does:
//!
//! 1. register BTR and BSK with their full supply minted to the deployer
//! 2. create the multisig wallet
//! 3. move every token to the wallet
//! 4. create the crowdsale with the wallet as token holder and beneficiary
//! 5. grant the crowdsale its allowances through multisig `approve`
//!    transactions (submitted by one owner, confirmed by the others)
//!
//! A deployment persists as a JSON [`DeploymentSnapshot`] between CLI runs.

pub mod config;
pub mod deployment;
pub mod error;
pub mod snapshot;

pub use config::DeploymentConfig;
pub use deployment::{ApprovalIds, DeployedTokens, Deployment, DeploymentStatus, TokenAllowance};
pub use error::DeployError;
pub use snapshot::DeploymentSnapshot;
