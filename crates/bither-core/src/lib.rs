//! # bither-core
//! Foundation types and collaborator interfaces for the Bither token sale.
//!
//! - [`types`]: addresses, amounts, assets
//! - [`constants`]: sale constants (decimals, cap, allowances, supplies)
//! - [`error`]: error enums shared by every crate
//! - [`traits`]: [`TokenLedger`](traits::TokenLedger) and [`Clock`](traits::Clock)
//! - [`ledger`]: in-memory token ledger with atomic batches
//! - [`clock`]: system and manual clocks

pub mod clock;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod traits;
pub mod types;
