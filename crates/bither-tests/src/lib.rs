//! Integration test suite for the Bither sale.
//!
//! Exercises the crowdsale, the multisig wallet and the deployment flow
//! together over the in-memory ledger, including property tests that try to
//! break cap and supply conservation.

pub mod helpers;
