//! # bither-sale: Phased-rate crowdsale engine.
//!
//! All calculations use integer arithmetic only.
//!
//! - **Rate schedule**: per-token step functions of the time elapsed since
//!   opening. Windows are half-open, so a purchase landing exactly on a
//!   boundary is priced by the later phase.
//! - **Crowdsale**: converts a contribution into token allocations, enforces
//!   the raise cap and the allowances granted by the token holder, and
//!   commits token delivery plus the currency forward as one ledger batch.

pub mod crowdsale;
pub mod schedule;

pub use crowdsale::{Crowdsale, CrowdsaleConfig, CrowdsaleSnapshot, SaleState, TokenPurchase};
pub use schedule::{Allocation, PhaseTable, Quote, RateSchedule, SaleStatus, Step, TokenRates};
