//! Sale constants. All amounts are in minor units with 18 decimals
//! (1 ETH = 10^18 wei, 1 BTR = 10^18 units).

use crate::types::Amount;

/// Decimal places shared by the native currency and both sale tokens.
pub const DECIMALS: u32 = 18;

/// One whole unit (ether or token) in minor units.
pub const UNIT: Amount = 1_000_000_000_000_000_000;

/// Alias kept for readability at call sites dealing with the native currency.
pub const WEI_PER_ETHER: Amount = UNIT;

pub const SECONDS_PER_HOUR: u64 = 3_600;
pub const SECONDS_PER_DAY: u64 = 24 * SECONDS_PER_HOUR;
pub const SECONDS_PER_WEEK: u64 = 7 * SECONDS_PER_DAY;

/// Length of the public crowdsale window.
///
/// # Examples
///
/// ```
/// use bither_core::constants::{SALE_DURATION_SECS, SECONDS_PER_DAY};
/// assert_eq!(SALE_DURATION_SECS, 13 * SECONDS_PER_DAY);
/// ```
pub const SALE_DURATION_SECS: u64 = 13 * SECONDS_PER_DAY;

/// Hard cap on the raise: 300,000 ETH.
pub const SALE_CAP: Amount = 300_000 * WEI_PER_ETHER;

/// BTR allowance granted to the crowdsale: 33,000,000 BTR.
///
/// Exactly `SALE_CAP * 110`, so the first-phase rate drains it together
/// with the cap.
pub const BTR_CROWDSALE_ALLOWANCE: Amount = 33_000_000 * UNIT;

/// BSK allowance granted to the crowdsale: 21,000,000 BSK.
pub const BSK_CROWDSALE_ALLOWANCE: Amount = 21_000_000 * UNIT;

/// Total BTR minted to the deployer.
pub const BTR_TOTAL_SUPPLY: Amount = 45_000_000 * UNIT;

/// Total BSK minted to the deployer.
pub const BSK_TOTAL_SUPPLY: Amount = 100_000_000 * UNIT;

pub const BTR_SYMBOL: &str = "BTR";
pub const BSK_SYMBOL: &str = "BSK";

/// Default multisig confirmation threshold used by the deployment.
pub const DEFAULT_REQUIRED_CONFIRMATIONS: usize = 2;

/// Default crowdsale opening time: Thursday, 22 November 2018 17:08:27 UTC.
pub const DEFAULT_OPENING_TIME: u64 = 1_542_906_507;
