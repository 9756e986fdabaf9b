//! Core value types: addresses, amounts, assets.
//!
//! Amounts are `u128` minor units. With 18 decimals this covers every
//! supply and cap in the sale with room for the `paid * rate` products,
//! which are computed with checked arithmetic.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// Amount in minor units (wei for the native currency, 10^-18 token units).
pub type Amount = u128;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// A 20-byte account or contract address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address.
    pub const ZERO: Self = Self([0u8; 20]);

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Deterministic address derived from a label (first 20 bytes of its
    /// BLAKE3 hash). Used for locally created contracts and test accounts.
    ///
    /// # Examples
    ///
    /// ```
    /// use bither_core::types::Address;
    /// assert_eq!(Address::from_label("wallet"), Address::from_label("wallet"));
    /// assert_ne!(Address::from_label("wallet"), Address::from_label("crowdsale"));
    /// ```
    pub fn from_label(label: &str) -> Self {
        let hash = blake3::hash(label.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash.as_bytes()[..20]);
        Self(bytes)
    }

    /// Hex encoding with a `0x` prefix.
    pub fn encode(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse a 40-character hex string, with or without `0x` prefix.
    pub fn decode(s: &str) -> Result<Self, ParseError> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let bytes = hex::decode(digits).map_err(|_| ParseError::InvalidAddress(s.to_string()))?;
        let array: [u8; 20] = bytes
            .try_into()
            .map_err(|_| ParseError::InvalidAddress(s.to_string()))?;
        Ok(Self(array))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Something the ledger keeps balances of.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Asset {
    /// The chain's native currency (ether).
    Native,
    /// A token, identified by its contract address.
    Token(Address),
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str("native"),
            Self::Token(address) => write!(f, "token {address}"),
        }
    }
}

/// Metadata of a registered token.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TokenInfo {
    pub symbol: String,
    pub decimals: u32,
}

/// Parse a decimal string such as `"1.5"` into minor units.
///
/// Exact: no floating point is involved, and more fractional digits than
/// `decimals` is an error rather than a rounding.
///
/// # Examples
///
/// ```
/// use bither_core::types::parse_units;
/// assert_eq!(parse_units("1.5", 18).unwrap(), 1_500_000_000_000_000_000);
/// assert_eq!(parse_units("300000", 18).unwrap(), 300_000 * 10u128.pow(18));
/// ```
pub fn parse_units(s: &str, decimals: u32) -> Result<Amount, ParseError> {
    let trimmed = s.trim();
    let invalid = || ParseError::InvalidAmount(s.to_string());

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }
    if fraction.len() > decimals as usize {
        return Err(ParseError::TooManyDecimals { got: fraction.len(), max: decimals });
    }

    let scale = 10u128.checked_pow(decimals).ok_or_else(invalid)?;
    let whole_units: Amount = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| invalid())? };
    let fraction_units: Amount = if fraction.is_empty() {
        0
    } else {
        let padded = format!("{fraction:0<width$}", width = decimals as usize);
        padded.parse().map_err(|_| invalid())?
    };

    whole_units
        .checked_mul(scale)
        .and_then(|w| w.checked_add(fraction_units))
        .ok_or_else(invalid)
}

/// Render minor units as a decimal string, trimming trailing zeros.
///
/// # Examples
///
/// ```
/// use bither_core::types::format_units;
/// assert_eq!(format_units(163_500_000_000_000_000_000, 18), "163.5");
/// assert_eq!(format_units(110 * 10u128.pow(18), 18), "110");
/// ```
pub fn format_units(amount: Amount, decimals: u32) -> String {
    let scale = 10u128.pow(decimals);
    let whole = amount / scale;
    let fraction = amount % scale;
    if fraction == 0 {
        return whole.to_string();
    }
    let digits = format!("{fraction:0>width$}", width = decimals as usize);
    format!("{whole}.{}", digits.trim_end_matches('0'))
}
