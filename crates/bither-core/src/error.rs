//! Error types for the Bither sale engines.
use thiserror::Error;

use crate::types::{Address, Amount, Asset};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid address: {0}")] InvalidAddress(String),
    #[error("invalid amount: {0}")] InvalidAmount(String),
    #[error("too many decimal places: {got} > {max}")] TooManyDecimals { got: usize, max: u32 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("unknown token: {0}")] UnknownToken(Address),
    #[error("token already registered: {0}")] TokenExists(Address),
    #[error("insufficient {asset} balance for {account}: have {have}, need {need}")]
    InsufficientBalance { asset: Asset, account: Address, have: Amount, need: Amount },
    #[error("insufficient allowance on {token} for {spender}: have {have}, need {need}")]
    InsufficientAllowance { token: Address, spender: Address, have: Amount, need: Amount },
    #[error("amount overflow")] Overflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("phase table is empty")] EmptyTable,
    #[error("first phase must start at offset 0, starts at {0}")] FirstOffsetNotZero(u64),
    #[error("phase offsets must be strictly ascending at index {0}")] UnorderedOffsets(usize),
    #[error("phase at index {index} starts at {offset}, beyond sale duration {duration}")]
    OffsetBeyondDuration { index: usize, offset: u64, duration: u64 },
    #[error("sale duration must be positive")] ZeroDuration,
    #[error("no token schedules configured")] NoTokens,
    #[error("duplicate token schedule: {0}")] DuplicateToken(Address),
}

/// Rejections from the crowdsale engine. Every variant leaves sale and
/// ledger state untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SaleError {
    #[error("outside sale window: now {now}, window [{opening}, {closing})")]
    OutOfWindow { now: u64, opening: u64, closing: u64 },
    #[error("zero contribution")] ZeroContribution,
    #[error("cap exceeded: remaining {remaining}, requested {requested}")]
    CapExceeded { remaining: Amount, requested: Amount },
    #[error("allowance exhausted for {token}: available {available}, needed {needed}")]
    AllowanceExhausted { token: Address, available: Amount, needed: Amount },
    #[error("below minimum contribution: {paid} < {minimum}")]
    BelowMinimumContribution { paid: Amount, minimum: Amount },
    #[error("underlying transfer failed: {0}")] UnderlyingTransferFailed(LedgerError),
    #[error("arithmetic overflow")] ArithmeticOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuorumError {
    #[error("not an owner: {0}")] Unauthorized(Address),
    #[error("transaction not found: {0}")] NotFound(u64),
    #[error("transaction already executed: {0}")] AlreadyExecuted(u64),
    #[error("underlying transfer failed: {0}")] UnderlyingTransferFailed(LedgerError),
    #[error("invalid requirement: {required} of {owners} owners")]
    InvalidRequirement { required: usize, owners: usize },
    #[error("duplicate owner: {0}")] DuplicateOwner(Address),
    #[error("owner not found: {0}")] OwnerNotFound(Address),
    #[error("self-governance call must target the wallet, got {0}")] NotWalletDestination(Address),
}

#[derive(Error, Debug)]
pub enum BitherError {
    #[error(transparent)] Parse(#[from] ParseError),
    #[error(transparent)] Ledger(#[from] LedgerError),
    #[error(transparent)] Schedule(#[from] ScheduleError),
    #[error(transparent)] Sale(#[from] SaleError),
    #[error(transparent)] Quorum(#[from] QuorumError),
    #[error("snapshot: {0}")] Snapshot(String),
}
