//! Collaborator interfaces consumed by the sale engines.
//!
//! - [`TokenLedger`]: balances and allowances (token contracts + native currency)
//! - [`Clock`]: source of the current time

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::types::{Address, Amount, Asset, Timestamp, TokenInfo};

/// A single ledger mutation, used to compose atomic batches.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum LedgerOp {
    /// Move `amount` of `asset` directly from `from` to `to`.
    Transfer { asset: Asset, from: Address, to: Address, amount: Amount },
    /// Spend `amount` of `owner`'s `token` on behalf of `spender`,
    /// decrementing the allowance.
    TransferFrom { token: Address, spender: Address, owner: Address, to: Address, amount: Amount },
    /// Set `spender`'s allowance over `owner`'s `token`.
    Approve { token: Address, owner: Address, spender: Address, amount: Amount },
}

/// An ordered list of operations applied all-or-nothing.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerBatch {
    pub ops: Vec<LedgerOp>,
}

impl LedgerBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: LedgerOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

/// Balance and allowance ledger for the native currency and registered tokens.
///
/// Mirrors the ERC-20 surface the engines rely on. The crowdsale reads
/// allowances and spends them with `transfer_from`; the multisig grants them
/// with `approve`. [`commit`](Self::commit) is the atomicity boundary both
/// engines use for multi-step effects.
pub trait TokenLedger: Send + Sync {
    /// Balance of `account` in `asset`. Unknown tokens are an error.
    fn balance_of(&self, asset: Asset, account: &Address) -> Result<Amount, LedgerError>;

    /// Remaining amount `spender` may move out of `owner`'s `token` balance.
    fn allowance(
        &self,
        token: &Address,
        owner: &Address,
        spender: &Address,
    ) -> Result<Amount, LedgerError>;

    /// Metadata of a registered token.
    fn token_info(&self, token: &Address) -> Result<TokenInfo, LedgerError>;

    /// Apply every operation in `batch`, or none of them.
    fn commit(&self, batch: &LedgerBatch) -> Result<(), LedgerError>;

    /// Move `amount` of `asset` from `from` to `to`.
    ///
    /// Default implementation: a one-operation [`commit`](Self::commit).
    fn transfer(
        &self,
        asset: Asset,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let mut batch = LedgerBatch::new();
        batch.push(LedgerOp::Transfer { asset, from: *from, to: *to, amount });
        self.commit(&batch)
    }

    /// Spend `owner`'s `token` on behalf of `spender`.
    ///
    /// Default implementation: a one-operation [`commit`](Self::commit).
    fn transfer_from(
        &self,
        token: &Address,
        spender: &Address,
        owner: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let mut batch = LedgerBatch::new();
        batch.push(LedgerOp::TransferFrom {
            token: *token,
            spender: *spender,
            owner: *owner,
            to: *to,
            amount,
        });
        self.commit(&batch)
    }

    /// Set `spender`'s allowance over `owner`'s `token`, replacing any
    /// previous value.
    ///
    /// Default implementation: a one-operation [`commit`](Self::commit).
    fn approve(
        &self,
        token: &Address,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let mut batch = LedgerBatch::new();
        batch.push(LedgerOp::Approve { token: *token, owner: *owner, spender: *spender, amount });
        self.commit(&batch)
    }
}

/// Read-only source of the current time. Never advanced by the engines.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}
