//! In-memory token ledger.
//!
//! [`MemoryLedger`] keeps native balances and, per registered token,
//! balances and ERC-20 allowances. Batches are applied under a single lock
//! with an undo log: when an operation fails, every slot touched by the
//! earlier operations of the same batch is restored before the error is
//! returned.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::LedgerError;
use crate::traits::{LedgerBatch, LedgerOp, TokenLedger};
use crate::types::{Address, Amount, Asset, TokenInfo};

/// Balances and allowances of one token contract.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TokenAccount {
    pub info: TokenInfo,
    pub total_supply: Amount,
    pub balances: BTreeMap<Address, Amount>,
    /// owner → spender → remaining allowance.
    pub allowances: BTreeMap<Address, BTreeMap<Address, Amount>>,
}

impl TokenAccount {
    fn balance(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }
}

/// Complete ledger contents. Serializable for deployment snapshots.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerState {
    pub native: BTreeMap<Address, Amount>,
    pub tokens: BTreeMap<Address, TokenAccount>,
}

/// Previous value of a slot touched by a batch.
/// `None` means the slot did not exist and is removed again on rollback.
enum Undo {
    Native { account: Address, prev: Option<Amount> },
    Balance { token: Address, account: Address, prev: Option<Amount> },
    Allowance { token: Address, owner: Address, spender: Address, prev: Option<Amount> },
}

fn restore<K: Ord>(map: &mut BTreeMap<K, Amount>, key: K, prev: Option<Amount>) {
    match prev {
        Some(value) => {
            map.insert(key, value);
        }
        None => {
            map.remove(&key);
        }
    }
}

impl LedgerState {
    fn token(&self, token: &Address) -> Result<&TokenAccount, LedgerError> {
        self.tokens.get(token).ok_or(LedgerError::UnknownToken(*token))
    }

    fn token_mut(&mut self, token: &Address) -> Result<&mut TokenAccount, LedgerError> {
        self.tokens.get_mut(token).ok_or(LedgerError::UnknownToken(*token))
    }

    fn balance(&self, asset: Asset, account: &Address) -> Result<Amount, LedgerError> {
        match asset {
            Asset::Native => Ok(self.native.get(account).copied().unwrap_or(0)),
            Asset::Token(token) => Ok(self.token(&token)?.balance(account)),
        }
    }

    fn set_balance(
        &mut self,
        asset: Asset,
        account: Address,
        value: Amount,
        undo: &mut Vec<Undo>,
    ) -> Result<(), LedgerError> {
        match asset {
            Asset::Native => {
                let prev = self.native.insert(account, value);
                undo.push(Undo::Native { account, prev });
            }
            Asset::Token(token) => {
                let prev = self.token_mut(&token)?.balances.insert(account, value);
                undo.push(Undo::Balance { token, account, prev });
            }
        }
        Ok(())
    }

    fn set_allowance(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        value: Amount,
        undo: &mut Vec<Undo>,
    ) -> Result<(), LedgerError> {
        let prev = self
            .token_mut(&token)?
            .allowances
            .entry(owner)
            .or_default()
            .insert(spender, value);
        undo.push(Undo::Allowance { token, owner, spender, prev });
        Ok(())
    }

    fn move_funds(
        &mut self,
        asset: Asset,
        from: Address,
        to: Address,
        amount: Amount,
        undo: &mut Vec<Undo>,
    ) -> Result<(), LedgerError> {
        let have = self.balance(asset, &from)?;
        if have < amount {
            return Err(LedgerError::InsufficientBalance { asset, account: from, have, need: amount });
        }
        self.set_balance(asset, from, have - amount, undo)?;
        let credited = self
            .balance(asset, &to)?
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.set_balance(asset, to, credited, undo)
    }

    fn apply(&mut self, op: &LedgerOp, undo: &mut Vec<Undo>) -> Result<(), LedgerError> {
        match *op {
            LedgerOp::Transfer { asset, from, to, amount } => {
                self.move_funds(asset, from, to, amount, undo)
            }
            LedgerOp::TransferFrom { token, spender, owner, to, amount } => {
                let have = self.token(&token)?.allowance(&owner, &spender);
                if have < amount {
                    return Err(LedgerError::InsufficientAllowance { token, spender, have, need: amount });
                }
                self.move_funds(Asset::Token(token), owner, to, amount, undo)?;
                self.set_allowance(token, owner, spender, have - amount, undo)
            }
            LedgerOp::Approve { token, owner, spender, amount } => {
                self.set_allowance(token, owner, spender, amount, undo)
            }
        }
    }

    fn rollback(&mut self, undo: Vec<Undo>) {
        for entry in undo.into_iter().rev() {
            match entry {
                Undo::Native { account, prev } => restore(&mut self.native, account, prev),
                Undo::Balance { token, account, prev } => {
                    if let Some(t) = self.tokens.get_mut(&token) {
                        restore(&mut t.balances, account, prev);
                    }
                }
                Undo::Allowance { token, owner, spender, prev } => {
                    if let Some(t) = self.tokens.get_mut(&token) {
                        let spenders = t.allowances.entry(owner).or_default();
                        restore(spenders, spender, prev);
                        if spenders.is_empty() {
                            t.allowances.remove(&owner);
                        }
                    }
                }
            }
        }
    }
}

/// Thread-safe in-memory implementation of [`TokenLedger`].
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from a snapshot.
    pub fn from_state(state: LedgerState) -> Self {
        Self { state: Mutex::new(state) }
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> LedgerState {
        self.state.lock().clone()
    }

    /// Register a token contract at `address`, minting `supply` to `holder`.
    pub fn register_token(
        &self,
        address: Address,
        symbol: &str,
        decimals: u32,
        holder: Address,
        supply: Amount,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        if state.tokens.contains_key(&address) {
            return Err(LedgerError::TokenExists(address));
        }
        let mut balances = BTreeMap::new();
        balances.insert(holder, supply);
        state.tokens.insert(
            address,
            TokenAccount {
                info: TokenInfo { symbol: symbol.to_string(), decimals },
                total_supply: supply,
                balances,
                allowances: BTreeMap::new(),
            },
        );
        debug!(token = %address, symbol, %holder, supply, "token registered");
        Ok(())
    }

    /// Credit native currency to `account` (funding from outside the ledger).
    pub fn deposit(&self, account: Address, amount: Amount) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        let entry = state.native.entry(account).or_insert(0);
        *entry = entry.checked_add(amount).ok_or(LedgerError::Overflow)?;
        debug!(%account, amount, "native deposit");
        Ok(())
    }

    /// Total supply of a registered token.
    pub fn total_supply(&self, token: &Address) -> Result<Amount, LedgerError> {
        Ok(self.state.lock().token(token)?.total_supply)
    }

    /// Registered token addresses, in address order.
    pub fn tokens(&self) -> Vec<Address> {
        self.state.lock().tokens.keys().copied().collect()
    }
}

impl TokenLedger for MemoryLedger {
    fn balance_of(&self, asset: Asset, account: &Address) -> Result<Amount, LedgerError> {
        self.state.lock().balance(asset, account)
    }

    fn allowance(
        &self,
        token: &Address,
        owner: &Address,
        spender: &Address,
    ) -> Result<Amount, LedgerError> {
        Ok(self.state.lock().token(token)?.allowance(owner, spender))
    }

    fn token_info(&self, token: &Address) -> Result<TokenInfo, LedgerError> {
        Ok(self.state.lock().token(token)?.info.clone())
    }

    fn commit(&self, batch: &LedgerBatch) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        let mut undo = Vec::with_capacity(batch.len() * 3);
        for (index, op) in batch.ops.iter().enumerate() {
            if let Err(e) = state.apply(op, &mut undo) {
                warn!(index, error = %e, "ledger batch rejected, rolling back");
                state.rollback(undo);
                return Err(e);
            }
        }
        debug!(ops = batch.len(), "ledger batch committed");
        Ok(())
    }
}
