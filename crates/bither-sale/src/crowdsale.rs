//! Crowdsale engine.
//!
//! Sells every configured token at once: a contribution of `paid` wei
//! credits `paid * rate` units of each token, drawn from the token holder
//! through the allowance it granted to the sale, and forwards `paid` to the
//! beneficiary. The cap and allowances are checked before anything moves,
//! and the ledger effects are committed as one batch.

use std::sync::Arc;

use bither_core::error::{BitherError, LedgerError, SaleError, ScheduleError};
use bither_core::traits::{Clock, LedgerBatch, LedgerOp, TokenLedger};
use bither_core::types::{Address, Amount, Asset, Timestamp};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::schedule::{Allocation, Quote, RateSchedule, SaleStatus};

/// Immutable crowdsale parameters.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CrowdsaleConfig {
    /// Account the sale acts as when spending allowances.
    pub address: Address,
    /// Account holding the tokens for sale and granting the allowances.
    pub token_holder: Address,
    /// Receives every contribution.
    pub beneficiary: Address,
    /// Maximum total raise, in wei.
    pub cap: Amount,
    pub schedule: RateSchedule,
}

/// Receipt of one accepted purchase.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TokenPurchase {
    pub contributor: Address,
    pub paid: Amount,
    pub timestamp: Timestamp,
    pub allocations: Vec<Allocation>,
}

impl TokenPurchase {
    pub fn amount_of(&self, token: &Address) -> Amount {
        self.allocations
            .iter()
            .find(|a| &a.token == token)
            .map(|a| a.amount)
            .unwrap_or(0)
    }
}

/// Mutable sale state, changed only by accepted purchases.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SaleState {
    pub cap_remaining: Amount,
    pub raised: Amount,
    pub purchases: Vec<TokenPurchase>,
}

impl SaleState {
    fn fresh(cap: Amount) -> Self {
        Self { cap_remaining: cap, raised: 0, purchases: Vec::new() }
    }
}

/// Serializable form of a [`Crowdsale`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CrowdsaleSnapshot {
    pub config: CrowdsaleConfig,
    pub state: SaleState,
}

pub struct Crowdsale {
    config: CrowdsaleConfig,
    state: Mutex<SaleState>,
    ledger: Arc<dyn TokenLedger>,
    clock: Arc<dyn Clock>,
}

impl Crowdsale {
    pub fn new(
        config: CrowdsaleConfig,
        ledger: Arc<dyn TokenLedger>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ScheduleError> {
        config.schedule.validate()?;
        let state = SaleState::fresh(config.cap);
        info!(
            address = %config.address,
            holder = %config.token_holder,
            cap = config.cap,
            opening = config.schedule.opening_time(),
            closing = config.schedule.closing_time(),
            "crowdsale: created"
        );
        Ok(Self { config, state: Mutex::new(state), ledger, clock })
    }

    /// Rebuild from a snapshot over an existing ledger.
    ///
    /// The sale state must account for the whole cap: `raised` plus
    /// `cap_remaining` equals the cap, and the receipts add up to `raised`.
    pub fn from_snapshot(
        snapshot: CrowdsaleSnapshot,
        ledger: Arc<dyn TokenLedger>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, BitherError> {
        snapshot.config.schedule.validate()?;
        let state = &snapshot.state;
        let accounted = state.raised.checked_add(state.cap_remaining);
        if accounted != Some(snapshot.config.cap) {
            return Err(BitherError::Snapshot(format!(
                "crowdsale raised {} plus remaining {} does not match cap {}",
                state.raised, state.cap_remaining, snapshot.config.cap
            )));
        }
        let receipts = state
            .purchases
            .iter()
            .try_fold(0, |sum: Amount, p| sum.checked_add(p.paid));
        if receipts != Some(state.raised) {
            return Err(BitherError::Snapshot(format!(
                "crowdsale receipts do not add up to raised {}",
                state.raised
            )));
        }
        Ok(Self { config: snapshot.config, state: Mutex::new(snapshot.state), ledger, clock })
    }

    pub fn snapshot(&self) -> CrowdsaleSnapshot {
        CrowdsaleSnapshot { config: self.config.clone(), state: self.state.lock().clone() }
    }

    pub fn config(&self) -> &CrowdsaleConfig {
        &self.config
    }

    pub fn address(&self) -> Address {
        self.config.address
    }

    pub fn schedule(&self) -> &RateSchedule {
        &self.config.schedule
    }

    // --- pricing ---

    /// Price `paid` at the current clock time.
    pub fn quote(&self, paid: Amount) -> Result<Quote, SaleError> {
        self.quote_at(paid, self.clock.now())
    }

    pub fn quote_at(&self, paid: Amount, now: Timestamp) -> Result<Quote, SaleError> {
        self.config.schedule.quote(paid, now)
    }

    // --- purchases ---

    /// Buy tokens for `contributor` at the current clock time.
    pub fn purchase(&self, contributor: &Address, paid: Amount) -> Result<TokenPurchase, SaleError> {
        self.purchase_at(contributor, paid, self.clock.now())
    }

    /// Buy tokens for `contributor` as if the call happened at `now`.
    ///
    /// Checks run in order: window and contribution (`quote`), minimum
    /// contribution, cap, then each token's allowance read from the ledger.
    /// On any rejection nothing changes.
    pub fn purchase_at(
        &self,
        contributor: &Address,
        paid: Amount,
        now: Timestamp,
    ) -> Result<TokenPurchase, SaleError> {
        let mut state = self.state.lock();
        match self.try_purchase(&mut state, contributor, paid, now) {
            Ok(receipt) => {
                info!(
                    %contributor,
                    paid,
                    now,
                    raised = state.raised,
                    cap_remaining = state.cap_remaining,
                    "crowdsale: purchase accepted"
                );
                Ok(receipt)
            }
            Err(e) => {
                debug!(%contributor, paid, now, error = %e, "crowdsale: purchase rejected");
                Err(e)
            }
        }
    }

    fn try_purchase(
        &self,
        state: &mut SaleState,
        contributor: &Address,
        paid: Amount,
        now: Timestamp,
    ) -> Result<TokenPurchase, SaleError> {
        let schedule = &self.config.schedule;
        let quote = schedule.quote(paid, now)?;

        let minimum = schedule.minimum_contribution(now)?;
        if paid < minimum {
            return Err(SaleError::BelowMinimumContribution { paid, minimum });
        }

        if paid > state.cap_remaining {
            return Err(SaleError::CapExceeded { remaining: state.cap_remaining, requested: paid });
        }
        let raised = state.raised.checked_add(paid).ok_or(SaleError::ArithmeticOverflow)?;

        let mut batch = LedgerBatch::new();
        for alloc in &quote.allocations {
            let available = self
                .ledger
                .allowance(&alloc.token, &self.config.token_holder, &self.config.address)
                .map_err(SaleError::UnderlyingTransferFailed)?;
            if available < alloc.amount {
                return Err(SaleError::AllowanceExhausted {
                    token: alloc.token,
                    available,
                    needed: alloc.amount,
                });
            }
            batch.push(LedgerOp::TransferFrom {
                token: alloc.token,
                spender: self.config.address,
                owner: self.config.token_holder,
                to: *contributor,
                amount: alloc.amount,
            });
        }
        batch.push(LedgerOp::Transfer {
            asset: Asset::Native,
            from: *contributor,
            to: self.config.beneficiary,
            amount: paid,
        });

        // The allowance may have changed since it was read above.
        self.ledger.commit(&batch).map_err(|e| match e {
            LedgerError::InsufficientAllowance { token, have, need, .. } => {
                SaleError::AllowanceExhausted { token, available: have, needed: need }
            }
            other => SaleError::UnderlyingTransferFailed(other),
        })?;

        state.cap_remaining -= paid;
        state.raised = raised;
        let receipt = TokenPurchase {
            contributor: *contributor,
            paid,
            timestamp: now,
            allocations: quote.allocations,
        };
        state.purchases.push(receipt.clone());
        Ok(receipt)
    }

    // --- queries ---

    pub fn status(&self) -> SaleStatus {
        self.config.schedule.status(self.clock.now())
    }

    pub fn has_closed(&self) -> bool {
        self.status() == SaleStatus::Closed
    }

    pub fn raised(&self) -> Amount {
        self.state.lock().raised
    }

    pub fn cap_remaining(&self) -> Amount {
        self.state.lock().cap_remaining
    }

    pub fn cap_reached(&self) -> bool {
        self.state.lock().cap_remaining == 0
    }

    /// Units of `token` still purchasable: the lesser of the holder's
    /// balance and the allowance it granted to the sale.
    pub fn remaining_tokens(&self, token: &Address) -> Result<Amount, SaleError> {
        let holder = &self.config.token_holder;
        let balance = self
            .ledger
            .balance_of(Asset::Token(*token), holder)
            .map_err(SaleError::UnderlyingTransferFailed)?;
        let allowance = self
            .ledger
            .allowance(token, holder, &self.config.address)
            .map_err(SaleError::UnderlyingTransferFailed)?;
        Ok(balance.min(allowance))
    }

    /// Every accepted purchase, oldest first.
    pub fn receipts(&self) -> Vec<TokenPurchase> {
        self.state.lock().purchases.clone()
    }

    pub fn token_purchases(&self, contributor: &Address) -> Vec<TokenPurchase> {
        self.state
            .lock()
            .purchases
            .iter()
            .filter(|p| &p.contributor == contributor)
            .cloned()
            .collect()
    }
}
