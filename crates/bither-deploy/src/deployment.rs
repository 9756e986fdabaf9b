//! A complete deployment: ledger, tokens, multisig wallet and crowdsale.

use std::sync::Arc;

use bither_core::constants::{BSK_SYMBOL, BSK_TOTAL_SUPPLY, BTR_SYMBOL, BTR_TOTAL_SUPPLY, DECIMALS};
use bither_core::error::{BitherError, QuorumError};
use bither_core::ledger::MemoryLedger;
use bither_core::traits::{Clock, TokenLedger};
use bither_core::types::{Address, Amount, Asset, Timestamp};
use bither_multisig::{Call, Execution, MultiSigWallet};
use bither_sale::{Crowdsale, CrowdsaleConfig, RateSchedule, SaleStatus, TokenPurchase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::DeploymentConfig;
use crate::error::DeployError;
use crate::snapshot::{DeploymentSnapshot, SNAPSHOT_VERSION};

/// Addresses of the deployed contracts.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeployedTokens {
    pub btr: Address,
    pub bsk: Address,
    pub multisig: Address,
    pub crowdsale: Address,
}

impl DeployedTokens {
    /// Deterministic addresses for a deployment by `deployer`.
    pub fn derive(deployer: &Address) -> Self {
        let at = |name: &str| Address::from_label(&format!("{deployer}/{name}"));
        Self {
            btr: at("BitherToken"),
            bsk: at("BitherStockToken"),
            multisig: at("MultiSigWallet"),
            crowdsale: at("BitherCrowdsale"),
        }
    }
}

/// Multisig transaction ids of a pair of approval submissions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApprovalIds {
    pub btr: u64,
    pub bsk: u64,
}

/// Allowance granted by the multisig to the crowdsale for one token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenAllowance {
    pub symbol: String,
    pub token: Address,
    pub allowance: Amount,
}

/// Summary printed by `status`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeploymentStatus {
    pub sale: SaleStatus,
    pub opening_time: Timestamp,
    pub closing_time: Timestamp,
    pub raised: Amount,
    pub cap_remaining: Amount,
    pub purchases: usize,
    pub remaining: Vec<TokenAllowance>,
    pub owners: Vec<Address>,
    pub required: usize,
    pub pending: Vec<u64>,
    pub executed: Vec<u64>,
    pub wallet_balance: Amount,
}

pub struct Deployment {
    created_at: DateTime<Utc>,
    deployer: Address,
    tokens: DeployedTokens,
    ledger: Arc<MemoryLedger>,
    wallet: MultiSigWallet,
    crowdsale: Crowdsale,
}

impl Deployment {
    /// Run the full deployment. With `approve` set, the allowance grants are
    /// submitted by the first owner and confirmed by the next ones until the
    /// requirement is met.
    pub fn deploy(
        config: &DeploymentConfig,
        clock: Arc<dyn Clock>,
        approve: bool,
    ) -> Result<Self, DeployError> {
        config.validate()?;
        let deployer = config.deployer;
        let tokens = DeployedTokens::derive(&deployer);
        let ledger = Arc::new(MemoryLedger::new());

        ledger.register_token(tokens.btr, BTR_SYMBOL, DECIMALS, deployer, BTR_TOTAL_SUPPLY)?;
        ledger.register_token(tokens.bsk, BSK_SYMBOL, DECIMALS, deployer, BSK_TOTAL_SUPPLY)?;

        let wallet = MultiSigWallet::new(
            tokens.multisig,
            config.owners.clone(),
            config.confirmations,
            ledger.clone(),
        )?;

        for token in [tokens.btr, tokens.bsk] {
            let all = ledger.balance_of(Asset::Token(token), &deployer)?;
            ledger.transfer(Asset::Token(token), &deployer, &tokens.multisig, all)?;
            info!(%token, amount = all, multisig = %tokens.multisig, "deploy: tokens moved to multisig");
        }

        let crowdsale = Crowdsale::new(
            CrowdsaleConfig {
                address: tokens.crowdsale,
                token_holder: tokens.multisig,
                beneficiary: tokens.multisig,
                cap: config.cap_wei(),
                schedule: RateSchedule::bither(config.opening_time, tokens.btr, tokens.bsk)?,
            },
            ledger.clone(),
            clock,
        )?;

        let deployment = Self {
            created_at: Utc::now(),
            deployer,
            tokens,
            ledger,
            wallet,
            crowdsale,
        };

        if approve {
            let submitter = config.owners[0];
            let ids = deployment.submit_approvals(
                &submitter,
                config.btr_allowance_units(),
                config.bsk_allowance_units(),
            )?;
            for owner in config.owners.iter().skip(1).take(config.confirmations - 1) {
                for (_, outcome) in deployment.confirm_approvals(owner, &[ids.btr, ids.bsk])? {
                    if let Execution::Failed(e) = outcome {
                        return Err(e.into());
                    }
                }
            }
        }
        info!(crowdsale = %tokens.crowdsale, multisig = %tokens.multisig, approve, "deploy: complete");
        Ok(deployment)
    }

    pub fn restore(snapshot: DeploymentSnapshot, clock: Arc<dyn Clock>) -> Result<Self, DeployError> {
        let ledger = Arc::new(MemoryLedger::from_state(snapshot.ledger));
        let wallet = MultiSigWallet::from_snapshot(snapshot.wallet, ledger.clone())?;
        let crowdsale = Crowdsale::from_snapshot(snapshot.crowdsale, ledger.clone(), clock)?;
        if wallet.address() != snapshot.tokens.multisig
            || crowdsale.address() != snapshot.tokens.crowdsale
        {
            return Err(BitherError::Snapshot("contract addresses do not match".into()).into());
        }
        Ok(Self {
            created_at: snapshot.created_at,
            deployer: snapshot.deployer,
            tokens: snapshot.tokens,
            ledger,
            wallet,
            crowdsale,
        })
    }

    pub fn snapshot(&self) -> DeploymentSnapshot {
        DeploymentSnapshot {
            version: SNAPSHOT_VERSION,
            created_at: self.created_at,
            deployer: self.deployer,
            tokens: self.tokens,
            ledger: self.ledger.snapshot(),
            wallet: self.wallet.snapshot(),
            crowdsale: self.crowdsale.snapshot(),
        }
    }

    pub fn tokens(&self) -> &DeployedTokens {
        &self.tokens
    }

    pub fn ledger(&self) -> &MemoryLedger {
        &self.ledger
    }

    pub fn wallet(&self) -> &MultiSigWallet {
        &self.wallet
    }

    pub fn crowdsale(&self) -> &Crowdsale {
        &self.crowdsale
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    // --- orchestration ---

    /// Submit the BTR and BSK `approve` transactions granting the crowdsale
    /// its allowances.
    pub fn submit_approvals(
        &self,
        owner: &Address,
        btr_amount: Amount,
        bsk_amount: Amount,
    ) -> Result<ApprovalIds, DeployError> {
        let spender = self.tokens.crowdsale;
        let btr = self
            .wallet
            .submit(owner, self.tokens.btr, 0, Call::Approve { spender, amount: btr_amount })?;
        let bsk = self
            .wallet
            .submit(owner, self.tokens.bsk, 0, Call::Approve { spender, amount: bsk_amount })?;
        info!(%owner, btr, bsk, "deploy: approvals submitted");
        Ok(ApprovalIds { btr, bsk })
    }

    /// Confirm each transaction in `ids` as `owner`.
    ///
    /// Every id is checked before anything is confirmed, so an unknown or
    /// already executed id, or a non-owner, leaves the wallet untouched.
    /// Failed executions are returned as [`Execution::Failed`] outcomes; the
    /// confirmations behind them are recorded and the transactions stay
    /// pending for a retry.
    pub fn confirm_approvals(
        &self,
        owner: &Address,
        ids: &[u64],
    ) -> Result<Vec<(u64, Execution)>, DeployError> {
        if !self.wallet.is_owner(owner) {
            return Err(QuorumError::Unauthorized(*owner).into());
        }
        let mut unique: Vec<u64> = Vec::with_capacity(ids.len());
        for &id in ids {
            match self.wallet.transaction(id) {
                None => return Err(QuorumError::NotFound(id).into()),
                Some(tx) if tx.executed => return Err(QuorumError::AlreadyExecuted(id).into()),
                Some(_) if unique.contains(&id) => {}
                Some(_) => unique.push(id),
            }
        }

        let mut outcomes = Vec::with_capacity(unique.len());
        for id in unique {
            let outcome = self.wallet.confirm(owner, id)?;
            match &outcome {
                Execution::Failed(e) => warn!(%owner, id, error = %e, "deploy: approval execution failed"),
                _ => info!(%owner, id, executed = outcome.is_executed(), "deploy: approval confirmed"),
            }
            outcomes.push((id, outcome));
        }
        Ok(outcomes)
    }

    /// Allowance from the multisig to the crowdsale, per token.
    pub fn display_allowance(&self) -> Result<Vec<TokenAllowance>, DeployError> {
        [self.tokens.btr, self.tokens.bsk]
            .into_iter()
            .map(|token| -> Result<TokenAllowance, DeployError> {
                Ok(TokenAllowance {
                    symbol: self.ledger.token_info(&token)?.symbol,
                    token,
                    allowance: self.ledger.allowance(&token, &self.tokens.multisig, &self.tokens.crowdsale)?,
                })
            })
            .collect()
    }

    /// Credit native currency to `account` so it can contribute.
    pub fn fund(&self, account: &Address, amount: Amount) -> Result<(), DeployError> {
        self.ledger.deposit(*account, amount)?;
        Ok(())
    }

    /// Purchase through the crowdsale, at `at` or the clock's current time.
    pub fn buy(
        &self,
        contributor: &Address,
        paid: Amount,
        at: Option<Timestamp>,
    ) -> Result<TokenPurchase, DeployError> {
        let receipt = match at {
            Some(now) => self.crowdsale.purchase_at(contributor, paid, now)?,
            None => self.crowdsale.purchase(contributor, paid)?,
        };
        Ok(receipt)
    }

    pub fn status(&self) -> Result<DeploymentStatus, DeployError> {
        let remaining = [self.tokens.btr, self.tokens.bsk]
            .into_iter()
            .map(|token| -> Result<TokenAllowance, DeployError> {
                Ok(TokenAllowance {
                    symbol: self.ledger.token_info(&token)?.symbol,
                    token,
                    allowance: self.crowdsale.remaining_tokens(&token)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let count = self.wallet.transaction_count(true, true);
        let schedule = self.crowdsale.schedule();
        Ok(DeploymentStatus {
            sale: self.crowdsale.status(),
            opening_time: schedule.opening_time(),
            closing_time: schedule.closing_time(),
            raised: self.crowdsale.raised(),
            cap_remaining: self.crowdsale.cap_remaining(),
            purchases: self.crowdsale.receipts().len(),
            remaining,
            owners: self.wallet.owners(),
            required: self.wallet.required(),
            pending: self.wallet.transaction_ids(0, count, true, false),
            executed: self.wallet.transaction_ids(0, count, false, true),
            wallet_balance: self.wallet.balance()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bither_core::clock::ManualClock;
    use bither_core::constants::{UNIT, WEI_PER_ETHER};
    use bither_core::error::SaleError;

    fn config() -> DeploymentConfig {
        DeploymentConfig::default()
    }

    fn deploy(approve: bool) -> (Deployment, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(config().opening_time));
        (Deployment::deploy(&config(), clock.clone(), approve).unwrap(), clock)
    }

    #[test]
    fn deploy_moves_supply_to_multisig() {
        let (d, _) = deploy(false);
        let t = d.tokens();
        assert_eq!(d.ledger().balance_of(Asset::Token(t.btr), &t.multisig).unwrap(), BTR_TOTAL_SUPPLY);
        assert_eq!(d.ledger().balance_of(Asset::Token(t.bsk), &t.multisig).unwrap(), BSK_TOTAL_SUPPLY);
        assert_eq!(d.ledger().balance_of(Asset::Token(t.btr), &config().deployer).unwrap(), 0);
        assert!(d.display_allowance().unwrap().iter().all(|a| a.allowance == 0));
    }

    #[test]
    fn deploy_with_approvals_grants_allowances() {
        let (d, _) = deploy(true);
        let allowances = d.display_allowance().unwrap();
        assert_eq!(allowances[0].symbol, "BTR");
        assert_eq!(allowances[0].allowance, 33_000_000 * UNIT);
        assert_eq!(allowances[1].symbol, "BSK");
        assert_eq!(allowances[1].allowance, 21_000_000 * UNIT);
        assert_eq!(d.wallet().transaction_count(false, true), 2);
    }

    #[test]
    fn manual_approval_flow() {
        let (d, _) = deploy(false);
        let owners = config().owners;
        let ids = d
            .submit_approvals(&owners[0], 33_000_000 * UNIT, 21_000_000 * UNIT)
            .unwrap();
        assert_eq!(ids, ApprovalIds { btr: 0, bsk: 1 });
        assert!(d.display_allowance().unwrap().iter().all(|a| a.allowance == 0));

        let outcomes = d.confirm_approvals(&owners[1], &config().transaction_ids).unwrap();
        assert!(outcomes.iter().all(|(_, o)| o.is_executed()));
        assert_eq!(d.display_allowance().unwrap()[0].allowance, 33_000_000 * UNIT);
    }

    #[test]
    fn confirm_by_non_owner_fails() {
        let (d, _) = deploy(false);
        d.submit_approvals(&config().owners[0], 1, 1).unwrap();
        let err = d.confirm_approvals(&Address::from_label("mallory"), &[0]).unwrap_err();
        assert!(matches!(err, DeployError::Bither(BitherError::Quorum(QuorumError::Unauthorized(_)))));
    }

    #[test]
    fn confirm_checks_every_id_before_confirming() {
        let (d, _) = deploy(false);
        let owners = config().owners;
        let ids = d.submit_approvals(&owners[0], 1, 1).unwrap();

        let err = d.confirm_approvals(&owners[1], &[ids.btr, 99]).unwrap_err();
        assert!(matches!(err, DeployError::Bither(BitherError::Quorum(QuorumError::NotFound(99)))));
        assert_eq!(d.wallet().confirmation_count(ids.btr), 1);
        assert!(d.display_allowance().unwrap().iter().all(|a| a.allowance == 0));

        let outcomes = d.confirm_approvals(&owners[1], &[ids.btr, ids.btr, ids.bsk]).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|(_, o)| o.is_executed()));
    }

    #[test]
    fn failed_approval_is_reported_as_outcome() {
        let (d, _) = deploy(false);
        let owners = config().owners;
        let id = d
            .wallet()
            .submit(&owners[0], Address::from_label("not-a-token"), 0, Call::Approve {
                spender: d.tokens().crowdsale,
                amount: 1,
            })
            .unwrap();

        let outcomes = d.confirm_approvals(&owners[1], &[id]).unwrap();
        assert!(matches!(outcomes[0], (_, Execution::Failed(QuorumError::UnderlyingTransferFailed(_)))));
        assert_eq!(d.wallet().confirmation_count(id), 2);
        assert!(!d.wallet().transaction(id).unwrap().executed);
    }

    #[test]
    fn buy_after_approval() {
        let (d, clock) = deploy(true);
        let buyer = Address::from_label("buyer");
        d.fund(&buyer, 10 * WEI_PER_ETHER).unwrap();
        clock.advance(60);
        let receipt = d.buy(&buyer, WEI_PER_ETHER, None).unwrap();
        assert_eq!(receipt.amount_of(&d.tokens().btr), 110 * UNIT);
        assert_eq!(d.wallet().balance().unwrap(), WEI_PER_ETHER);

        let status = d.status().unwrap();
        assert_eq!(status.sale, SaleStatus::Active);
        assert_eq!(status.raised, WEI_PER_ETHER);
        assert_eq!(status.purchases, 1);
        assert_eq!(status.executed, vec![0, 1]);
        assert!(status.pending.is_empty());
    }

    #[test]
    fn buy_without_approval_is_exhausted() {
        let (d, _) = deploy(false);
        let buyer = Address::from_label("buyer");
        d.fund(&buyer, WEI_PER_ETHER).unwrap();
        let err = d.buy(&buyer, WEI_PER_ETHER, None).unwrap_err();
        assert!(matches!(
            err,
            DeployError::Bither(BitherError::Sale(SaleError::AllowanceExhausted { .. }))
        ));
    }

    #[test]
    fn restore_from_snapshot() {
        let (d, clock) = deploy(true);
        let snapshot = d.snapshot();
        let restored = Deployment::restore(snapshot.clone(), clock).unwrap();
        assert_eq!(restored.snapshot(), snapshot);
        assert_eq!(restored.display_allowance().unwrap(), d.display_allowance().unwrap());
    }
}
