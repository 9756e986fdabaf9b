//! The multisig wallet engine.
//!
//! All mutating calls run under the wallet's state lock, including the
//! ledger commit performed by an execution, so concurrent confirmations of
//! the same transaction observe each other and execution happens once.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use bither_core::error::{LedgerError, QuorumError};
use bither_core::traits::{LedgerBatch, LedgerOp, TokenLedger};
use bither_core::types::{Address, Amount, Asset};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::transaction::{Call, Execution, MultiSigTransaction};

/// Upper bound on the number of owners.
pub const MAX_OWNER_COUNT: usize = 50;

/// Wallet event log entry.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum WalletEvent {
    Submission { transaction_id: u64 },
    Confirmation { owner: Address, transaction_id: u64 },
    Execution { transaction_id: u64 },
    ExecutionFailure { transaction_id: u64, reason: String },
    OwnerAddition { owner: Address },
    OwnerRemoval { owner: Address },
    RequirementChange { required: usize },
}

/// Complete mutable state of a wallet.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct WalletState {
    pub owners: Vec<Address>,
    pub required: usize,
    pub transactions: Vec<MultiSigTransaction>,
    /// transaction id → owners that confirmed it.
    pub confirmations: BTreeMap<u64, BTreeSet<Address>>,
    pub events: Vec<WalletEvent>,
}

impl WalletState {
    fn is_owner(&self, account: &Address) -> bool {
        self.owners.contains(account)
    }

    /// Confirmations from accounts that are currently owners.
    fn confirmation_count(&self, id: u64) -> usize {
        self.confirmations
            .get(&id)
            .map(|set| set.iter().filter(|o| self.is_owner(o)).count())
            .unwrap_or(0)
    }

    fn record_confirmation(&mut self, owner: &Address, id: u64) -> bool {
        let fresh = self.confirmations.entry(id).or_default().insert(*owner);
        if fresh {
            self.events.push(WalletEvent::Confirmation { owner: *owner, transaction_id: id });
        }
        fresh
    }
}

/// Serializable form of a [`MultiSigWallet`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct WalletSnapshot {
    pub address: Address,
    pub state: WalletState,
}

fn check_requirement(owners: usize, required: usize) -> Result<(), QuorumError> {
    if owners == 0 || owners > MAX_OWNER_COUNT || required == 0 || required > owners {
        return Err(QuorumError::InvalidRequirement { required, owners });
    }
    Ok(())
}

fn check_owners(owners: &[Address]) -> Result<(), QuorumError> {
    for (i, owner) in owners.iter().enumerate() {
        if owners[..i].contains(owner) {
            return Err(QuorumError::DuplicateOwner(*owner));
        }
    }
    Ok(())
}

/// Owner-set change computed before the ledger effects of an execution and
/// applied only once they succeed.
struct GovernanceChange {
    owners: Vec<Address>,
    required: usize,
    events: Vec<WalletEvent>,
}

fn plan_governance(state: &WalletState, call: &Call) -> Result<GovernanceChange, QuorumError> {
    let mut owners = state.owners.clone();
    let mut required = state.required;
    let mut events = Vec::new();
    match *call {
        Call::AddOwner { owner } => {
            if owners.contains(&owner) {
                return Err(QuorumError::DuplicateOwner(owner));
            }
            owners.push(owner);
            events.push(WalletEvent::OwnerAddition { owner });
        }
        Call::RemoveOwner { owner } => {
            let pos = owners
                .iter()
                .position(|o| *o == owner)
                .ok_or(QuorumError::OwnerNotFound(owner))?;
            owners.remove(pos);
            events.push(WalletEvent::OwnerRemoval { owner });
            if required > owners.len() {
                required = owners.len();
                events.push(WalletEvent::RequirementChange { required });
            }
        }
        Call::ReplaceOwner { owner, new_owner } => {
            let pos = owners
                .iter()
                .position(|o| *o == owner)
                .ok_or(QuorumError::OwnerNotFound(owner))?;
            if owners.contains(&new_owner) {
                return Err(QuorumError::DuplicateOwner(new_owner));
            }
            owners[pos] = new_owner;
            events.push(WalletEvent::OwnerRemoval { owner });
            events.push(WalletEvent::OwnerAddition { owner: new_owner });
        }
        Call::ChangeRequirement { required: new_required } => {
            required = new_required;
            events.push(WalletEvent::RequirementChange { required });
        }
        Call::None | Call::Approve { .. } => {}
    }
    check_requirement(owners.len(), required)?;
    Ok(GovernanceChange { owners, required, events })
}

/// M-of-N multisignature wallet holding native currency and tokens in a
/// [`TokenLedger`] under its own address.
pub struct MultiSigWallet {
    address: Address,
    state: Mutex<WalletState>,
    ledger: Arc<dyn TokenLedger>,
}

impl MultiSigWallet {
    pub fn new(
        address: Address,
        owners: Vec<Address>,
        required: usize,
        ledger: Arc<dyn TokenLedger>,
    ) -> Result<Self, QuorumError> {
        check_owners(&owners)?;
        check_requirement(owners.len(), required)?;
        info!(%address, owners = owners.len(), required, "multisig: created");
        let state = WalletState {
            owners,
            required,
            transactions: Vec::new(),
            confirmations: BTreeMap::new(),
            events: Vec::new(),
        };
        Ok(Self { address, state: Mutex::new(state), ledger })
    }

    pub fn from_snapshot(
        snapshot: WalletSnapshot,
        ledger: Arc<dyn TokenLedger>,
    ) -> Result<Self, QuorumError> {
        check_owners(&snapshot.state.owners)?;
        check_requirement(snapshot.state.owners.len(), snapshot.state.required)?;
        Ok(Self { address: snapshot.address, state: Mutex::new(snapshot.state), ledger })
    }

    pub fn snapshot(&self) -> WalletSnapshot {
        WalletSnapshot { address: self.address, state: self.state.lock().clone() }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    // --- owner operations ---

    /// Submit a transaction and confirm it on behalf of `submitter`.
    ///
    /// Execution is attempted immediately, so with a requirement of one the
    /// transaction runs before this returns. Only the id is returned: a
    /// failed attempt is logged at `warn`, recorded as
    /// [`WalletEvent::ExecutionFailure`], and leaves the transaction pending
    /// for [`execute`](Self::execute).
    pub fn submit(
        &self,
        submitter: &Address,
        destination: Address,
        value: Amount,
        call: Call,
    ) -> Result<u64, QuorumError> {
        let mut state = self.state.lock();
        if !state.is_owner(submitter) {
            debug!(%submitter, "multisig: submission from non-owner rejected");
            return Err(QuorumError::Unauthorized(*submitter));
        }
        let id = state.transactions.len() as u64;
        info!(id, %submitter, %destination, value, call = call.name(), "multisig: transaction submitted");
        state.transactions.push(MultiSigTransaction { id, destination, value, call, executed: false });
        state.events.push(WalletEvent::Submission { transaction_id: id });
        state.record_confirmation(submitter, id);
        let outcome = self.try_execute(&mut state, id);
        debug!(id, ?outcome, "multisig: execution attempted on submission");
        Ok(id)
    }

    /// Confirm transaction `id`. Confirming twice is a no-op; either way an
    /// execution attempt follows.
    pub fn confirm(&self, confirmer: &Address, id: u64) -> Result<Execution, QuorumError> {
        let mut state = self.state.lock();
        if !state.is_owner(confirmer) {
            debug!(%confirmer, id, "multisig: confirmation from non-owner rejected");
            return Err(QuorumError::Unauthorized(*confirmer));
        }
        let tx = state.transactions.get(id as usize).ok_or(QuorumError::NotFound(id))?;
        if tx.executed {
            return Err(QuorumError::AlreadyExecuted(id));
        }
        if state.record_confirmation(confirmer, id) {
            debug!(%confirmer, id, "multisig: confirmation recorded");
        } else {
            debug!(%confirmer, id, "multisig: already confirmed");
        }
        Ok(self.try_execute(&mut state, id))
    }

    /// Retry execution of `id`. A no-op when it is already executed or
    /// still short of confirmations.
    pub fn execute(&self, id: u64) -> Result<Execution, QuorumError> {
        let mut state = self.state.lock();
        if state.transactions.get(id as usize).is_none() {
            return Err(QuorumError::NotFound(id));
        }
        Ok(self.try_execute(&mut state, id))
    }

    fn try_execute(&self, state: &mut WalletState, id: u64) -> Execution {
        let index = id as usize;
        let tx = state.transactions[index].clone();
        if tx.executed {
            return Execution::AlreadyExecuted;
        }
        let have = state.confirmation_count(id);
        if have < state.required {
            return Execution::AwaitingConfirmations { have, need: state.required };
        }
        match self.perform(state, &tx) {
            Ok(()) => {
                state.transactions[index].executed = true;
                state.events.push(WalletEvent::Execution { transaction_id: id });
                info!(id, destination = %tx.destination, value = tx.value, call = tx.call.name(), "multisig: transaction executed");
                Execution::Executed
            }
            Err(e) => {
                state.events.push(WalletEvent::ExecutionFailure {
                    transaction_id: id,
                    reason: e.to_string(),
                });
                warn!(id, error = %e, "multisig: execution failed, transaction stays pending");
                Execution::Failed(e)
            }
        }
    }

    fn perform(&self, state: &mut WalletState, tx: &MultiSigTransaction) -> Result<(), QuorumError> {
        let governance = if tx.call.is_governance() {
            if tx.destination != self.address {
                return Err(QuorumError::NotWalletDestination(tx.destination));
            }
            Some(plan_governance(state, &tx.call)?)
        } else {
            None
        };

        let mut batch = LedgerBatch::new();
        if tx.value > 0 {
            batch.push(LedgerOp::Transfer {
                asset: Asset::Native,
                from: self.address,
                to: tx.destination,
                amount: tx.value,
            });
        }
        if let Call::Approve { spender, amount } = tx.call {
            batch.push(LedgerOp::Approve { token: tx.destination, owner: self.address, spender, amount });
        }
        if !batch.is_empty() {
            self.ledger.commit(&batch).map_err(QuorumError::UnderlyingTransferFailed)?;
        }

        if let Some(change) = governance {
            state.owners = change.owners;
            state.required = change.required;
            state.events.extend(change.events);
        }
        Ok(())
    }

    // --- queries ---

    pub fn owners(&self) -> Vec<Address> {
        self.state.lock().owners.clone()
    }

    pub fn is_owner(&self, account: &Address) -> bool {
        self.state.lock().is_owner(account)
    }

    pub fn required(&self) -> usize {
        self.state.lock().required
    }

    pub fn transaction(&self, id: u64) -> Option<MultiSigTransaction> {
        self.state.lock().transactions.get(id as usize).cloned()
    }

    /// Confirmations of `id` by current owners; zero for unknown ids.
    pub fn confirmation_count(&self, id: u64) -> usize {
        self.state.lock().confirmation_count(id)
    }

    /// Current owners that confirmed `id`, in owner order.
    pub fn confirmations(&self, id: u64) -> Vec<Address> {
        let state = self.state.lock();
        let Some(set) = state.confirmations.get(&id) else {
            return Vec::new();
        };
        state.owners.iter().filter(|o| set.contains(o)).copied().collect()
    }

    pub fn is_confirmed(&self, id: u64) -> bool {
        let state = self.state.lock();
        state.confirmation_count(id) >= state.required
    }

    /// Number of transactions matching the filters.
    pub fn transaction_count(&self, pending: bool, executed: bool) -> usize {
        self.state
            .lock()
            .transactions
            .iter()
            .filter(|tx| (pending && !tx.executed) || (executed && tx.executed))
            .count()
    }

    /// Ids of matching transactions, sliced to `[from, to)` of the filtered
    /// list.
    pub fn transaction_ids(&self, from: usize, to: usize, pending: bool, executed: bool) -> Vec<u64> {
        self.state
            .lock()
            .transactions
            .iter()
            .filter(|tx| (pending && !tx.executed) || (executed && tx.executed))
            .map(|tx| tx.id)
            .skip(from)
            .take(to.saturating_sub(from))
            .collect()
    }

    pub fn events(&self) -> Vec<WalletEvent> {
        self.state.lock().events.clone()
    }

    /// Native balance held by the wallet.
    pub fn balance(&self) -> Result<Amount, LedgerError> {
        self.ledger.balance_of(Asset::Native, &self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bither_core::constants::{UNIT, WEI_PER_ETHER};
    use bither_core::ledger::MemoryLedger;
    use proptest::prelude::*;

    const ETH: Amount = WEI_PER_ETHER;

    fn addr(label: &str) -> Address {
        Address::from_label(label)
    }

    fn owners() -> [Address; 3] {
        [addr("owner0"), addr("owner1"), addr("owner2")]
    }

    fn setup() -> (Arc<MemoryLedger>, MultiSigWallet) {
        let ledger = Arc::new(MemoryLedger::new());
        let wallet_addr = addr("wallet");
        ledger.deposit(wallet_addr, 2 * ETH).unwrap();
        let wallet = MultiSigWallet::new(wallet_addr, owners().to_vec(), 2, ledger.clone()).unwrap();
        (ledger, wallet)
    }

    fn native(ledger: &MemoryLedger, who: &Address) -> Amount {
        ledger.balance_of(Asset::Native, who).unwrap()
    }

    // --- construction ---

    #[test]
    fn rejects_invalid_requirement() {
        let ledger = Arc::new(MemoryLedger::new());
        for required in [0, 4] {
            assert_eq!(
                MultiSigWallet::new(addr("w"), owners().to_vec(), required, ledger.clone()).err(),
                Some(QuorumError::InvalidRequirement { required, owners: 3 })
            );
        }
        assert!(MultiSigWallet::new(addr("w"), vec![], 0, ledger).is_err());
    }

    #[test]
    fn rejects_duplicate_owner() {
        let ledger = Arc::new(MemoryLedger::new());
        let [a, b, _] = owners();
        assert_eq!(
            MultiSigWallet::new(addr("w"), vec![a, b, a], 2, ledger).err(),
            Some(QuorumError::DuplicateOwner(a))
        );
    }

    // --- submit / confirm ---

    #[test]
    fn submit_records_submitter_confirmation() {
        let (ledger, wallet) = setup();
        let [a, _, _] = owners();
        let id = wallet.submit(&a, addr("dest"), ETH, Call::None).unwrap();

        assert_eq!(id, 0);
        assert_eq!(wallet.confirmation_count(id), 1);
        assert!(!wallet.transaction(id).unwrap().executed);
        assert_eq!(native(&ledger, &addr("dest")), 0);
        assert_eq!(
            wallet.events(),
            vec![
                WalletEvent::Submission { transaction_id: 0 },
                WalletEvent::Confirmation { owner: a, transaction_id: 0 },
            ]
        );
    }

    #[test]
    fn second_confirmation_executes_once() {
        let (ledger, wallet) = setup();
        let [a, b, c] = owners();
        let id = wallet.submit(&a, addr("dest"), ETH, Call::None).unwrap();

        assert_eq!(wallet.confirm(&b, id).unwrap(), Execution::Executed);
        assert_eq!(native(&ledger, &addr("dest")), ETH);
        assert_eq!(wallet.balance().unwrap(), ETH);

        assert_eq!(wallet.confirm(&c, id), Err(QuorumError::AlreadyExecuted(id)));
        assert_eq!(wallet.execute(id).unwrap(), Execution::AlreadyExecuted);
        assert_eq!(native(&ledger, &addr("dest")), ETH);
    }

    #[test]
    fn reconfirming_does_not_double_count() {
        let (_ledger, wallet) = setup();
        let [a, _, _] = owners();
        let id = wallet.submit(&a, addr("dest"), ETH, Call::None).unwrap();

        assert_eq!(
            wallet.confirm(&a, id).unwrap(),
            Execution::AwaitingConfirmations { have: 1, need: 2 }
        );
        assert_eq!(wallet.confirmation_count(id), 1);
        assert_eq!(wallet.events().len(), 2);
    }

    #[test]
    fn execute_before_threshold_is_noop() {
        let (ledger, wallet) = setup();
        let id = wallet.submit(&owners()[0], addr("dest"), ETH, Call::None).unwrap();
        assert_eq!(
            wallet.execute(id).unwrap(),
            Execution::AwaitingConfirmations { have: 1, need: 2 }
        );
        assert_eq!(native(&ledger, &addr("dest")), 0);
    }

    #[test]
    fn non_owner_is_unauthorized() {
        let (_ledger, wallet) = setup();
        let stranger = addr("stranger");
        assert_eq!(
            wallet.submit(&stranger, addr("dest"), 0, Call::None),
            Err(QuorumError::Unauthorized(stranger))
        );
        let id = wallet.submit(&owners()[0], addr("dest"), 0, Call::None).unwrap();
        assert_eq!(wallet.confirm(&stranger, id), Err(QuorumError::Unauthorized(stranger)));
    }

    #[test]
    fn unknown_transaction_is_not_found() {
        let (_ledger, wallet) = setup();
        assert_eq!(wallet.confirm(&owners()[0], 7), Err(QuorumError::NotFound(7)));
        assert_eq!(wallet.execute(7), Err(QuorumError::NotFound(7)));
    }

    #[test]
    fn failed_execution_can_be_retried() {
        let (ledger, wallet) = setup();
        let [a, b, _] = owners();
        let id = wallet.submit(&a, addr("dest"), 5 * ETH, Call::None).unwrap();

        let outcome = wallet.confirm(&b, id).unwrap();
        assert!(matches!(
            outcome,
            Execution::Failed(QuorumError::UnderlyingTransferFailed(LedgerError::InsufficientBalance { .. }))
        ));
        assert!(!wallet.transaction(id).unwrap().executed);
        assert!(matches!(wallet.events().last(), Some(WalletEvent::ExecutionFailure { .. })));

        ledger.deposit(wallet.address(), 3 * ETH).unwrap();
        assert_eq!(wallet.execute(id).unwrap(), Execution::Executed);
        assert_eq!(native(&ledger, &addr("dest")), 5 * ETH);
    }

    #[test]
    fn single_owner_submission_failure_stays_pending() {
        let ledger = Arc::new(MemoryLedger::new());
        let [a, _, _] = owners();
        let wallet = MultiSigWallet::new(addr("solo"), vec![a], 1, ledger.clone()).unwrap();

        let id = wallet.submit(&a, addr("dest"), ETH, Call::None).unwrap();
        assert!(!wallet.transaction(id).unwrap().executed);
        assert!(matches!(
            wallet.events().last(),
            Some(WalletEvent::ExecutionFailure { transaction_id: 0, .. })
        ));

        ledger.deposit(wallet.address(), ETH).unwrap();
        assert_eq!(wallet.execute(id).unwrap(), Execution::Executed);
        assert_eq!(native(&ledger, &addr("dest")), ETH);
    }

    // --- approve payload ---

    #[test]
    fn approve_grants_allowance_exactly_once() {
        let (ledger, wallet) = setup();
        let [a, b, c] = owners();
        let token = addr("btr");
        let sale = addr("sale");
        ledger.register_token(token, "BTR", 18, wallet.address(), 45_000_000 * UNIT).unwrap();

        let id = wallet
            .submit(&a, token, 0, Call::Approve { spender: sale, amount: 33_000_000 * UNIT })
            .unwrap();
        assert_eq!(ledger.allowance(&token, &wallet.address(), &sale).unwrap(), 0);

        assert!(wallet.confirm(&b, id).unwrap().is_executed());
        assert_eq!(ledger.allowance(&token, &wallet.address(), &sale).unwrap(), 33_000_000 * UNIT);
        assert_eq!(wallet.confirm(&c, id), Err(QuorumError::AlreadyExecuted(id)));
    }

    #[test]
    fn approve_on_unknown_token_fails_and_stays_pending() {
        let (_ledger, wallet) = setup();
        let [a, b, _] = owners();
        let id = wallet.submit(&a, addr("nope"), 0, Call::Approve { spender: addr("s"), amount: 1 }).unwrap();
        assert!(matches!(wallet.confirm(&b, id).unwrap(), Execution::Failed(_)));
        assert_eq!(wallet.transaction_count(true, false), 1);
    }

    // --- governance ---

    #[test]
    fn add_owner_through_quorum() {
        let (_ledger, wallet) = setup();
        let [a, b, _] = owners();
        let newcomer = addr("owner3");
        let id = wallet
            .submit(&a, wallet.address(), 0, Call::AddOwner { owner: newcomer })
            .unwrap();
        assert!(!wallet.is_owner(&newcomer));

        wallet.confirm(&b, id).unwrap();
        assert_eq!(wallet.owners().last(), Some(&newcomer));
        assert!(wallet.events().contains(&WalletEvent::OwnerAddition { owner: newcomer }));
    }

    #[test]
    fn governance_must_target_wallet() {
        let (_ledger, wallet) = setup();
        let [a, b, _] = owners();
        let elsewhere = addr("elsewhere");
        let id = wallet.submit(&a, elsewhere, 0, Call::AddOwner { owner: addr("x") }).unwrap();
        assert_eq!(
            wallet.confirm(&b, id).unwrap(),
            Execution::Failed(QuorumError::NotWalletDestination(elsewhere))
        );
        assert_eq!(wallet.owners().len(), 3);
    }

    #[test]
    fn remove_owner_lowers_requirement() {
        let ledger = Arc::new(MemoryLedger::new());
        let [a, b, c] = owners();
        let wallet = MultiSigWallet::new(addr("w"), vec![a, b], 2, ledger).unwrap();
        let id = wallet.submit(&a, wallet.address(), 0, Call::RemoveOwner { owner: b }).unwrap();
        wallet.confirm(&b, id).unwrap();

        assert_eq!(wallet.owners(), vec![a]);
        assert_eq!(wallet.required(), 1);
        assert!(wallet.events().contains(&WalletEvent::RequirementChange { required: 1 }));

        // Removing the last owner would leave no valid requirement.
        let id = wallet.submit(&a, wallet.address(), 0, Call::RemoveOwner { owner: a }).unwrap();
        assert!(!wallet.transaction(id).unwrap().executed);
        assert!(!wallet.is_owner(&c));
    }

    #[test]
    fn replace_owner_drops_old_confirmations() {
        let (_ledger, wallet) = setup();
        let [a, b, c] = owners();
        let pending = wallet.submit(&c, addr("dest"), 0, Call::None).unwrap();
        let newcomer = addr("owner3");
        let id = wallet
            .submit(&a, wallet.address(), 0, Call::ReplaceOwner { owner: c, new_owner: newcomer })
            .unwrap();
        wallet.confirm(&b, id).unwrap();

        assert_eq!(wallet.owners(), vec![a, b, newcomer]);
        assert_eq!(wallet.confirmation_count(pending), 0);
        assert!(wallet.confirmations(pending).is_empty());
    }

    #[test]
    fn change_requirement_validates() {
        let (_ledger, wallet) = setup();
        let [a, b, _] = owners();
        let bad = wallet
            .submit(&a, wallet.address(), 0, Call::ChangeRequirement { required: 4 })
            .unwrap();
        assert_eq!(
            wallet.confirm(&b, bad).unwrap(),
            Execution::Failed(QuorumError::InvalidRequirement { required: 4, owners: 3 })
        );

        let good = wallet
            .submit(&a, wallet.address(), 0, Call::ChangeRequirement { required: 3 })
            .unwrap();
        wallet.confirm(&b, good).unwrap();
        assert_eq!(wallet.required(), 3);
        assert!(!wallet.is_confirmed(bad));
    }

    // --- queries ---

    #[test]
    fn transaction_ids_filter_and_slice() {
        let (_ledger, wallet) = setup();
        let [a, b, _] = owners();
        for _ in 0..4 {
            wallet.submit(&a, addr("dest"), 0, Call::None).unwrap();
        }
        wallet.confirm(&b, 1).unwrap();
        wallet.confirm(&b, 3).unwrap();

        assert_eq!(wallet.transaction_count(true, false), 2);
        assert_eq!(wallet.transaction_count(false, true), 2);
        assert_eq!(wallet.transaction_count(true, true), 4);
        assert_eq!(wallet.transaction_ids(0, 10, true, false), vec![0, 2]);
        assert_eq!(wallet.transaction_ids(1, 3, true, true), vec![1, 2]);
        assert_eq!(wallet.confirmations(1), vec![a, b]);
    }

    #[test]
    fn snapshot_round_trip() {
        let (ledger, wallet) = setup();
        wallet.submit(&owners()[0], addr("dest"), ETH, Call::None).unwrap();
        let snapshot = wallet.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded: WalletSnapshot = serde_json::from_str(&json).unwrap();
        let restored = MultiSigWallet::from_snapshot(decoded, ledger).unwrap();

        assert_eq!(restored.snapshot(), snapshot);
        assert_eq!(restored.confirm(&owners()[1], 0).unwrap(), Execution::Executed);
    }

    proptest! {
        #[test]
        fn value_moves_at_most_once(confirmers in proptest::collection::vec(0usize..4, 0..12)) {
            let (ledger, wallet) = setup();
            let all = owners();
            let id = wallet.submit(&all[0], addr("dest"), ETH, Call::None).unwrap();
            for i in confirmers {
                let who = if i == 3 { addr("stranger") } else { all[i] };
                let _ = wallet.confirm(&who, id);
                let _ = wallet.execute(id);
            }
            let executed = wallet.transaction(id).unwrap().executed;
            let received = native(&ledger, &addr("dest"));
            prop_assert_eq!(received, if executed { ETH } else { 0 });
            prop_assert_eq!(executed, wallet.confirmation_count(id) >= 2);
        }
    }
}
