//! Multisig wallet scenarios: 3 owners, 2 confirmations, funded with 2 ether.

use std::sync::Arc;

use bither_core::error::QuorumError;
use bither_core::ledger::MemoryLedger;
use bither_core::traits::TokenLedger;
use bither_core::types::{Address, Asset};
use bither_multisig::{Call, Execution, MultiSigWallet, WalletEvent};
use bither_tests::helpers::*;

fn funded_wallet() -> (Arc<MemoryLedger>, MultiSigWallet) {
    let ledger = Arc::new(MemoryLedger::new());
    let address = addr("MultiSigWallet");
    ledger.deposit(address, ether(2)).unwrap();
    let wallet = MultiSigWallet::new(address, owners().to_vec(), 2, ledger.clone()).unwrap();
    (ledger, wallet)
}

fn native(ledger: &MemoryLedger, who: &Address) -> u128 {
    ledger.balance_of(Asset::Native, who).unwrap()
}

#[test]
fn submission_emits_event_with_first_id() {
    let (_ledger, wallet) = funded_wallet();
    let id = wallet.submit(&owners()[0], addr("account3"), ether(1), Call::None).unwrap();
    assert_eq!(id, 0);
    assert_eq!(wallet.events()[0], WalletEvent::Submission { transaction_id: 0 });
    assert_eq!(wallet.confirmations(0), vec![owners()[0]]);
}

#[test]
fn execute_before_threshold_does_nothing() {
    let (ledger, wallet) = funded_wallet();
    let recipient = addr("account3");
    let id = wallet.submit(&owners()[0], recipient, ether(1), Call::None).unwrap();
    wallet.execute(id).unwrap();
    assert_eq!(native(&ledger, &recipient), 0);
    assert_eq!(native(&ledger, &wallet.address()), ether(2));
}

#[test]
fn second_confirmation_transfers_value_once() {
    let (ledger, wallet) = funded_wallet();
    let [a, b, c] = owners();
    let recipient = addr("account3");
    let id = wallet.submit(&a, recipient, ether(1), Call::None).unwrap();

    assert_eq!(wallet.confirm(&b, id).unwrap(), Execution::Executed);
    assert_eq!(native(&ledger, &recipient), ether(1));

    assert_eq!(wallet.confirm(&c, id), Err(QuorumError::AlreadyExecuted(id)));
    wallet.execute(id).unwrap();
    assert_eq!(native(&ledger, &recipient), ether(1));
    assert_eq!(native(&ledger, &wallet.address()), ether(1));
}

#[test]
fn add_owner_requires_quorum_and_wallet_destination() {
    let (_ledger, wallet) = funded_wallet();
    let [a, b, _] = owners();
    let account3 = addr("account3");

    let id = wallet.submit(&a, wallet.address(), 0, Call::AddOwner { owner: account3 }).unwrap();
    assert!(!wallet.is_owner(&account3));
    wallet.confirm(&b, id).unwrap();
    assert!(wallet.is_owner(&account3));
    assert_eq!(wallet.owners().len(), 4);

    // The new owner can now take part in confirmations.
    let id = wallet.submit(&account3, addr("payee"), ether(1), Call::None).unwrap();
    assert!(wallet.confirm(&a, id).unwrap().is_executed());
}

#[test]
fn allowance_grant_confirmed_twice_grants_once() {
    let (ledger, wallet) = funded_wallet();
    let [a, b, c] = owners();
    let token = addr("BitherToken");
    let spender = addr("BitherCrowdsale");
    ledger.register_token(token, "BTR", 18, wallet.address(), tokens(1_000)).unwrap();

    let id = wallet.submit(&a, token, 0, Call::Approve { spender, amount: tokens(400) }).unwrap();
    wallet.confirm(&b, id).unwrap();
    ledger.transfer_from(&token, &spender, &wallet.address(), &addr("buyer"), tokens(100)).unwrap();

    assert!(wallet.confirm(&c, id).is_err());
    assert_eq!(wallet.execute(id).unwrap(), Execution::AlreadyExecuted);
    assert_eq!(ledger.allowance(&token, &wallet.address(), &spender).unwrap(), tokens(300));
    assert_eq!(
        wallet.events().iter().filter(|e| matches!(e, WalletEvent::Execution { .. })).count(),
        1
    );
}
