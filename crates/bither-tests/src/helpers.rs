//! Shared helpers for the integration tests.

use std::sync::Arc;

use bither_core::clock::ManualClock;
use bither_core::constants::{
    BSK_CROWDSALE_ALLOWANCE, BSK_TOTAL_SUPPLY, BTR_CROWDSALE_ALLOWANCE, BTR_TOTAL_SUPPLY, UNIT,
    WEI_PER_ETHER,
};
use bither_core::ledger::MemoryLedger;
use bither_core::traits::TokenLedger;
use bither_core::types::{Address, Amount, Asset, Timestamp};
use bither_multisig::{Call, MultiSigWallet};
use bither_sale::{Crowdsale, CrowdsaleConfig, RateSchedule};

/// Opening time used by the production deployment.
pub const T0: Timestamp = 1_542_906_507;

/// Deterministic test address.
pub fn addr(label: &str) -> Address {
    Address::from_label(label)
}

/// `n` whole ether in wei.
pub fn ether(n: u64) -> Amount {
    Amount::from(n) * WEI_PER_ETHER
}

/// `n` whole tokens in minor units.
pub fn tokens(n: u64) -> Amount {
    Amount::from(n) * UNIT
}

pub fn owners() -> [Address; 3] {
    [addr("owner0"), addr("owner1"), addr("owner2")]
}

/// Tokens, a 2-of-3 multisig holding them and a crowdsale drawing on the
/// multisig's allowances, wired the way the production deployment does.
pub struct SaleFixture {
    pub ledger: Arc<MemoryLedger>,
    pub clock: Arc<ManualClock>,
    pub wallet: MultiSigWallet,
    pub crowdsale: Crowdsale,
    pub btr: Address,
    pub bsk: Address,
}

impl SaleFixture {
    /// Deploy without granting allowances.
    pub fn unapproved(opening: Timestamp, cap: Amount) -> Self {
        let ledger = Arc::new(MemoryLedger::new());
        let clock = Arc::new(ManualClock::new(opening));
        let (btr, bsk) = (addr("BitherToken"), addr("BitherStockToken"));
        let deployer = addr("deployer");
        let multisig = addr("MultiSigWallet");

        ledger.register_token(btr, "BTR", 18, deployer, BTR_TOTAL_SUPPLY).unwrap();
        ledger.register_token(bsk, "BSK", 18, deployer, BSK_TOTAL_SUPPLY).unwrap();
        let wallet = MultiSigWallet::new(multisig, owners().to_vec(), 2, ledger.clone()).unwrap();
        ledger.transfer(Asset::Token(btr), &deployer, &multisig, BTR_TOTAL_SUPPLY).unwrap();
        ledger.transfer(Asset::Token(bsk), &deployer, &multisig, BSK_TOTAL_SUPPLY).unwrap();

        let crowdsale = Crowdsale::new(
            CrowdsaleConfig {
                address: addr("BitherCrowdsale"),
                token_holder: multisig,
                beneficiary: multisig,
                cap,
                schedule: RateSchedule::bither(opening, btr, bsk).unwrap(),
            },
            ledger.clone(),
            clock.clone(),
        )
        .unwrap();

        Self { ledger, clock, wallet, crowdsale, btr, bsk }
    }

    /// Deploy and grant the production allowances through the multisig.
    pub fn approved(opening: Timestamp, cap: Amount) -> Self {
        let fixture = Self::unapproved(opening, cap);
        let [a, b, _] = owners();
        let sale = fixture.crowdsale.address();
        let btr_id = fixture
            .wallet
            .submit(&a, fixture.btr, 0, Call::Approve { spender: sale, amount: BTR_CROWDSALE_ALLOWANCE })
            .unwrap();
        let bsk_id = fixture
            .wallet
            .submit(&a, fixture.bsk, 0, Call::Approve { spender: sale, amount: BSK_CROWDSALE_ALLOWANCE })
            .unwrap();
        assert!(fixture.wallet.confirm(&b, btr_id).unwrap().is_executed());
        assert!(fixture.wallet.confirm(&b, bsk_id).unwrap().is_executed());
        fixture
    }

    pub fn multisig(&self) -> Address {
        self.wallet.address()
    }

    pub fn token_balance(&self, token: Address, who: &Address) -> Amount {
        self.ledger.balance_of(Asset::Token(token), who).unwrap()
    }

    pub fn native_balance(&self, who: &Address) -> Amount {
        self.ledger.balance_of(Asset::Native, who).unwrap()
    }

    pub fn allowance(&self, token: Address) -> Amount {
        self.ledger
            .allowance(&token, &self.multisig(), &self.crowdsale.address())
            .unwrap()
    }

    /// Credit `amount` wei to `who`.
    pub fn fund(&self, who: &Address, amount: Amount) {
        self.ledger.deposit(*who, amount).unwrap();
    }
}
