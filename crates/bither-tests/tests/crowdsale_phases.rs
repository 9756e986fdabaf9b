//! Purchases through the crowdsale across every phase of the schedule.

use bither_core::constants::{SALE_CAP, SALE_DURATION_SECS, SECONDS_PER_DAY, SECONDS_PER_HOUR};
use bither_core::error::SaleError;
use bither_sale::SaleStatus;
use bither_tests::helpers::*;

fn buy_one_ether_at(offset: u64) -> (SaleFixture, bither_core::types::Address) {
    let f = SaleFixture::approved(T0, SALE_CAP);
    let buyer = addr("buyer");
    f.fund(&buyer, ether(10));
    f.clock.set(T0 + offset);
    f.crowdsale.purchase(&buyer, ether(1)).unwrap();
    (f, buyer)
}

#[test]
fn btr_rates_by_phase() {
    let cases = [
        (0, 110),
        (SECONDS_PER_DAY - 2, 110),
        (SECONDS_PER_DAY + 2, 109),
        (5 * SECONDS_PER_DAY - 2, 109),
        (5 * SECONDS_PER_DAY + 2, 108),
        (9 * SECONDS_PER_DAY - 2, 108),
        (9 * SECONDS_PER_DAY + 2, 107),
        (13 * SECONDS_PER_DAY - 2, 107),
    ];
    for (offset, rate) in cases {
        let (f, buyer) = buy_one_ether_at(offset);
        assert_eq!(f.token_balance(f.btr, &buyer), tokens(rate), "offset {offset}");
    }
}

#[test]
fn bsk_rates_by_phase() {
    let cases = [
        (0, 70),
        (2 * SECONDS_PER_HOUR - 2, 70),
        (2 * SECONDS_PER_HOUR + 2, 68),
        (SECONDS_PER_DAY + 2, 66),
        (5 * SECONDS_PER_DAY + 2, 64),
        (9 * SECONDS_PER_DAY + 2, 62),
        (13 * SECONDS_PER_DAY - 2, 62),
    ];
    for (offset, rate) in cases {
        let (f, buyer) = buy_one_ether_at(offset);
        assert_eq!(f.token_balance(f.bsk, &buyer), tokens(rate), "offset {offset}");
    }
}

#[test]
fn one_and_a_half_ether_in_first_phase() {
    let f = SaleFixture::approved(T0, SALE_CAP);
    let buyer = addr("buyer");
    f.fund(&buyer, ether(2));
    f.crowdsale.purchase(&buyer, ether(3) / 2).unwrap();
    assert_eq!(f.token_balance(f.btr, &buyer), tokens(165));
    assert_eq!(f.token_balance(f.bsk, &buyer), tokens(105));
}

#[test]
fn purchase_before_opening_is_rejected() {
    let f = SaleFixture::approved(T0, SALE_CAP);
    let buyer = addr("buyer");
    f.fund(&buyer, ether(1));
    f.clock.set(T0 - 3);
    assert_eq!(f.crowdsale.status(), SaleStatus::NotStarted);
    assert!(matches!(
        f.crowdsale.purchase(&buyer, ether(1)),
        Err(SaleError::OutOfWindow { .. })
    ));
}

#[test]
fn purchase_after_closing_changes_nothing() {
    let f = SaleFixture::approved(T0, SALE_CAP);
    let buyer = addr("buyer");
    f.fund(&buyer, ether(1));
    f.clock.set(T0 + SALE_DURATION_SECS);
    let before = f.ledger.snapshot();

    assert!(f.crowdsale.has_closed());
    assert!(matches!(
        f.crowdsale.purchase(&buyer, ether(1)),
        Err(SaleError::OutOfWindow { .. })
    ));
    assert_eq!(f.ledger.snapshot(), before);
    assert_eq!(f.crowdsale.cap_remaining(), SALE_CAP);
}

#[test]
fn receipts_record_phase_and_rate() {
    let (f, buyer) = buy_one_ether_at(6 * SECONDS_PER_DAY);
    let receipts = f.crowdsale.token_purchases(&buyer);
    assert_eq!(receipts.len(), 1);
    let btr = receipts[0].allocations.iter().find(|a| a.token == f.btr).unwrap();
    assert_eq!((btr.phase, btr.rate), (2, 108));
    let bsk = receipts[0].allocations.iter().find(|a| a.token == f.bsk).unwrap();
    assert_eq!((bsk.phase, bsk.rate), (3, 64));
}
