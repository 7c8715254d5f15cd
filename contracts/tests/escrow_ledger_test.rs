//! Integration tests for the escrow ledger on the sled-backed store.
//!
//! These walk the deposit lifecycle end to end: lock on create, unlock on
//! release, rejection of repeated or unauthorized releases, and survival of
//! ledger state across a database reopen.

use std::sync::Arc;
use std::thread;

use caution_contracts::{DepositRequest, EscrowError, EscrowLedger};
use caution_protocol::config::ADDRESS_HRP;
use caution_protocol::identity::derive_address;
use caution_protocol::storage::{CautionDB, KvStore, Vault};
use caution_protocol::{Amount, Bech32AddressValidator};

fn addr(seed: &str) -> String {
    derive_address(ADDRESS_HRP, seed.as_bytes()).unwrap()
}

fn amt(s: &str) -> Amount {
    s.parse().unwrap()
}

/// Helper: a fresh ledger on a temporary sled database.
fn ledger() -> EscrowLedger<CautionDB> {
    let db = CautionDB::open_temporary().unwrap();
    EscrowLedger::init(db, addr("escrow"), Bech32AddressValidator::default()).unwrap()
}

fn deposit(id: &str, from: &str, amount: &str) -> DepositRequest {
    DepositRequest {
        transaction_id: id.into(),
        from: from.into(),
        asset_id: "res-42".into(),
        asset_type: 1,
        amount: amt(amount),
        payment_id: format!("pay-{id}"),
    }
}

fn locked(ledger: &EscrowLedger<CautionDB>, account: &str) -> Amount {
    ledger
        .amount_locked(account)
        .unwrap()
        .map(|l| l.balance)
        .unwrap_or(Amount::ZERO)
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn deposit_then_release() {
    let ledger = ledger();
    let alice = addr("alice");
    let escrow = ledger.escrow_address().to_string();

    // 1. Create
    ledger
        .create_transaction(&alice, &deposit("tx1", &alice, "100"))
        .unwrap();
    assert_eq!(locked(&ledger, &alice), amt("100"));
    assert!(!ledger.get_transaction("tx1").unwrap().unwrap().is_refunded);

    // 2. Release
    ledger.release_amount(&escrow, "tx1", "refund1").unwrap();
    assert_eq!(locked(&ledger, &alice), Amount::ZERO);
    let record = ledger.get_transaction("tx1").unwrap().unwrap();
    assert!(record.is_refunded);
    assert_eq!(record.refund_id.as_deref(), Some("refund1"));
}

#[test]
fn negative_deposit_leaves_vaults_unchanged() {
    let ledger = ledger();
    let alice = addr("alice");

    let err = ledger
        .create_transaction(&alice, &deposit("tx1", &alice, "-5"))
        .unwrap_err();
    assert!(matches!(err, EscrowError::InvalidAmount(_)));
    assert!(ledger.get_transaction("tx1").unwrap().is_none());
    assert!(ledger.amount_locked(&alice).unwrap().is_none());
}

#[test]
fn repeated_release_rejected_and_balance_stays_zero() {
    let ledger = ledger();
    let alice = addr("alice");
    let escrow = ledger.escrow_address().to_string();

    ledger
        .create_transaction(&alice, &deposit("tx1", &alice, "100"))
        .unwrap();
    ledger.release_amount(&escrow, "tx1", "refund1").unwrap();

    let err = ledger.release_amount(&escrow, "tx1", "refund1").unwrap_err();
    assert!(matches!(err, EscrowError::AlreadyRefunded(_)));
    assert_eq!(locked(&ledger, &alice), Amount::ZERO);
    assert!(!locked(&ledger, &alice).is_negative());
}

#[test]
fn two_deposits_then_partial_release() {
    let ledger = ledger();
    let alice = addr("alice");
    let escrow = ledger.escrow_address().to_string();

    ledger
        .create_transaction(&alice, &deposit("tx1", &alice, "100"))
        .unwrap();
    ledger
        .create_transaction(&alice, &deposit("tx2", &alice, "50"))
        .unwrap();
    assert_eq!(locked(&ledger, &alice), amt("150"));

    ledger.release_amount(&escrow, "tx1", "refund1").unwrap();
    assert_eq!(locked(&ledger, &alice), amt("50"));
}

#[test]
fn fractional_amounts_stay_exact() {
    let ledger = ledger();
    let alice = addr("alice");
    let escrow = ledger.escrow_address().to_string();

    for i in 0..10 {
        ledger
            .create_transaction(&alice, &deposit(&format!("tx{i}"), &alice, "0.1"))
            .unwrap();
    }
    assert_eq!(locked(&ledger, &alice), amt("1.0"));

    for i in 0..10 {
        ledger
            .release_amount(&escrow, &format!("tx{i}"), &format!("r{i}"))
            .unwrap();
    }
    assert!(locked(&ledger, &alice).is_zero());
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

#[test]
fn foreign_caller_cannot_release() {
    let ledger = ledger();
    let alice = addr("alice");
    ledger
        .create_transaction(&alice, &deposit("tx1", &alice, "100"))
        .unwrap();

    let err = ledger
        .release_amount(&addr("mallory"), "tx1", "refund1")
        .unwrap_err();
    match err {
        EscrowError::UnauthorizedRelease { caller, escrow } => {
            assert_eq!(caller, addr("mallory"));
            assert_eq!(escrow, addr("escrow"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(locked(&ledger, &alice), amt("100"));
}

#[test]
fn escrow_cannot_create_deposits() {
    let ledger = ledger();
    let escrow = ledger.escrow_address().to_string();
    let err = ledger
        .create_transaction(&escrow, &deposit("tx1", &addr("alice"), "1"))
        .unwrap_err();
    assert_eq!(err.kind(), "InvalidSender");
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[test]
fn state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let alice = addr("alice");

    {
        let db = CautionDB::open(dir.path()).unwrap();
        let ledger =
            EscrowLedger::init(db, addr("escrow"), Bech32AddressValidator::default()).unwrap();
        ledger
            .create_transaction(&alice, &deposit("tx1", &alice, "12.34"))
            .unwrap();
    }

    let db = CautionDB::open(dir.path()).unwrap();
    let ledger = EscrowLedger::open(db, Bech32AddressValidator::default()).unwrap();
    assert_eq!(ledger.escrow_address(), addr("escrow"));
    assert_eq!(locked(&ledger, &alice), amt("12.34"));
    assert_eq!(ledger.store().count(Vault::Transactions).unwrap(), 1);

    let escrow = ledger.escrow_address().to_string();
    ledger.release_amount(&escrow, "tx1", "r1").unwrap();
    assert!(locked(&ledger, &alice).is_zero());
}

#[test]
fn reinit_with_different_escrow_fails() {
    let dir = tempfile::tempdir().unwrap();
    {
        let db = CautionDB::open(dir.path()).unwrap();
        EscrowLedger::init(db, addr("escrow"), Bech32AddressValidator::default()).unwrap();
    }

    let db = CautionDB::open(dir.path()).unwrap();
    let err = EscrowLedger::init(db, addr("usurper"), Bech32AddressValidator::default())
        .err()
        .unwrap();
    assert!(matches!(err, EscrowError::AlreadyInitialized(_)));
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_deposits_sum_exactly() {
    let ledger = Arc::new(ledger());
    let alice = addr("alice");

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let ledger = Arc::clone(&ledger);
            let alice = alice.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    let id = format!("tx-{t}-{i}");
                    ledger
                        .create_transaction(&alice, &deposit(&id, &alice, "1.01"))
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(locked(&ledger, &alice), amt("202.00"));
    assert_eq!(ledger.store().count(Vault::Transactions).unwrap(), 200);
}

#[test]
fn racing_duplicate_ids_admit_exactly_one() {
    let ledger = Arc::new(ledger());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                let from = addr(&format!("user{t}"));
                ledger
                    .create_transaction(&from, &deposit("shared", &from, "10"))
                    .is_ok()
            })
        })
        .collect();
    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(winners, 1);
    let record = ledger.get_transaction("shared").unwrap().unwrap();
    assert_eq!(locked(&ledger, &record.from), amt("10"));
}
