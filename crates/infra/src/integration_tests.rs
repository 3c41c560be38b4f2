//! Integration tests for the ledger engine and session authority against
//! the in-memory store.
//!
//! Covers the core properties: conservation of value, non-negativity,
//! atomicity of failed operations, concurrency safety, and
//! single-active-session semantics.

use proptest::prelude::*;

use merchmint_auth::{login, Credentials, SessionAuthority};
use merchmint_core::{LedgerError, STARTING_BALANCE};
use merchmint_ledger::LedgerEngine;

use crate::store::InMemoryLedgerStore;

fn quiet_logs() {
    merchmint_observability::init_with_default_filter("warn");
}

async fn funded_pair(store: &InMemoryLedgerStore) -> (merchmint_core::Account, merchmint_core::Account) {
    let sender = store.seed_account("sender@example.com", "hash", 1000).await;
    let receiver = store.seed_account("receiver@example.com", "hash", 1000).await;
    (sender, receiver)
}

#[tokio::test]
async fn transfer_moves_value_and_appends_one_ledger_entry() {
    quiet_logs();
    let store = InMemoryLedgerStore::new();
    let (sender, receiver) = funded_pair(&store).await;
    let engine = LedgerEngine::new(store.clone());

    let receipt = engine
        .transfer(&sender.email, &receiver.email, 100)
        .await
        .unwrap();

    assert_eq!(receipt.sender_balance, 900);
    assert_eq!(receipt.receiver_balance, 1100);
    assert_eq!(store.balance_of(sender.id).await, Some(900));
    assert_eq!(store.balance_of(receiver.id).await, Some(1100));

    let transfers = store.transfers().await;
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].sender_email, sender.email);
    assert_eq!(transfers[0].receiver_email, receiver.email);
    assert_eq!(transfers[0].amount, 100);
}

#[tokio::test]
async fn transfer_to_unknown_recipient_is_rejected_before_any_debit() {
    quiet_logs();
    let store = InMemoryLedgerStore::new();
    let sender = store.seed_account("sender@example.com", "hash", 1000).await;
    let engine = LedgerEngine::new(store.clone());

    let err = engine
        .transfer(&sender.email, "nobody@example.com", 100)
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::InvalidRecipient(_)));
    assert_eq!(store.balance_of(sender.id).await, Some(1000));
    assert!(store.transfers().await.is_empty());
}

#[tokio::test]
async fn self_transfer_is_rejected_without_state_change() {
    quiet_logs();
    let store = InMemoryLedgerStore::new();
    let sender = store.seed_account("sender@example.com", "hash", 1000).await;
    let engine = LedgerEngine::new(store.clone());

    let err = engine
        .transfer(&sender.email, &sender.email, 10)
        .await
        .unwrap_err();

    assert_eq!(err, LedgerError::SelfTransfer);
    assert_eq!(store.balance_of(sender.id).await, Some(1000));
    assert!(store.transfers().await.is_empty());
}

#[tokio::test]
async fn insufficient_transfer_leaves_both_balances_untouched() {
    quiet_logs();
    let store = InMemoryLedgerStore::new();
    let (sender, receiver) = funded_pair(&store).await;
    let engine = LedgerEngine::new(store.clone());

    let err = engine
        .transfer(&sender.email, &receiver.email, 1001)
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::InsufficientFunds(_)));
    assert_eq!(store.balance_of(sender.id).await, Some(1000));
    assert_eq!(store.balance_of(receiver.id).await, Some(1000));
    assert!(store.transfers().await.is_empty());
}

#[tokio::test]
async fn purchase_debits_and_records_ownership_exactly_once() {
    quiet_logs();
    let store = InMemoryLedgerStore::new();
    let account = store.seed_account("buyer@example.com", "hash", 1000).await;
    store.seed_item("cup", 20).await;
    let engine = LedgerEngine::new(store.clone());

    let record = engine.purchase(account.id, "cup").await.unwrap();

    assert_eq!(record.item_name, "cup");
    assert_eq!(record.owner, account.id);
    assert_eq!(store.balance_of(account.id).await, Some(980));

    let inventory = store.inventory().await;
    assert_eq!(inventory.len(), 1);
    assert_eq!(inventory[0].id, record.id);
}

#[tokio::test]
async fn purchase_beyond_balance_changes_nothing() {
    quiet_logs();
    let store = InMemoryLedgerStore::new();
    let account = store.seed_account("buyer@example.com", "hash", 50).await;
    store.seed_item("powerbank", 100).await;
    let engine = LedgerEngine::new(store.clone());

    let err = engine.purchase(account.id, "powerbank").await.unwrap_err();

    assert!(matches!(err, LedgerError::InsufficientFunds(_)));
    assert_eq!(store.balance_of(account.id).await, Some(50));
    assert!(store.inventory().await.is_empty());
}

#[tokio::test]
async fn purchase_of_unknown_item_is_rejected() {
    quiet_logs();
    let store = InMemoryLedgerStore::new();
    let account = store.seed_account("buyer@example.com", "hash", 1000).await;
    let engine = LedgerEngine::new(store.clone());

    let err = engine.purchase(account.id, "unicorn").await.unwrap_err();

    assert!(matches!(err, LedgerError::ItemNotFound(_)));
    assert_eq!(store.balance_of(account.id).await, Some(1000));
    assert!(store.inventory().await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_transfers_never_overdebit_a_shared_sender() {
    quiet_logs();
    let store = InMemoryLedgerStore::new();
    let sender = store.seed_account("sender@example.com", "hash", 100).await;
    let receiver = store.seed_account("receiver@example.com", "hash", 0).await;
    let engine = LedgerEngine::new(store.clone());

    // Ten transfers of 30 against a balance of 100: exactly three can fit.
    let mut handles = Vec::new();
    for _ in 0..10 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .transfer("sender@example.com", "receiver@example.com", 30)
                .await
        }));
    }

    let mut succeeded = 0u32;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(err) => assert!(matches!(err, LedgerError::InsufficientFunds(_))),
        }
    }

    assert_eq!(succeeded, 3);
    assert_eq!(store.balance_of(sender.id).await, Some(10));
    assert_eq!(store.balance_of(receiver.id).await, Some(90));
    assert_eq!(store.transfers().await.len(), 3);
}

#[tokio::test]
async fn account_summary_reflects_history_and_holdings() {
    quiet_logs();
    let store = InMemoryLedgerStore::new();
    let (sender, receiver) = funded_pair(&store).await;
    store.seed_item("book", 50).await;
    let engine = LedgerEngine::new(store.clone());

    engine
        .transfer(&sender.email, &receiver.email, 200)
        .await
        .unwrap();
    engine.purchase(sender.id, "book").await.unwrap();

    let summary = engine.account_summary(sender.id).await.unwrap();
    assert_eq!(summary.balance, 750);
    assert_eq!(summary.transfers.len(), 1);
    assert_eq!(summary.inventory.len(), 1);
    assert_eq!(summary.inventory[0].item_name, "book");

    // The receiver sees the same transfer from the other side.
    let summary = engine.account_summary(receiver.id).await.unwrap();
    assert_eq!(summary.balance, 1200);
    assert_eq!(summary.transfers.len(), 1);
    assert!(summary.inventory.is_empty());
}

#[tokio::test]
async fn issuing_a_second_token_revokes_the_first() {
    quiet_logs();
    let store = InMemoryLedgerStore::new();
    let account = store.seed_account("user@example.com", "hash", 1000).await;
    let authority = SessionAuthority::new("secret");

    let first = authority
        .issue_token(&store, account.id, &account.email)
        .await
        .unwrap();
    assert!(authority.check_access(&store, &first, account.id).await.unwrap());

    let second = authority
        .issue_token(&store, account.id, &account.email)
        .await
        .unwrap();

    assert!(!authority.check_access(&store, &first, account.id).await.unwrap());
    assert!(authority.check_access(&store, &second, account.id).await.unwrap());
    assert_eq!(store.tokens().await.len(), 1);
}

#[tokio::test]
async fn check_access_denies_a_token_presented_for_another_account() {
    quiet_logs();
    let store = InMemoryLedgerStore::new();
    let owner = store.seed_account("owner@example.com", "hash", 1000).await;
    let other = store.seed_account("other@example.com", "hash", 1000).await;
    let authority = SessionAuthority::new("secret");

    let token = authority
        .issue_token(&store, owner.id, &owner.email)
        .await
        .unwrap();

    assert!(authority.check_access(&store, &token, owner.id).await.unwrap());
    assert!(!authority.check_access(&store, &token, other.id).await.unwrap());
    assert!(!authority
        .check_access(&store, "never-issued", owner.id)
        .await
        .unwrap());
}

#[tokio::test]
async fn issued_tokens_decode_to_their_account() {
    quiet_logs();
    let store = InMemoryLedgerStore::new();
    let account = store.seed_account("user@example.com", "hash", 1000).await;
    let authority = SessionAuthority::new("secret");

    let token = authority
        .issue_token(&store, account.id, &account.email)
        .await
        .unwrap();

    let claims = authority.decode_token(&token).unwrap();
    assert_eq!(claims.sub, account.id);
    assert_eq!(claims.email, account.email);
    assert!(!claims.is_expired(chrono::Utc::now()));
}

#[tokio::test]
async fn first_login_creates_the_account_with_the_starting_grant() {
    quiet_logs();
    let store = InMemoryLedgerStore::new();
    let authority = SessionAuthority::new("secret");
    let credentials = Credentials {
        email: "new@example.com".into(),
        password_hash: "hash".into(),
    };

    let outcome = login(&store, &authority, &credentials).await.unwrap();
    assert!(outcome.created);
    assert_eq!(outcome.account.balance, STARTING_BALANCE);
    assert!(authority
        .check_access(&store, &outcome.token, outcome.account.id)
        .await
        .unwrap());
}

#[tokio::test]
async fn relogin_invalidates_the_previous_session() {
    quiet_logs();
    let store = InMemoryLedgerStore::new();
    let authority = SessionAuthority::new("secret");
    let credentials = Credentials {
        email: "user@example.com".into(),
        password_hash: "hash".into(),
    };

    let first = login(&store, &authority, &credentials).await.unwrap();
    let second = login(&store, &authority, &credentials).await.unwrap();

    assert!(!second.created);
    assert_eq!(first.account.id, second.account.id);
    assert!(!authority
        .check_access(&store, &first.token, first.account.id)
        .await
        .unwrap());
    assert!(authority
        .check_access(&store, &second.token, second.account.id)
        .await
        .unwrap());
}

#[tokio::test]
async fn login_with_a_wrong_hash_is_rejected_and_keeps_the_session() {
    quiet_logs();
    let store = InMemoryLedgerStore::new();
    let authority = SessionAuthority::new("secret");
    let credentials = Credentials {
        email: "user@example.com".into(),
        password_hash: "hash".into(),
    };

    let outcome = login(&store, &authority, &credentials).await.unwrap();

    let wrong = Credentials {
        email: "user@example.com".into(),
        password_hash: "other-hash".into(),
    };
    let err = login(&store, &authority, &wrong).await.unwrap_err();

    assert_eq!(err, LedgerError::InvalidCredentials);
    // The failed attempt must not disturb the live session.
    assert!(authority
        .check_access(&store, &outcome.token, outcome.account.id)
        .await
        .unwrap());
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        ..ProptestConfig::default()
    })]

    /// Conservation: no sequence of transfers, successful or rejected,
    /// changes the total balance, and no balance ever goes negative.
    #[test]
    fn transfer_sequences_conserve_total_balance(
        amounts in prop::collection::vec(1i64..1500, 1..24)
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (before, after, non_negative) = rt.block_on(async move {
            let store = InMemoryLedgerStore::new();
            let a = store.seed_account("a@example.com", "hash", 1000).await;
            let b = store.seed_account("b@example.com", "hash", 1000).await;
            let engine = LedgerEngine::new(store.clone());

            let before = store.total_balance().await;
            for (i, amount) in amounts.iter().enumerate() {
                let (from, to) = if i % 2 == 0 {
                    ("a@example.com", "b@example.com")
                } else {
                    ("b@example.com", "a@example.com")
                };
                // Insufficient funds is an acceptable outcome; anything else
                // would mean the fake store broke an invariant.
                match engine.transfer(from, to, *amount).await {
                    Ok(_) => {}
                    Err(LedgerError::InsufficientFunds(_)) => {}
                    Err(other) => panic!("unexpected transfer failure: {other}"),
                }
            }

            let non_negative = store.balance_of(a.id).await.unwrap() >= 0
                && store.balance_of(b.id).await.unwrap() >= 0;
            (before, store.total_balance().await, non_negative)
        });

        prop_assert_eq!(before, after);
        prop_assert!(non_negative);
    }
}
