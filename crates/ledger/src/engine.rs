//! The ledger engine: atomic transfer and purchase orchestration.
//!
//! Each operation is one unit of work. Row locks are taken in ascending
//! account-id order (a total order over identifiers, not call order), so two
//! opposite-direction transfers between the same pair of accounts cannot
//! deadlock. Balances are checked only after the lock is held, so a
//! concurrent loser re-reads a fresh balance instead of acting on a stale
//! one.

use serde::{Deserialize, Serialize};
use tracing::{error, instrument, warn};

use merchmint_core::{
    validate_transfer, Account, AccountId, CoinTransfer, InventoryRecord, LedgerError,
    LedgerResult,
};

use crate::store::{LedgerStore, LedgerTx};

/// Outcome of a successful transfer: the appended ledger entry plus both
/// post-commit balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub transfer: CoinTransfer,
    pub sender_balance: i64,
    pub receiver_balance: i64,
}

/// Read-only view of an account: balance, owned items, transfer history
/// (rows where the account is sender or receiver).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub account_id: AccountId,
    pub email: String,
    pub balance: i64,
    pub inventory: Vec<InventoryRecord>,
    pub transfers: Vec<CoinTransfer>,
}

/// Orchestrates value movement against a [`LedgerStore`].
///
/// The engine never retries: a `Persistence` error means the unit of work
/// rolled back cleanly and the caller may repeat the call from scratch.
#[derive(Debug, Clone)]
pub struct LedgerEngine<S> {
    store: S,
}

impl<S: LedgerStore> LedgerEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Move `amount` coins from `sender_email` to `receiver_email`.
    ///
    /// On success the sum of the two balances is unchanged and exactly one
    /// ledger entry exists for the movement. On any error the observable
    /// state is exactly as before the call.
    #[instrument(skip(self), err)]
    pub async fn transfer(
        &self,
        sender_email: &str,
        receiver_email: &str,
        amount: i64,
    ) -> LedgerResult<TransferReceipt> {
        validate_transfer(sender_email, receiver_email, amount)?;

        let mut tx = self.store.begin().await?;
        let outcome = transfer_in_tx(tx.as_mut(), sender_email, receiver_email, amount).await;
        finish(tx, outcome).await
    }

    /// Debit `account_id` by the item's cost and record ownership.
    #[instrument(skip(self), err)]
    pub async fn purchase(
        &self,
        account_id: AccountId,
        item_name: &str,
    ) -> LedgerResult<InventoryRecord> {
        let mut tx = self.store.begin().await?;
        let outcome = purchase_in_tx(tx.as_mut(), account_id, item_name).await;
        finish(tx, outcome).await
    }

    /// Balance, inventory, and transfer history for an account. Read-only;
    /// takes no locks.
    #[instrument(skip(self), err)]
    pub async fn account_summary(&self, account_id: AccountId) -> LedgerResult<AccountSummary> {
        let mut tx = self.store.begin().await?;
        let outcome = summary_in_tx(tx.as_mut(), account_id).await;
        finish(tx, outcome).await
    }
}

/// Commit on success, roll back on failure. Integrity failures are logged
/// before they propagate; a failed rollback is logged and the original
/// error wins.
async fn finish<T>(tx: Box<dyn LedgerTx>, outcome: LedgerResult<T>) -> LedgerResult<T> {
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let LedgerError::Integrity(ref msg) = err {
                error!(%msg, "integrity violation, aborting unit of work");
            }
            if let Err(rollback_err) = tx.rollback().await {
                warn!(%rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}

async fn transfer_in_tx(
    tx: &mut dyn LedgerTx,
    sender_email: &str,
    receiver_email: &str,
    amount: i64,
) -> LedgerResult<TransferReceipt> {
    // Resolve both identities before touching any balance. A missing
    // receiver is a caller mistake; a missing sender means the
    // authenticated identity no longer resolves.
    let sender = tx.account_by_email(sender_email).await?.ok_or_else(|| {
        LedgerError::integrity(format!("authenticated sender {sender_email} does not resolve"))
    })?;
    let receiver = tx.account_by_email(receiver_email).await?.ok_or_else(|| {
        LedgerError::invalid_recipient(format!("no account for {receiver_email}"))
    })?;

    let (sender, receiver) = lock_pair(tx, sender, receiver).await?;
    sender.ensure_covers(amount)?;

    tx.adjust_balance(sender.id, -amount).await?;
    tx.adjust_balance(receiver.id, amount).await?;
    let transfer = tx
        .append_transfer_record(&sender.email, &receiver.email, amount)
        .await?;

    Ok(TransferReceipt {
        transfer,
        sender_balance: sender.balance - amount,
        receiver_balance: receiver.balance + amount,
    })
}

/// Lock both rows in ascending id order and hand back fresh copies,
/// (sender, receiver).
async fn lock_pair(
    tx: &mut dyn LedgerTx,
    sender: Account,
    receiver: Account,
) -> LedgerResult<(Account, Account)> {
    let sender_id = sender.id;
    let (first, second) = if sender.id <= receiver.id {
        (sender.id, receiver.id)
    } else {
        (receiver.id, sender.id)
    };

    let first_row = lock_existing(tx, first).await?;
    let second_row = lock_existing(tx, second).await?;

    if first_row.id == sender_id {
        Ok((first_row, second_row))
    } else {
        Ok((second_row, first_row))
    }
}

async fn lock_existing(tx: &mut dyn LedgerTx, id: AccountId) -> LedgerResult<Account> {
    tx.account_by_id_for_update(id).await?.ok_or_else(|| {
        LedgerError::integrity(format!("account {id} vanished between read and lock"))
    })
}

async fn purchase_in_tx(
    tx: &mut dyn LedgerTx,
    account_id: AccountId,
    item_name: &str,
) -> LedgerResult<InventoryRecord> {
    let account = tx.account_by_id_for_update(account_id).await?.ok_or_else(|| {
        LedgerError::integrity(format!("authenticated account {account_id} does not resolve"))
    })?;

    let item = tx
        .item_by_name(item_name)
        .await?
        .ok_or_else(|| LedgerError::item_not_found(item_name))?;

    account.ensure_covers(item.cost)?;

    tx.adjust_balance(account.id, -item.cost).await?;
    tx.append_inventory_record(&item.name, account.id).await
}

async fn summary_in_tx(
    tx: &mut dyn LedgerTx,
    account_id: AccountId,
) -> LedgerResult<AccountSummary> {
    let account = tx.account_by_id(account_id).await?.ok_or_else(|| {
        LedgerError::integrity(format!("authenticated account {account_id} does not resolve"))
    })?;

    let transfers = tx.transfers_for(&account.email).await?;
    let inventory = tx.inventory_for(account.id).await?;

    Ok(AccountSummary {
        account_id: account.id,
        email: account.email,
        balance: account.balance,
        inventory,
        transfers,
    })
}
