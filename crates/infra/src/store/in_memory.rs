//! In-memory ledger store.
//!
//! A behavioral twin of the Postgres store for tests and database-free
//! callers. One coarse async mutex stands in for row locking: every unit of
//! work holds the whole state exclusively, which is stricter than Postgres
//! but observationally equivalent for the engine's invariants. Writes are
//! staged on a copy and only applied on commit, so rollback and
//! drop-without-commit leave no trace.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use merchmint_core::{
    Account, AccountId, CoinTransfer, InventoryRecord, Item, LedgerError, LedgerResult,
    TokenRecord,
};
use merchmint_ledger::{LedgerStore, LedgerTx};

#[derive(Debug, Default, Clone)]
struct MemState {
    accounts: Vec<Account>,
    items: Vec<Item>,
    transfers: Vec<CoinTransfer>,
    inventory: Vec<InventoryRecord>,
    tokens: Vec<TokenRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<Mutex<MemState>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an account directly, outside any unit of work. Test setup.
    pub async fn seed_account(
        &self,
        email: &str,
        password_hash: &str,
        balance: i64,
    ) -> Account {
        let account = Account::new(email, password_hash, balance);
        self.state.lock().await.accounts.push(account.clone());
        account
    }

    /// Insert a catalog item directly. Test setup.
    pub async fn seed_item(&self, name: &str, cost: i64) -> Item {
        let item = Item::new(name, cost);
        self.state.lock().await.items.push(item.clone());
        item
    }

    /// Committed balance of an account, if it exists.
    pub async fn balance_of(&self, id: AccountId) -> Option<i64> {
        self.state
            .lock()
            .await
            .accounts
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.balance)
    }

    /// All committed transfer rows.
    pub async fn transfers(&self) -> Vec<CoinTransfer> {
        self.state.lock().await.transfers.clone()
    }

    /// All committed inventory rows.
    pub async fn inventory(&self) -> Vec<InventoryRecord> {
        self.state.lock().await.inventory.clone()
    }

    /// Committed token rows. Never more than one per account.
    pub async fn tokens(&self) -> Vec<TokenRecord> {
        self.state.lock().await.tokens.clone()
    }

    /// Sum of all committed balances (conservation assertions).
    pub async fn total_balance(&self) -> i64 {
        self.state.lock().await.accounts.iter().map(|a| a.balance).sum()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn begin(&self) -> LedgerResult<Box<dyn LedgerTx>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryLedgerTx { guard, staged }))
    }
}

struct InMemoryLedgerTx {
    guard: OwnedMutexGuard<MemState>,
    staged: MemState,
}

#[async_trait]
impl LedgerTx for InMemoryLedgerTx {
    async fn account_by_email(&mut self, email: &str) -> LedgerResult<Option<Account>> {
        Ok(self
            .staged
            .accounts
            .iter()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn account_by_id(&mut self, id: AccountId) -> LedgerResult<Option<Account>> {
        Ok(self.staged.accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn account_by_id_for_update(&mut self, id: AccountId) -> LedgerResult<Option<Account>> {
        // The whole state is already held exclusively.
        self.account_by_id(id).await
    }

    async fn account_by_email_for_update(
        &mut self,
        email: &str,
    ) -> LedgerResult<Option<Account>> {
        self.account_by_email(email).await
    }

    async fn create_account(
        &mut self,
        email: &str,
        password_hash: &str,
        starting_balance: i64,
    ) -> LedgerResult<Account> {
        if self.staged.accounts.iter().any(|a| a.email == email) {
            // Mirrors the unique constraint on accounts.email.
            return Err(LedgerError::persistence(format!(
                "create_account: unique violation: {email}"
            )));
        }
        let account = Account::new(email, password_hash, starting_balance);
        self.staged.accounts.push(account.clone());
        Ok(account)
    }

    async fn adjust_balance(&mut self, id: AccountId, delta: i64) -> LedgerResult<()> {
        let account = self
            .staged
            .accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| {
                LedgerError::integrity(format!("adjust_balance touched 0 rows for account {id}"))
            })?;

        let updated = account.balance + delta;
        if updated < 0 {
            // Mirrors the balance >= 0 CHECK constraint.
            return Err(LedgerError::integrity(format!(
                "adjust_balance: check violation: balance {} + {delta} < 0",
                account.balance
            )));
        }
        account.balance = updated;
        Ok(())
    }

    async fn item_by_name(&mut self, name: &str) -> LedgerResult<Option<Item>> {
        Ok(self.staged.items.iter().find(|i| i.name == name).cloned())
    }

    async fn append_transfer_record(
        &mut self,
        sender_email: &str,
        receiver_email: &str,
        amount: i64,
    ) -> LedgerResult<CoinTransfer> {
        let transfer = CoinTransfer::new(sender_email, receiver_email, amount);
        self.staged.transfers.push(transfer.clone());
        Ok(transfer)
    }

    async fn append_inventory_record(
        &mut self,
        item_name: &str,
        owner: AccountId,
    ) -> LedgerResult<InventoryRecord> {
        let record = InventoryRecord::new(item_name, owner);
        self.staged.inventory.push(record.clone());
        Ok(record)
    }

    async fn replace_token(
        &mut self,
        account_id: AccountId,
        value: &str,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> LedgerResult<()> {
        self.staged.tokens.retain(|t| t.account_id != account_id);
        self.staged.tokens.push(TokenRecord {
            account_id,
            value: value.to_string(),
            issued_at,
            expires_at,
        });
        Ok(())
    }

    async fn find_token_owner(&mut self, value: &str) -> LedgerResult<Option<AccountId>> {
        Ok(self
            .staged
            .tokens
            .iter()
            .find(|t| t.value == value)
            .map(|t| t.account_id))
    }

    async fn transfers_for(&mut self, email: &str) -> LedgerResult<Vec<CoinTransfer>> {
        Ok(self
            .staged
            .transfers
            .iter()
            .filter(|t| t.sender_email == email || t.receiver_email == email)
            .cloned()
            .collect())
    }

    async fn inventory_for(&mut self, owner: AccountId) -> LedgerResult<Vec<InventoryRecord>> {
        Ok(self
            .staged
            .inventory
            .iter()
            .filter(|r| r.owner == owner)
            .cloned()
            .collect())
    }

    async fn commit(self: Box<Self>) -> LedgerResult<()> {
        let mut this = *self;
        *this.guard = this.staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> LedgerResult<()> {
        // Staged writes are simply discarded.
        Ok(())
    }
}
