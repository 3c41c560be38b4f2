//! Storage boundary: an explicit unit of work threaded through every call.
//!
//! A [`LedgerStore`] hands out one [`LedgerTx`] per engine operation. Every
//! primitive executes inside that open transaction and never opens its own,
//! so an engine operation commits or rolls back as one indivisible step.
//! There is no process-wide database handle anywhere in the workspace.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use merchmint_core::{
    Account, AccountId, CoinTransfer, InventoryRecord, Item, LedgerResult,
};

/// One open database transaction (or its in-memory equivalent).
///
/// `*_for_update` reads take an exclusive row lock and block until any
/// concurrent holder commits or rolls back; the caller then sees a fresh
/// balance, which is what prevents lost updates. Dropping a `LedgerTx`
/// without calling [`commit`](LedgerTx::commit) discards all staged writes.
#[async_trait]
pub trait LedgerTx: Send {
    /// Plain read by email; no lock taken.
    async fn account_by_email(&mut self, email: &str) -> LedgerResult<Option<Account>>;

    /// Plain read by id; no lock taken.
    async fn account_by_id(&mut self, id: AccountId) -> LedgerResult<Option<Account>>;

    /// Read by id with an exclusive row lock (`SELECT … FOR UPDATE`).
    async fn account_by_id_for_update(&mut self, id: AccountId) -> LedgerResult<Option<Account>>;

    /// Read by email with an exclusive row lock.
    async fn account_by_email_for_update(&mut self, email: &str)
        -> LedgerResult<Option<Account>>;

    /// Insert a fresh account row and return it.
    async fn create_account(
        &mut self,
        email: &str,
        password_hash: &str,
        starting_balance: i64,
    ) -> LedgerResult<Account>;

    /// Apply a signed delta to a locked account's balance.
    ///
    /// The row must already be locked by this transaction; callers check the
    /// balance before debiting, the store only applies the arithmetic.
    async fn adjust_balance(&mut self, id: AccountId, delta: i64) -> LedgerResult<()>;

    /// Catalog lookup; the catalog is read-only to the engine.
    async fn item_by_name(&mut self, name: &str) -> LedgerResult<Option<Item>>;

    /// Append one ledger entry for a successful transfer.
    async fn append_transfer_record(
        &mut self,
        sender_email: &str,
        receiver_email: &str,
        amount: i64,
    ) -> LedgerResult<CoinTransfer>;

    /// Append one ownership row for a successful purchase.
    async fn append_inventory_record(
        &mut self,
        item_name: &str,
        owner: AccountId,
    ) -> LedgerResult<InventoryRecord>;

    /// Replace the account's live token row (delete-then-insert).
    ///
    /// Both statements run inside this transaction, so the account can never
    /// be observed holding two live tokens.
    async fn replace_token(
        &mut self,
        account_id: AccountId,
        value: &str,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> LedgerResult<()>;

    /// Look up which account currently owns a token value, if any.
    async fn find_token_owner(&mut self, value: &str) -> LedgerResult<Option<AccountId>>;

    /// All transfers where the email is sender or receiver.
    async fn transfers_for(&mut self, email: &str) -> LedgerResult<Vec<CoinTransfer>>;

    /// All ownership rows for an account.
    async fn inventory_for(&mut self, owner: AccountId) -> LedgerResult<Vec<InventoryRecord>>;

    /// Commit the unit of work.
    async fn commit(self: Box<Self>) -> LedgerResult<()>;

    /// Roll back the unit of work. Dropping without commit has the same
    /// effect; an explicit rollback lets failures surface.
    async fn rollback(self: Box<Self>) -> LedgerResult<()>;
}

/// Factory for units of work.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn begin(&self) -> LedgerResult<Box<dyn LedgerTx>>;
}
