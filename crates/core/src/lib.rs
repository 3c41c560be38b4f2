//! `merchmint-core` — domain foundation for the coin ledger.
//!
//! This crate contains **pure domain** primitives (no infrastructure
//! concerns): strongly-typed identifiers, the entities persisted by the
//! stores, the error model, and the deterministic precondition checks the
//! ledger engine runs before touching storage.

pub mod account;
pub mod error;
pub mod id;
pub mod inventory;
pub mod item;
pub mod token;
pub mod transfer;

pub use account::{Account, STARTING_BALANCE};
pub use error::{ErrorClass, LedgerError, LedgerResult};
pub use id::{AccountId, InventoryRecordId, ItemId, TransferId};
pub use inventory::InventoryRecord;
pub use item::Item;
pub use token::{TokenRecord, TOKEN_TTL_DAYS};
pub use transfer::{validate_transfer, CoinTransfer};
