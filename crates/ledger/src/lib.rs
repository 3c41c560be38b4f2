//! `merchmint-ledger` — the ledger engine and its storage boundary.
//!
//! The engine orchestrates transfers and purchases as single atomic units of
//! work against the [`store::LedgerStore`] trait. Storage backends live in
//! `merchmint-infra`; the engine never opens more than one transaction per
//! operation and never commits partial state.

pub mod engine;
pub mod store;

pub use engine::{AccountSummary, LedgerEngine, TransferReceipt};
pub use store::{LedgerStore, LedgerTx};
