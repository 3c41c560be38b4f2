//! Implementations of the ledger storage boundary.
//!
//! `PostgresLedgerStore` is the production backend; `InMemoryLedgerStore` is
//! a behavioral twin used by tests and by callers that want the engine
//! without a database.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;
