//! Infrastructure layer: database-backed and in-memory stores, schema
//! bootstrap, configuration.

pub mod config;
pub mod schema;
pub mod store;

#[cfg(test)]
mod integration_tests;

pub use config::Config;
pub use store::{InMemoryLedgerStore, PostgresLedgerStore};
