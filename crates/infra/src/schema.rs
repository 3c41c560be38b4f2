//! Relational layout and bootstrap.
//!
//! Plain idempotent statements; migration tooling is the deployment's
//! concern, not this crate's.

use sqlx::PgPool;

use merchmint_core::{LedgerError, LedgerResult};

/// Table layout consumed by [`super::store::PostgresLedgerStore`].
pub const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS accounts (
        id UUID PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        balance BIGINT NOT NULL CHECK (balance >= 0)
    )",
    "CREATE TABLE IF NOT EXISTS items (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        cost BIGINT NOT NULL CHECK (cost > 0)
    )",
    "CREATE TABLE IF NOT EXISTS transfers (
        id UUID PRIMARY KEY,
        sender_email TEXT NOT NULL,
        receiver_email TEXT NOT NULL,
        amount BIGINT NOT NULL CHECK (amount > 0)
    )",
    "CREATE TABLE IF NOT EXISTS inventory (
        id UUID PRIMARY KEY,
        item_name TEXT NOT NULL,
        owner_id UUID NOT NULL REFERENCES accounts(id)
    )",
    "CREATE TABLE IF NOT EXISTS tokens (
        account_id UUID PRIMARY KEY REFERENCES accounts(id),
        value TEXT NOT NULL UNIQUE,
        issued_at TIMESTAMPTZ NOT NULL,
        expires_at TIMESTAMPTZ NOT NULL
    )",
];

/// Default catalog carried over from the original merch shop.
pub const DEFAULT_CATALOG: &[(&str, i64)] = &[
    ("t-shirt", 80),
    ("cup", 20),
    ("book", 50),
    ("pen", 10),
    ("powerbank", 200),
    ("hoody", 300),
    ("umbrella", 200),
    ("socks", 10),
    ("wallet", 50),
    ("pink-hoody", 500),
];

/// Create the tables if they do not exist.
pub async fn bootstrap(pool: &PgPool) -> LedgerResult<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| LedgerError::persistence(format!("bootstrap: {e}")))?;
    }
    Ok(())
}

/// Insert the default catalog; existing names are left untouched.
pub async fn seed_catalog(pool: &PgPool) -> LedgerResult<()> {
    for &(name, cost) in DEFAULT_CATALOG {
        sqlx::query(
            "INSERT INTO items (id, name, cost) VALUES ($1, $2, $3) \
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(uuid::Uuid::now_v7())
        .bind(name)
        .bind(cost)
        .execute(pool)
        .await
        .map_err(|e| LedgerError::persistence(format!("seed_catalog: {e}")))?;
    }
    Ok(())
}
