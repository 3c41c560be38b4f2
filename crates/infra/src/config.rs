//! Environment-based configuration.

use anyhow::Context;

use crate::store::postgres::DEFAULT_STATEMENT_TIMEOUT_MS;

/// Process configuration for database-backed deployments.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string.
    pub database_url: String,
    /// HS256 signing secret for the session authority.
    pub jwt_secret: String,
    /// Per-statement timeout applied to every unit of work.
    pub statement_timeout_ms: u64,
}

impl Config {
    /// Read `DATABASE_URL`, `JWT_SECRET`, and optional
    /// `STATEMENT_TIMEOUT_MS` from the environment.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;
        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET is required")?;
        let statement_timeout_ms = match std::env::var("STATEMENT_TIMEOUT_MS") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("STATEMENT_TIMEOUT_MS is not a number: {raw}"))?,
            Err(_) => DEFAULT_STATEMENT_TIMEOUT_MS,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            statement_timeout_ms,
        })
    }
}
